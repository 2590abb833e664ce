// Pick ingestion: applies normalized pick events to the registry at most once
// per pick id.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::player::PlayerId;
use super::registry::Registry;
use super::resolver::resolve;

/// Capacity of the recent-activity feed.
pub const RECENT_ACTIVITY_CAP: usize = 12;

/// Normalized pick produced by every source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickEvent {
    /// Platform-assigned sequence number; unique within one connection.
    pub pick_id: u32,
    pub full_name: String,
    pub position: Option<String>,
    pub team: Option<String>,
    pub overall_pick: Option<u32>,
    pub drafter_label: Option<String>,
    pub round: Option<u32>,
}

impl PickEvent {
    pub fn new(pick_id: u32, full_name: impl Into<String>) -> Self {
        PickEvent {
            pick_id,
            full_name: full_name.into(),
            position: None,
            team: None,
            overall_pick: None,
            drafter_label: None,
            round: None,
        }
    }
}

/// Pick ids already applied during the current connection.
#[derive(Debug, Clone, Default)]
pub struct SeenPicks {
    ids: HashSet<u32>,
}

impl SeenPicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pick_id`; returns false if it was already present.
    pub fn insert(&mut self, pick_id: u32) -> bool {
        self.ids.insert(pick_id)
    }

    pub fn contains(&self, pick_id: u32) -> bool {
        self.ids.contains(&pick_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// One row of the recent-picks ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub name: String,
    pub position: Option<String>,
    pub team: Option<String>,
    pub pick: Option<u32>,
    pub round: Option<u32>,
    pub matched: Option<PlayerId>,
}

/// Bounded feed of observed picks, newest first.
#[derive(Debug, Clone, Default)]
pub struct RecentActivity {
    entries: VecDeque<ActivityEntry>,
}

impl RecentActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(RECENT_ACTIVITY_CAP);
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of applying one pick event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickOutcome {
    /// The pick id was new. Unmatched picks still count.
    pub applied: bool,
    pub matched: Option<PlayerId>,
}

/// Totals for a batch of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    pub matched: usize,
}

impl BatchOutcome {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Apply one pick event.
///
/// A repeated pick id is a no-op. Otherwise the id is recorded, the name is
/// resolved, a matched player is marked drafted, and the pick is pushed onto
/// the activity feed whether or not it matched.
///
/// The first observed pick number and drafter stay in place if a later pick
/// resolves to the same player.
pub fn apply_pick(
    registry: &mut Registry,
    seen: &mut SeenPicks,
    activity: &mut RecentActivity,
    event: &PickEvent,
) -> PickOutcome {
    if !seen.insert(event.pick_id) {
        debug!("Skipping already-seen pick {}", event.pick_id);
        return PickOutcome {
            applied: false,
            matched: None,
        };
    }

    let matched = resolve(registry, &event.full_name, event.position.as_deref());
    match matched.and_then(|id| registry.get_mut(id)) {
        Some(player) => {
            player.is_drafted = true;
            if player.draft_pick.is_none() {
                player.draft_pick = event.overall_pick;
                if event.drafter_label.is_some() {
                    player.drafted_by = event.drafter_label.clone();
                }
            } else if player.drafted_by.is_none() {
                player.drafted_by = event.drafter_label.clone();
            }
            info!(
                "Pick {}: {} -> player {} ({})",
                event.pick_id, event.full_name, player.id, player.name
            );
        }
        None => {
            info!(
                "Pick {}: no board match for {} ({})",
                event.pick_id,
                event.full_name,
                event.position.as_deref().unwrap_or("?")
            );
        }
    }

    activity.push(ActivityEntry {
        name: event.full_name.clone(),
        position: event.position.clone(),
        team: event.team.clone(),
        pick: event.overall_pick,
        round: event.round,
        matched,
    });

    PickOutcome {
        applied: true,
        matched,
    }
}

/// Apply events in order.
pub fn apply_batch(
    registry: &mut Registry,
    seen: &mut SeenPicks,
    activity: &mut RecentActivity,
    events: &[PickEvent],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for event in events {
        let result = apply_pick(registry, seen, activity, event);
        if result.applied {
            outcome.applied += 1;
        }
        if result.matched.is_some() {
            outcome.matched += 1;
        }
    }
    outcome
}
