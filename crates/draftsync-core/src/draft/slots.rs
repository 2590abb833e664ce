// Saved ranking slots: three named snapshots of the board the user can
// stash and restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::player::Player;
use super::registry::Registry;
use crate::error::{Result, SyncError};

pub const SLOT_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSlot {
    pub name: String,
    pub saved_at: Option<DateTime<Utc>>,
    pub players: Option<Vec<Player>>,
}

impl SavedSlot {
    fn empty(index: usize) -> Self {
        SavedSlot {
            name: default_name(index),
            saved_at: None,
            players: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_none()
    }
}

/// Listing row for a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSummary {
    pub index: usize,
    pub name: String,
    pub saved_at: Option<DateTime<Utc>>,
    pub player_count: Option<usize>,
}

fn default_name(index: usize) -> String {
    format!("Slot {}", index + 1)
}

fn check_index(index: usize) -> Result<()> {
    if index >= SLOT_COUNT {
        return Err(SyncError::validation(
            "slot",
            format!("must be between 1 and {SLOT_COUNT}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedSlots {
    slots: Vec<SavedSlot>,
}

impl Default for SavedSlots {
    fn default() -> Self {
        SavedSlots {
            slots: (0..SLOT_COUNT).map(SavedSlot::empty).collect(),
        }
    }
}

impl SavedSlots {
    /// Adopt persisted slots, padding or truncating to exactly three.
    pub fn from_saved(mut slots: Vec<SavedSlot>) -> Self {
        slots.truncate(SLOT_COUNT);
        while slots.len() < SLOT_COUNT {
            slots.push(SavedSlot::empty(slots.len()));
        }
        SavedSlots { slots }
    }

    pub fn as_slice(&self) -> &[SavedSlot] {
        &self.slots
    }

    pub fn summaries(&self) -> Vec<SlotSummary> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotSummary {
                index,
                name: slot.name.clone(),
                saved_at: slot.saved_at,
                player_count: slot.players.as_ref().map(Vec::len),
            })
            .collect()
    }

    /// Copy the current board into a slot.
    pub fn save(&mut self, index: usize, registry: &Registry, now: DateTime<Utc>) -> Result<()> {
        check_index(index)?;
        let slot = &mut self.slots[index];
        slot.players = Some(registry.iter().cloned().collect());
        slot.saved_at = Some(now);
        Ok(())
    }

    /// Replace the board with a slot's contents. Ids keep counting upward
    /// from the live board so none is ever reused.
    pub fn load(&self, index: usize, registry: &mut Registry) -> Result<()> {
        check_index(index)?;
        let slot = &self.slots[index];
        let players = slot.players.clone().ok_or_else(|| {
            SyncError::NotFound(format!("nothing saved in {}", slot.name))
        })?;
        let next_id = registry.next_id();
        registry.replace(players, next_id);
        Ok(())
    }

    pub fn clear(&mut self, index: usize) -> Result<()> {
        check_index(index)?;
        let slot = &mut self.slots[index];
        slot.players = None;
        slot.saved_at = None;
        Ok(())
    }

    /// Rename a slot; a blank name restores the default.
    pub fn rename(&mut self, index: usize, name: &str) -> Result<()> {
        check_index(index)?;
        let name = name.trim();
        self.slots[index].name = if name.is_empty() {
            default_name(index)
        } else {
            name.to_string()
        };
        Ok(())
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }
}
