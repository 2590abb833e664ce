// Player metadata refresh from the Sleeper bulk player feed: parse, cache,
// merge into the board, and the twice-daily schedule.
//
// A refresh only ever touches team, injury status, bye week, and the
// external id of existing players. Ranks, tags, and draft state belong to
// the user.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Days, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::draft::player::{Candidate, Position};
use crate::draft::registry::Registry;
use crate::draft::seed::default_registry;
use crate::draft::teams::{defense_name, FREE_AGENT};
use crate::error::{Result, SyncError};
use crate::sources::JsonFetcher;

// ---------------------------------------------------------------------------
// Feed records and cache
// ---------------------------------------------------------------------------

/// One player from the bulk feed, already filtered and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRecord {
    pub external_id: String,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub injury_status: Option<String>,
    pub bye_week: Option<u8>,
    /// 1-based order within the feed.
    pub feed_rank: u32,
}

impl BulkRecord {
    fn candidate(&self) -> Candidate {
        Candidate {
            injury_status: self.injury_status.clone(),
            bye_week: self.bye_week,
            external_id: Some(self.external_id.clone()),
            ..Candidate::new(self.name.clone(), self.team.clone(), self.position)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCache {
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<BulkRecord>,
}

impl FeedCache {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// Where a refresh got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshSource {
    Network,
    Cache,
    Seed,
    /// Nothing to apply: fetch failed, no cache, board already populated.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub source: RefreshSource,
    pub updated: usize,
    pub added: usize,
    /// The board was built from scratch because it was empty.
    pub rebuilt: bool,
}

impl RefreshSummary {
    fn unchanged() -> Self {
        RefreshSummary {
            source: RefreshSource::Unchanged,
            updated: 0,
            added: 0,
            rebuilt: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.updated > 0 || self.added > 0 || self.rebuilt
    }
}

// ---------------------------------------------------------------------------
// Feed parsing
// ---------------------------------------------------------------------------

const SKILL_POSITIONS: [&str; 5] = ["QB", "RB", "WR", "TE", "K"];
const UNRANKED: f64 = 9999.0;

fn feed_str<'a>(p: &'a Value, key: &str) -> Option<&'a str> {
    p.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn search_rank(p: &Value) -> Option<f64> {
    p.get("search_rank").and_then(Value::as_f64).filter(|r| *r > 0.0)
}

fn feed_name(p: &Value) -> Option<String> {
    if let Some(full) = feed_str(p, "full_name") {
        return Some(full.to_string());
    }
    match (feed_str(p, "first_name"), feed_str(p, "last_name")) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        _ => None,
    }
}

fn feed_bye(p: &Value) -> Option<u8> {
    p.get("bye_week")
        .and_then(Value::as_u64)
        .and_then(|w| u8::try_from(w).ok())
        .filter(|w| *w > 0)
}

/// Convert Sleeper's `/players/nfl` map into feed records.
///
/// Active skill players with a positive `search_rank` come first, in rank
/// order, followed by one defense per team.
pub fn parse_sleeper_players(raw: &Value) -> Vec<BulkRecord> {
    let Some(map) = raw.as_object() else {
        warn!("Player feed is not an object");
        return Vec::new();
    };

    let mut skill: Vec<(f64, BulkRecord)> = Vec::new();
    let mut defenses: Vec<(f64, BulkRecord)> = Vec::new();
    let mut seen_teams = HashSet::new();

    for (key, p) in map {
        let Some(pos) = feed_str(p, "position") else {
            continue;
        };
        let external_id = feed_str(p, "player_id").unwrap_or(key).to_string();
        let team = feed_str(p, "team").map(str::to_uppercase);

        if pos == "DEF" {
            let Some(team) = team else { continue };
            if !seen_teams.insert(team.clone()) {
                continue;
            }
            let name = feed_name(p).unwrap_or_else(|| defense_name(&team));
            defenses.push((
                search_rank(p).unwrap_or(UNRANKED),
                BulkRecord {
                    external_id,
                    name,
                    team,
                    position: Position::Defense,
                    injury_status: None,
                    bye_week: feed_bye(p),
                    feed_rank: 0,
                },
            ));
            continue;
        }

        let active = p.get("active").and_then(Value::as_bool).unwrap_or(true);
        if !active || !SKILL_POSITIONS.contains(&pos) {
            continue;
        }
        let (Some(rank), Some(name), Some(position)) =
            (search_rank(p), feed_name(p), Position::from_str_pos(pos))
        else {
            continue;
        };
        skill.push((
            rank,
            BulkRecord {
                external_id,
                name,
                team: team.unwrap_or_else(|| FREE_AGENT.to_string()),
                position,
                injury_status: feed_str(p, "injury_status").map(str::to_string),
                bye_week: feed_bye(p),
                feed_rank: 0,
            },
        ));
    }

    skill.sort_by(|a, b| a.0.total_cmp(&b.0));
    defenses.sort_by(|a, b| a.0.total_cmp(&b.0));

    let records: Vec<BulkRecord> = skill
        .into_iter()
        .chain(defenses)
        .enumerate()
        .map(|(i, (_, record))| BulkRecord {
            feed_rank: i as u32 + 1,
            ..record
        })
        .collect();
    debug!("Parsed {} feed records", records.len());
    records
}

/// Fetch and parse the bulk feed. An empty result counts as a failure.
pub async fn fetch_feed(fetcher: &dyn JsonFetcher, url: &str) -> Result<Vec<BulkRecord>> {
    let raw = fetcher.fetch_json(url, &[]).await?;
    let records = parse_sleeper_players(&raw);
    if records.is_empty() {
        return Err(SyncError::Parse("player feed contained no usable players".into()));
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Merging into the board
// ---------------------------------------------------------------------------

/// Update metadata on every player matched by external id, falling back to
/// case-insensitive name + position. Returns the number matched.
pub fn apply_metadata(registry: &mut Registry, records: &[BulkRecord]) -> usize {
    let by_id: HashMap<&str, &BulkRecord> = records
        .iter()
        .map(|r| (r.external_id.as_str(), r))
        .collect();

    let mut matched = 0;
    for player in registry.iter_mut() {
        let record = player
            .external_id
            .as_deref()
            .and_then(|id| by_id.get(id).copied())
            .or_else(|| {
                records
                    .iter()
                    .find(|r| player.same_identity(&r.name, r.position))
            });
        let Some(record) = record else { continue };

        player.team = record.team.clone();
        player.injury_status = record.injury_status.clone();
        player.bye_week = record.bye_week;
        if player.external_id.is_none() {
            player.external_id = Some(record.external_id.clone());
        }
        matched += 1;
    }
    matched
}

/// Append feed players missing from the board (by name + position), up to
/// `cap` of them, at the bottom of the ranking.
pub fn add_new_players(registry: &mut Registry, records: &[BulkRecord], cap: usize) -> usize {
    let mut added = 0;
    for record in records {
        if added >= cap {
            break;
        }
        if registry.find_identity(&record.name, record.position).is_some() {
            continue;
        }
        registry.push_back(record.candidate());
        added += 1;
    }
    if added > 0 {
        info!("Added {added} new players from the feed");
    }
    added
}

/// Full board in feed order.
pub fn build_from_feed(records: &[BulkRecord]) -> Registry {
    let mut registry = Registry::new();
    for record in records {
        registry.push_back(record.candidate());
    }
    registry
}

// ---------------------------------------------------------------------------
// Refresh flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// The cache is fresh: reapply it locally.
    ReapplyCached,
    /// Fetch the feed.
    Fetch,
}

pub fn plan(
    cache: Option<&FeedCache>,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
    force: bool,
) -> RefreshPlan {
    match cache {
        Some(cache) if !force && !cache.records.is_empty() && cache.is_fresh(now, ttl) => {
            RefreshPlan::ReapplyCached
        }
        _ => RefreshPlan::Fetch,
    }
}

/// Apply cached records without touching the network.
pub fn reapply_cached(registry: &mut Registry, cache: &FeedCache) -> RefreshSummary {
    if registry.is_empty() {
        *registry = build_from_feed(&cache.records);
        return RefreshSummary {
            source: RefreshSource::Cache,
            updated: 0,
            added: registry.len(),
            rebuilt: true,
        };
    }
    RefreshSummary {
        source: RefreshSource::Cache,
        updated: apply_metadata(registry, &cache.records),
        added: 0,
        rebuilt: false,
    }
}

/// Merge freshly fetched records: rebuild an empty board, otherwise update
/// metadata and append up to `cap` new players.
pub fn apply_fetched(registry: &mut Registry, records: &[BulkRecord], cap: usize) -> RefreshSummary {
    if registry.is_empty() {
        *registry = build_from_feed(records);
        return RefreshSummary {
            source: RefreshSource::Network,
            updated: 0,
            added: registry.len(),
            rebuilt: true,
        };
    }
    RefreshSummary {
        source: RefreshSource::Network,
        updated: apply_metadata(registry, records),
        added: add_new_players(registry, records, cap),
        rebuilt: false,
    }
}

/// Fetch failed: fall back to the cache, else seed an empty board.
pub fn apply_fallback(registry: &mut Registry, cache: Option<&FeedCache>) -> RefreshSummary {
    match cache {
        Some(cache) if !cache.records.is_empty() => reapply_cached(registry, cache),
        _ if registry.is_empty() => {
            *registry = default_registry();
            RefreshSummary {
                source: RefreshSource::Seed,
                updated: 0,
                added: registry.len(),
                rebuilt: true,
            }
        }
        _ => RefreshSummary::unchanged(),
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// The next wall-clock time in `now`'s zone, strictly after `now`, whose
/// hour is one of `hours` (minute zero). Rolls over to the following day.
pub fn next_refresh_at<Tz: TimeZone>(now: &DateTime<Tz>, hours: &[u32]) -> DateTime<Tz> {
    let mut hours: Vec<u32> = hours.iter().copied().filter(|h| *h < 24).collect();
    hours.sort_unstable();
    hours.dedup();

    let tz = now.timezone();
    let today = now.date_naive();
    for offset in 0..=2 {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        for &hour in &hours {
            let Some(naive) = day.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            // Skips hours that fall in a DST gap.
            if let Some(at) = tz.from_local_datetime(&naive).earliest() {
                if at > *now {
                    return at;
                }
            }
        }
    }
    now.clone() + chrono::Duration::hours(24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::Tag;
    use chrono::{FixedOffset, Timelike};
    use serde_json::json;

    fn record(id: &str, name: &str, team: &str, pos: Position, rank: u32) -> BulkRecord {
        BulkRecord {
            external_id: id.into(),
            name: name.into(),
            team: team.into(),
            position: pos,
            injury_status: None,
            bye_week: None,
            feed_rank: rank,
        }
    }

    fn board() -> Registry {
        let mut registry = Registry::new();
        registry.push_back(Candidate::new("Josh Allen", "BUF", Position::Quarterback));
        registry.push_back(Candidate::new("Davante Adams", "LV", Position::WideReceiver));
        registry.push_back(Candidate::new("Justin Tucker", "BAL", Position::Kicker));
        registry
    }

    #[test]
    fn parse_filters_sorts_and_appends_defenses() {
        let raw = json!({
            "4984": {"player_id": "4984", "full_name": "Josh Allen", "position": "QB",
                     "team": "BUF", "search_rank": 3, "active": true, "bye_week": 7},
            "2133": {"player_id": "2133", "first_name": "Davante", "last_name": "Adams",
                     "position": "WR", "team": "LAR", "search_rank": 1, "injury_status": "Questionable"},
            "9999": {"player_id": "9999", "full_name": "Retired Guy", "position": "RB",
                     "search_rank": 2, "active": false},
            "1111": {"player_id": "1111", "full_name": "Deep Sleeper", "position": "TE",
                     "search_rank": null},
            "2222": {"player_id": "2222", "full_name": "Line Backer", "position": "LB", "search_rank": 4},
            "KC": {"position": "DEF", "team": "KC", "search_rank": 50},
            "KC2": {"position": "DEF", "team": "KC", "search_rank": 51},
            "SF": {"position": "DEF", "team": "SF", "full_name": "San Francisco 49ers", "search_rank": 40},
        });
        let records = parse_sleeper_players(&raw);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Davante Adams", "Josh Allen", "San Francisco 49ers", "Kansas City Chiefs"]
        );
        assert_eq!(records[0].injury_status.as_deref(), Some("Questionable"));
        assert_eq!(records[1].bye_week, Some(7));
        assert_eq!(records[3].external_id, "KC");
        assert_eq!(records[3].position, Position::Defense);
        let ranks: Vec<_> = records.iter().map(|r| r.feed_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn parse_non_object_is_empty() {
        assert!(parse_sleeper_players(&json!([1, 2])).is_empty());
    }

    #[test]
    fn metadata_refresh_leaves_user_state_alone() {
        let mut registry = board();
        {
            let adams = registry.get_mut(2).unwrap();
            adams.toggle_tag(Tag::Bust);
            adams.is_drafted = true;
            adams.draft_pick = Some(14);
            adams.drafted_by = Some("owner".into());
        }
        crate::draft::ranking::reorder(&mut registry, 3, 1).unwrap();
        let before: Vec<_> = registry
            .iter()
            .map(|p| (p.id, p.rank, p.tags.clone(), p.is_drafted, p.draft_pick, p.drafted_by.clone()))
            .collect();

        let feed = vec![
            BulkRecord {
                injury_status: Some("Out".into()),
                bye_week: Some(8),
                ..record("2133", "davante adams", "LAR", Position::WideReceiver, 1)
            },
            record("4984", "Josh Allen", "BUF", Position::Quarterback, 2),
        ];
        assert_eq!(apply_metadata(&mut registry, &feed), 2);

        let after: Vec<_> = registry
            .iter()
            .map(|p| (p.id, p.rank, p.tags.clone(), p.is_drafted, p.draft_pick, p.drafted_by.clone()))
            .collect();
        assert_eq!(before, after);

        let adams = registry.get(2).unwrap();
        assert_eq!(adams.team, "LAR");
        assert_eq!(adams.injury_status.as_deref(), Some("Out"));
        assert_eq!(adams.bye_week, Some(8));
        assert_eq!(adams.external_id.as_deref(), Some("2133"));
    }

    #[test]
    fn external_id_match_beats_name() {
        let mut registry = board();
        registry.get_mut(1).unwrap().external_id = Some("4984".into());
        // Renamed in the feed, same id.
        let feed = vec![record("4984", "Joshua Allen", "BUF", Position::Quarterback, 1)];
        assert_eq!(apply_metadata(&mut registry, &feed), 1);
        assert_eq!(registry.get(1).unwrap().name, "Josh Allen");
    }

    #[test]
    fn new_players_appended_up_to_cap() {
        let mut registry = board();
        let feed: Vec<_> = (0..5)
            .map(|i| record(&format!("n{i}"), &format!("Rookie {i}"), "NYJ", Position::RunningBack, i + 1))
            .chain(std::iter::once(record("4984", "Josh Allen", "BUF", Position::Quarterback, 6)))
            .collect();
        assert_eq!(add_new_players(&mut registry, &feed, 3), 3);
        assert_eq!(registry.len(), 6);
        let last = registry.iter().last().unwrap();
        assert_eq!(last.name, "Rookie 2");
        assert_eq!(last.rank, 6);
        assert!(!last.is_drafted);
        assert!(registry.is_dense());
    }

    #[test]
    fn plan_respects_ttl_and_force() {
        let now = Utc::now();
        let ttl = chrono::Duration::hours(12);
        let fresh = FeedCache {
            fetched_at: now - chrono::Duration::hours(1),
            records: vec![record("1", "A", "FA", Position::Kicker, 1)],
        };
        let stale = FeedCache {
            fetched_at: now - chrono::Duration::hours(13),
            ..fresh.clone()
        };
        assert_eq!(plan(Some(&fresh), now, ttl, false), RefreshPlan::ReapplyCached);
        assert_eq!(plan(Some(&fresh), now, ttl, true), RefreshPlan::Fetch);
        assert_eq!(plan(Some(&stale), now, ttl, false), RefreshPlan::Fetch);
        assert_eq!(plan(None, now, ttl, false), RefreshPlan::Fetch);
    }

    #[test]
    fn empty_board_is_rebuilt_from_feed() {
        let mut registry = Registry::new();
        let feed = vec![
            record("1", "A", "KC", Position::Quarterback, 1),
            record("2", "B", "KC", Position::RunningBack, 2),
        ];
        let summary = apply_fetched(&mut registry, &feed, 30);
        assert!(summary.rebuilt);
        assert_eq!(summary.added, 2);
        assert_eq!(registry.get(2).unwrap().external_id.as_deref(), Some("2"));
    }

    #[test]
    fn fallback_uses_cache_then_seed() {
        let mut registry = Registry::new();
        let summary = apply_fallback(&mut registry, None);
        assert_eq!(summary.source, RefreshSource::Seed);
        assert!(!registry.is_empty());

        let mut populated = board();
        let before = populated.snapshot();
        let summary = apply_fallback(&mut populated, None);
        assert_eq!(summary, RefreshSummary::unchanged());
        assert_eq!(populated.snapshot(), before);

        let cache = FeedCache {
            fetched_at: Utc::now(),
            records: vec![record("77", "Justin Tucker", "FA", Position::Kicker, 1)],
        };
        let summary = apply_fallback(&mut populated, Some(&cache));
        assert_eq!(summary.source, RefreshSource::Cache);
        assert_eq!(populated.get(3).unwrap().team, "FA");
    }

    #[test]
    fn schedule_picks_next_hour_today() {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 9, 30, 0).unwrap();
        let next = next_refresh_at(&now, &[8, 20]);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 9, 1, 20, 0, 0).unwrap());
    }

    #[test]
    fn schedule_after_last_hour_rolls_to_tomorrow() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 9, 1, 20, 0, 0).unwrap();
        let next = next_refresh_at(&now, &[20, 8]);
        assert_eq!(next, tz.with_ymd_and_hms(2025, 9, 2, 8, 0, 0).unwrap());
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn schedule_is_strictly_after_now() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(
            next_refresh_at(&now, &[8]),
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()
        );
    }
}
