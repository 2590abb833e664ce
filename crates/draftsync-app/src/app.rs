// Application state and orchestration logic.
//
// A single task owns the board, the connection supervisor, and the saved
// slots. It multiplexes user commands, session task results, player feed
// fetches, and the twice-daily refresh timer, and pushes UI updates back to
// the front end.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use draftsync_core::config::Config;
use draftsync_core::db::RegistryStore;
use draftsync_core::draft::ingest::RecentActivity;
use draftsync_core::draft::player::{Candidate, PlayerId};
use draftsync_core::draft::ranking;
use draftsync_core::draft::registry::{Registry, RegistrySnapshot};
use draftsync_core::draft::rows::{export_rows, import_from_rows};
use draftsync_core::draft::seed::default_registry;
use draftsync_core::draft::slots::SavedSlots;
use draftsync_core::draft::teams::FREE_AGENT;
use draftsync_core::error::SyncError;
use draftsync_core::protocol::{UiUpdate, UserCommand};
use draftsync_core::refresh::{self, BulkRecord, FeedCache, RefreshPlan, RefreshSummary};
use draftsync_core::sources::channel::ChannelOpener;
use draftsync_core::sources::JsonFetcher;
use draftsync_core::supervisor::{SessionEvent, Supervisor};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const REFRESH_CHANNEL_CAPACITY: usize = 4;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Receivers the event loop listens on besides user commands.
pub struct AppChannels {
    pub session_rx: mpsc::Receiver<SessionEvent>,
    pub refresh_rx: mpsc::Receiver<draftsync_core::Result<Vec<BulkRecord>>>,
}

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub registry: Registry,
    pub supervisor: Supervisor,
    pub activity: RecentActivity,
    pub slots: SavedSlots,
    pub feed_cache: Option<FeedCache>,
    pub store: Box<dyn RegistryStore>,
    fetcher: Arc<dyn JsonFetcher>,
    refresh_tx: mpsc::Sender<draftsync_core::Result<Vec<BulkRecord>>>,
    refresh_in_flight: bool,
}

impl AppState {
    /// Create the state with an empty board. Call [`recover_from_store`]
    /// before running the loop to restore persisted data.
    pub fn new(
        config: Config,
        store: Box<dyn RegistryStore>,
        fetcher: Arc<dyn JsonFetcher>,
        opener: Arc<dyn ChannelOpener>,
    ) -> (Self, AppChannels) {
        let (supervisor, session_rx) = Supervisor::new(config.clone(), fetcher.clone(), opener);
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CHANNEL_CAPACITY);
        let state = Self {
            config,
            registry: Registry::new(),
            supervisor,
            activity: RecentActivity::new(),
            slots: SavedSlots::default(),
            feed_cache: None,
            store,
            fetcher,
            refresh_tx,
            refresh_in_flight: false,
        };
        (
            state,
            AppChannels {
                session_rx,
                refresh_rx,
            },
        )
    }

    /// Persist the board. Failures are logged and never propagated.
    fn persist_registry(&self) {
        if let Err(e) = self.store.save_registry_snapshot(&self.registry.snapshot()) {
            warn!("Failed to persist board: {e:#}");
        }
    }

    fn persist_slots(&self) {
        if let Err(e) = self.store.save_slots(self.slots.as_slice()) {
            warn!("Failed to persist saved slots: {e:#}");
        }
    }

    fn send_rank(&self, player_id: PlayerId, moved: bool) -> Option<UiUpdate> {
        self.registry.get(player_id).map(|p| UiUpdate::RankChanged {
            player_id,
            rank: p.rank,
            moved,
        })
    }

    /// Drop the cached player feed so the next refresh goes to the network.
    pub fn clear_feed_cache(&mut self) {
        self.feed_cache = None;
        if let Err(e) = self.store.clear_feed_cache() {
            warn!("Failed to clear player feed cache: {e:#}");
        }
    }

    /// Start a metadata refresh. A fresh cache is applied immediately and its
    /// summary returned; otherwise a feed fetch is spawned and its result
    /// arrives on the refresh channel.
    pub fn start_refresh(&mut self, force: bool) -> Option<RefreshSummary> {
        let plan = refresh::plan(
            self.feed_cache.as_ref(),
            Utc::now(),
            self.config.refresh.ttl(),
            force,
        );
        match (plan, self.feed_cache.as_ref()) {
            (RefreshPlan::ReapplyCached, Some(cache)) => {
                let summary = refresh::reapply_cached(&mut self.registry, cache);
                debug!("Reapplied cached player feed: {:?}", summary);
                if summary.changed() {
                    self.persist_registry();
                }
                Some(summary)
            }
            _ => {
                if self.refresh_in_flight {
                    debug!("Player feed fetch already in flight");
                    return None;
                }
                self.refresh_in_flight = true;
                let fetcher = self.fetcher.clone();
                let url = self.config.refresh.feed_url.clone();
                let tx = self.refresh_tx.clone();
                info!("Fetching player feed from {url}");
                tokio::spawn(async move {
                    let result = refresh::fetch_feed(fetcher.as_ref(), &url).await;
                    let _ = tx.send(result).await;
                });
                None
            }
        }
    }

    /// Merge a completed feed fetch, falling back to the cache or the
    /// default seed on failure.
    pub fn finish_refresh(
        &mut self,
        result: draftsync_core::Result<Vec<BulkRecord>>,
    ) -> RefreshSummary {
        self.refresh_in_flight = false;
        let summary = match result {
            Ok(records) => {
                let cache = FeedCache {
                    fetched_at: Utc::now(),
                    records,
                };
                if let Err(e) = self.store.save_feed_cache(&cache) {
                    warn!("Failed to persist player feed cache: {e:#}");
                }
                let summary = refresh::apply_fetched(
                    &mut self.registry,
                    &cache.records,
                    self.config.refresh.new_player_cap,
                );
                self.feed_cache = Some(cache);
                summary
            }
            Err(e) => {
                warn!("Player feed refresh failed: {e}");
                refresh::apply_fallback(&mut self.registry, self.feed_cache.as_ref())
            }
        };
        info!(
            "Player refresh ({:?}): {} updated, {} added",
            summary.source, summary.updated, summary.added
        );
        if summary.changed() {
            self.persist_registry();
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Restore the board, slots, and feed cache from the store.
///
/// Read failures are logged and treated as "nothing saved". An empty board
/// is seeded with the default list unless a startup refresh will build it
/// from the feed. Returns whether a saved board was found.
pub fn recover_from_store(state: &mut AppState) -> bool {
    let snapshot: Option<RegistrySnapshot> = state
        .store
        .load_registry_snapshot()
        .unwrap_or_else(|e| {
            warn!("Could not read saved board: {e:#}");
            None
        });
    let restored = snapshot.is_some();
    if let Some(snapshot) = snapshot {
        state.registry = Registry::from_snapshot(snapshot);
        info!("Restored board with {} players", state.registry.len());
    }

    match state.store.load_slots() {
        Ok(Some(slots)) => state.slots = SavedSlots::from_saved(slots),
        Ok(None) => {}
        Err(e) => warn!("Could not read saved slots: {e:#}"),
    }

    match state.store.load_feed_cache() {
        Ok(cache) => state.feed_cache = cache,
        Err(e) => warn!("Could not read player feed cache: {e:#}"),
    }

    if state.registry.is_empty() && !state.config.refresh.on_startup {
        state.registry = default_registry();
        info!("Seeded board with {} default players", state.registry.len());
        state.persist_registry();
    }
    restored
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Time until the next scheduled refresh, measured on the tokio clock.
fn next_refresh_deadline(config: &Config) -> Instant {
    let now = Local::now();
    let next = refresh::next_refresh_at(&now, &config.refresh.hours);
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    debug!("Next scheduled player refresh at {next}");
    Instant::now() + wait
}

/// Run the main application event loop.
///
/// Listens on:
/// 1. User commands from the front end
/// 2. Session events from the connection's poll and stream tasks
/// 3. Player feed fetch results
/// 4. The scheduled refresh timer
///
/// Pushes UI updates through `ui_tx`. Returns on `Quit` or when the command
/// channel closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
    channels: AppChannels,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    let AppChannels {
        mut session_rx,
        mut refresh_rx,
    } = channels;

    if state.config.refresh.on_startup {
        if let Some(summary) = state.start_refresh(false) {
            let _ = ui_tx.send(UiUpdate::RefreshComplete(summary)).await;
        }
    }
    let mut refresh_deadline = next_refresh_deadline(&state.config);

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Session task results ---
            Some(event) = session_rx.recv() => {
                handle_session_event(&mut state, event, &ui_tx).await;
            }

            // --- Player feed fetches ---
            Some(result) = refresh_rx.recv() => {
                let summary = state.finish_refresh(result);
                let _ = ui_tx.send(UiUpdate::RefreshComplete(summary)).await;
            }

            // --- Scheduled refresh ---
            _ = tokio::time::sleep_until(refresh_deadline) => {
                info!("Scheduled player refresh");
                if let Some(summary) = state.start_refresh(true) {
                    let _ = ui_tx.send(UiUpdate::RefreshComplete(summary)).await;
                }
                refresh_deadline = next_refresh_deadline(&state.config);
            }
        }
    }

    // Cleanup
    state.supervisor.disconnect();
    state.persist_registry();
    info!("Application event loop exiting");
    Ok(())
}

async fn handle_session_event(
    state: &mut AppState,
    event: SessionEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let outcome = state
        .supervisor
        .handle_event(event, &mut state.registry, &mut state.activity);

    if outcome.state_changed {
        let _ = ui_tx
            .send(UiUpdate::Connection(state.supervisor.status()))
            .await;
    }
    if outcome.picks.changed() {
        if outcome.picks.matched > 0 {
            state.persist_registry();
        }
        let _ = ui_tx.send(UiUpdate::picks_applied(outcome.picks)).await;
    }
}

/// Run one command against the state and report the result.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let update = match apply_command(state, cmd) {
        Ok(Some(update)) => update,
        Ok(None) => return,
        Err(e) => {
            if e.is_user_facing() {
                info!("Command rejected: {e}");
            } else {
                warn!("Command failed: {e}");
            }
            UiUpdate::Error(e)
        }
    };
    let _ = ui_tx.send(update).await;
}

fn unknown_player(player_id: PlayerId) -> SyncError {
    SyncError::NotFound(format!("player {player_id}"))
}

fn apply_command(
    state: &mut AppState,
    cmd: UserCommand,
) -> draftsync_core::Result<Option<UiUpdate>> {
    match cmd {
        UserCommand::Connect { platform, params } => {
            state.supervisor.connect(platform, &params)?;
            state.activity.clear();
            Ok(Some(UiUpdate::Connection(state.supervisor.status())))
        }
        UserCommand::Disconnect => {
            state.supervisor.disconnect();
            Ok(Some(UiUpdate::Connection(state.supervisor.status())))
        }
        UserCommand::GetConnectionState => {
            Ok(Some(UiUpdate::Connection(state.supervisor.status())))
        }
        UserCommand::Reorder {
            player_id,
            target_rank,
        } => {
            let moved = ranking::reorder(&mut state.registry, player_id, target_rank)?;
            if moved {
                state.persist_registry();
            }
            Ok(state.send_rank(player_id, moved))
        }
        UserCommand::SetRank { player_id, rank } => {
            let moved = ranking::set_rank_by_typing(&mut state.registry, player_id, rank)?;
            if moved {
                state.persist_registry();
            }
            Ok(state.send_rank(player_id, moved))
        }
        UserCommand::DragOnto {
            player_id,
            target_id,
        } => {
            let moved = ranking::drag_onto(&mut state.registry, player_id, target_id)?;
            if moved {
                state.persist_registry();
            }
            Ok(state.send_rank(player_id, moved))
        }
        UserCommand::ToggleDrafted(player_id) => {
            let drafted_count = state.registry.stats().drafted as u32;
            let player = state
                .registry
                .get_mut(player_id)
                .ok_or_else(|| unknown_player(player_id))?;
            let drafted = if player.is_drafted {
                player.clear_draft();
                info!("{} unmarked as drafted", player.name);
                false
            } else {
                player.is_drafted = true;
                if player.draft_pick.is_none() {
                    player.draft_pick = Some(drafted_count + 1);
                }
                info!("{} marked as drafted", player.name);
                true
            };
            state.persist_registry();
            Ok(Some(UiUpdate::DraftToggled { player_id, drafted }))
        }
        UserCommand::ToggleTag(player_id, tag) => {
            let player = state
                .registry
                .get_mut(player_id)
                .ok_or_else(|| unknown_player(player_id))?;
            let active = player.toggle_tag(tag);
            state.persist_registry();
            Ok(Some(UiUpdate::TagToggled {
                player_id,
                tag,
                active,
            }))
        }
        UserCommand::DisplayList { position, query } => {
            let players = state
                .registry
                .display_list(position, query.as_deref())
                .into_iter()
                .cloned()
                .collect();
            Ok(Some(UiUpdate::DisplayList(players)))
        }
        UserCommand::AddPlayer {
            name,
            team,
            position,
            rank,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(SyncError::validation("name", "player name is required"));
            }
            let team = match team.trim() {
                "" => FREE_AGENT.to_string(),
                t => t.to_uppercase(),
            };
            let candidate = Candidate::new(name, team, position);
            let player_id = match rank {
                Some(rank) => ranking::insert_at(&mut state.registry, candidate, rank),
                None => ranking::append(&mut state.registry, candidate),
            };
            state.persist_registry();
            let rank = state.registry.get(player_id).map_or(0, |p| p.rank);
            info!("Added {name} at rank {rank}");
            Ok(Some(UiUpdate::PlayerAdded { player_id, rank }))
        }
        UserCommand::ImportRows(rows) => {
            let summary = import_from_rows(&mut state.registry, &rows)?;
            state.persist_registry();
            Ok(Some(UiUpdate::Imported(summary)))
        }
        UserCommand::ExportRows => Ok(Some(UiUpdate::Exported(export_rows(&state.registry)))),
        UserCommand::ResetDraft => {
            state.registry.reset_draft();
            state.supervisor.clear_seen();
            state.activity.clear();
            state.persist_registry();
            info!("Draft results cleared");
            Ok(Some(UiUpdate::Notice("Draft reset; ranks and tags kept".into())))
        }
        UserCommand::SaveSlot(index) => {
            state.slots.save(index, &state.registry, Utc::now())?;
            state.persist_slots();
            Ok(Some(UiUpdate::Slots(state.slots.summaries())))
        }
        UserCommand::LoadSlot(index) => {
            state.slots.load(index, &mut state.registry)?;
            state.persist_registry();
            let name = state.slots.name(index).unwrap_or_default();
            Ok(Some(UiUpdate::Notice(format!("Loaded {name}"))))
        }
        UserCommand::ClearSlot(index) => {
            state.slots.clear(index)?;
            state.persist_slots();
            Ok(Some(UiUpdate::Slots(state.slots.summaries())))
        }
        UserCommand::RenameSlot(index, name) => {
            state.slots.rename(index, &name)?;
            state.persist_slots();
            Ok(Some(UiUpdate::Slots(state.slots.summaries())))
        }
        UserCommand::ListSlots => Ok(Some(UiUpdate::Slots(state.slots.summaries()))),
        UserCommand::RefreshPlayers { force } => {
            if force {
                state.clear_feed_cache();
            }
            Ok(Some(match state.start_refresh(force) {
                Some(summary) => UiUpdate::RefreshComplete(summary),
                None => UiUpdate::Notice("Refreshing player data...".into()),
            }))
        }
        UserCommand::Stats => Ok(Some(UiUpdate::Stats(state.registry.stats()))),
        UserCommand::RecentPicks => Ok(Some(UiUpdate::RecentPicks(
            state.activity.iter().cloned().collect(),
        ))),
        UserCommand::Quit => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use draftsync_core::draft::player::{Position, Tag};
    use draftsync_core::draft::slots::SavedSlot;
    use draftsync_core::sources::channel::PushChannel;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        registry: Mutex<Option<RegistrySnapshot>>,
        slots: Mutex<Option<Vec<SavedSlot>>>,
        cache: Mutex<Option<FeedCache>>,
    }

    impl RegistryStore for MemoryStore {
        fn load_registry_snapshot(&self) -> anyhow::Result<Option<RegistrySnapshot>> {
            Ok(self.registry.lock().unwrap().clone())
        }
        fn save_registry_snapshot(&self, snapshot: &RegistrySnapshot) -> anyhow::Result<()> {
            *self.registry.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
        fn load_slots(&self) -> anyhow::Result<Option<Vec<SavedSlot>>> {
            Ok(self.slots.lock().unwrap().clone())
        }
        fn save_slots(&self, slots: &[SavedSlot]) -> anyhow::Result<()> {
            *self.slots.lock().unwrap() = Some(slots.to_vec());
            Ok(())
        }
        fn load_feed_cache(&self) -> anyhow::Result<Option<FeedCache>> {
            Ok(self.cache.lock().unwrap().clone())
        }
        fn save_feed_cache(&self, cache: &FeedCache) -> anyhow::Result<()> {
            *self.cache.lock().unwrap() = Some(cache.clone());
            Ok(())
        }
        fn clear_feed_cache(&self) -> anyhow::Result<()> {
            *self.cache.lock().unwrap() = None;
            Ok(())
        }
    }

    struct Offline;

    #[async_trait]
    impl JsonFetcher for Offline {
        async fn fetch_json(
            &self,
            url: &str,
            _headers: &[(String, String)],
        ) -> draftsync_core::Result<Value> {
            Err(SyncError::Network(format!("offline: {url}")))
        }
    }

    #[async_trait]
    impl ChannelOpener for Offline {
        async fn open(&self, url: &str) -> draftsync_core::Result<PushChannel> {
            Err(SyncError::Network(format!("offline: {url}")))
        }
    }

    fn test_state() -> AppState {
        let mut config = Config::default();
        config.refresh.on_startup = false;
        let (mut state, _channels) = AppState::new(
            config,
            Box::new(MemoryStore::default()),
            Arc::new(Offline),
            Arc::new(Offline),
        );
        recover_from_store(&mut state);
        state
    }

    #[tokio::test]
    async fn recovery_seeds_empty_store() {
        let state = test_state();
        assert_eq!(state.registry.len(), default_registry().len());
        assert!(state.store.load_registry_snapshot().unwrap().is_some());
    }

    #[tokio::test]
    async fn toggle_drafted_assigns_pick_then_clears() {
        let mut state = test_state();
        apply_command(&mut state, UserCommand::ToggleDrafted(1)).unwrap();
        apply_command(&mut state, UserCommand::ToggleDrafted(2)).unwrap();
        assert_eq!(state.registry.get(2).unwrap().draft_pick, Some(2));

        let update = apply_command(&mut state, UserCommand::ToggleDrafted(2)).unwrap();
        assert_eq!(
            update,
            Some(UiUpdate::DraftToggled {
                player_id: 2,
                drafted: false
            })
        );
        let p = state.registry.get(2).unwrap();
        assert!(!p.is_drafted);
        assert_eq!(p.draft_pick, None);
    }

    #[tokio::test]
    async fn reorder_persists_and_reports_rank() {
        let mut state = test_state();
        let update = apply_command(
            &mut state,
            UserCommand::Reorder {
                player_id: 3,
                target_rank: 1,
            },
        )
        .unwrap();
        assert_eq!(
            update,
            Some(UiUpdate::RankChanged {
                player_id: 3,
                rank: 1,
                moved: true
            })
        );
        let saved = state.store.load_registry_snapshot().unwrap().unwrap();
        assert_eq!(saved.players[0].id, 3);
    }

    #[tokio::test]
    async fn unknown_player_is_reported_not_panicked() {
        let mut state = test_state();
        let err = apply_command(&mut state, UserCommand::ToggleTag(9999, Tag::Rookie)).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn add_player_validates_and_defaults_team() {
        let mut state = test_state();
        let err = apply_command(
            &mut state,
            UserCommand::AddPlayer {
                name: "  ".into(),
                team: "".into(),
                position: Position::TightEnd,
                rank: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));

        let update = apply_command(
            &mut state,
            UserCommand::AddPlayer {
                name: "Colston Loveland".into(),
                team: "".into(),
                position: Position::TightEnd,
                rank: Some(5),
            },
        )
        .unwrap();
        let Some(UiUpdate::PlayerAdded { player_id, rank }) = update else {
            panic!("expected PlayerAdded, got {update:?}");
        };
        assert_eq!(rank, 5);
        assert_eq!(state.registry.get(player_id).unwrap().team, FREE_AGENT);
        assert!(state.registry.is_dense());
    }

    #[tokio::test]
    async fn reset_draft_keeps_ranks_and_tags() {
        let mut state = test_state();
        apply_command(&mut state, UserCommand::ToggleTag(4, Tag::Sleeper)).unwrap();
        apply_command(&mut state, UserCommand::ToggleDrafted(4)).unwrap();
        apply_command(&mut state, UserCommand::ResetDraft).unwrap();

        let p = state.registry.get(4).unwrap();
        assert!(!p.is_drafted);
        assert_eq!(p.rank, 4);
        assert!(p.has_tag(Tag::Sleeper));
        assert!(state.activity.is_empty());
    }

    #[tokio::test]
    async fn slot_commands_round_trip_through_store() {
        let mut state = test_state();
        apply_command(&mut state, UserCommand::RenameSlot(1, "Zero RB".into())).unwrap();
        apply_command(&mut state, UserCommand::SaveSlot(1)).unwrap();
        apply_command(
            &mut state,
            UserCommand::Reorder {
                player_id: 10,
                target_rank: 1,
            },
        )
        .unwrap();
        apply_command(&mut state, UserCommand::LoadSlot(1)).unwrap();
        assert_eq!(state.registry.iter().next().unwrap().id, 1);

        let saved = state.store.load_slots().unwrap().unwrap();
        assert_eq!(saved[1].name, "Zero RB");
        assert!(saved[1].players.is_some());

        let err = apply_command(&mut state, UserCommand::LoadSlot(2)).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_populated_board() {
        let mut state = test_state();
        let before = state.registry.snapshot();
        let summary = state.finish_refresh(Err(SyncError::Network("down".into())));
        assert!(!summary.changed());
        assert_eq!(state.registry.snapshot(), before);
    }

    #[tokio::test]
    async fn successful_refresh_stores_cache_and_merges() {
        let mut state = test_state();
        let records = vec![BulkRecord {
            external_id: "9001".into(),
            name: "Brand New Rookie".into(),
            team: "NYG".into(),
            position: Position::RunningBack,
            injury_status: None,
            bye_week: None,
            feed_rank: 1,
        }];
        let summary = state.finish_refresh(Ok(records));
        assert_eq!(summary.added, 1);
        assert!(state.store.load_feed_cache().unwrap().is_some());

        // A fresh cache is reapplied without fetching.
        let again = state.start_refresh(false).unwrap();
        assert_eq!(again.source, refresh::RefreshSource::Cache);
    }
}
