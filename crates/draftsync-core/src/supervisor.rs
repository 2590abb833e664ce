// Connection supervisor: owns at most one live draft session, runs its
// poll and push-channel tasks, and funnels their results back as
// generation-stamped events.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::draft::ingest::{
    apply_batch, apply_pick, BatchOutcome, PickEvent, RecentActivity, SeenPicks,
};
use crate::draft::registry::Registry;
use crate::error::{Result, SyncError};
use crate::sources::channel::{ChannelEvent, ChannelOpener};
use crate::sources::{
    build_adapter, validate_params, ConnectParams, JsonFetcher, Platform, SourceAdapter,
    SourceParams, StreamSpec, Verified,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const MANUAL_LABEL: &str = "Manual mode";

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Polling,
    Streaming,
    Error { reason: String },
}

impl ConnectionState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Polling | ConnectionState::Streaming
        )
    }
}

/// Snapshot of the connection for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub platform: Option<Platform>,
    pub label: Option<String>,
    /// Wall-clock time of the last applied update, for display only.
    pub last_updated: Option<DateTime<Utc>>,
    /// Monotonic time of the last applied update, for ordering.
    #[serde(skip)]
    pub updated_at: Option<Instant>,
    pub picks_seen: usize,
}

/// Result produced by a session task.
#[derive(Debug)]
pub struct SessionEvent {
    pub generation: u64,
    pub kind: SessionEventKind,
}

#[derive(Debug)]
pub enum SessionEventKind {
    Verified(Result<Verified>),
    Snapshot(Vec<PickEvent>),
    PollFailed(String),
    StreamOpened,
    StreamPick(PickEvent),
    StreamClosed,
}

/// What handling one event changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub state_changed: bool,
    pub picks: BatchOutcome,
}

/// The live connection. Dropped on disconnect, taking its seen set along.
pub struct SyncSession {
    pub platform: Platform,
    pub params: SourceParams,
    pub label: Option<String>,
    pub generation: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_at: Option<Instant>,
    seen: SeenPicks,
    adapter: Option<Arc<dyn SourceAdapter>>,
    cancel: CancellationToken,
}

impl SyncSession {
    fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
        self.updated_at = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

pub struct Supervisor {
    config: Config,
    fetcher: Arc<dyn JsonFetcher>,
    opener: Arc<dyn ChannelOpener>,
    state: ConnectionState,
    session: Option<SyncSession>,
    generation: u64,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl Supervisor {
    /// Create a supervisor and the receiver its tasks report on.
    pub fn new(
        config: Config,
        fetcher: Arc<dyn JsonFetcher>,
        opener: Arc<dyn ChannelOpener>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let supervisor = Self {
            config,
            fetcher,
            opener,
            state: ConnectionState::Disconnected,
            session: None,
            generation: 0,
            events_tx,
        };
        (supervisor, events_rx)
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn session(&self) -> Option<&SyncSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> ConnectionStatus {
        let session = self.session.as_ref();
        ConnectionStatus {
            state: self.state.clone(),
            platform: session.map(|s| s.platform),
            label: session.and_then(|s| s.label.clone()),
            last_updated: session.and_then(|s| s.last_updated),
            updated_at: session.and_then(|s| s.updated_at),
            picks_seen: session.map_or(0, |s| s.seen.len()),
        }
    }

    /// Validate, then start verifying a new session. The verify result comes
    /// back through the event channel.
    pub fn connect(&mut self, platform: Platform, params: &ConnectParams) -> Result<()> {
        if self.state.is_active() {
            return Err(SyncError::validation(
                "connection",
                "already connected; disconnect first",
            ));
        }
        let params = validate_params(platform, params, self.config.season.default_year)?;

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let adapter = build_adapter(&params, &self.config, self.fetcher.clone());

        let label = adapter.is_none().then(|| MANUAL_LABEL.to_string());
        self.session = Some(SyncSession {
            platform,
            params,
            label,
            generation,
            last_updated: None,
            updated_at: None,
            seen: SeenPicks::new(),
            adapter: adapter.clone(),
            cancel: cancel.clone(),
        });

        let Some(adapter) = adapter else {
            info!("Manual mode: no remote source");
            self.state = ConnectionState::Polling;
            return Ok(());
        };

        info!("Connecting to {platform} (generation {generation})");
        self.state = ConnectionState::Connecting;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = adapter.verify() => result,
            };
            emit(&tx, generation, SessionEventKind::Verified(result)).await;
        });
        Ok(())
    }

    /// Tear down the session. Results still in flight are discarded when
    /// they arrive.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            info!(
                "Disconnected from {} ({} picks seen)",
                session.platform,
                session.seen.len()
            );
        }
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
    }

    /// Forget every pick id seen so far. Used when the draft is reset so the
    /// next snapshot re-applies its picks.
    pub fn clear_seen(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.seen.clear();
        }
    }

    /// Apply one task result. Events from any other generation are dropped.
    pub fn handle_event(
        &mut self,
        event: SessionEvent,
        registry: &mut Registry,
        activity: &mut RecentActivity,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.generation == event.generation)
        else {
            debug!("Discarding event from stale generation {}", event.generation);
            return outcome;
        };

        match event.kind {
            SessionEventKind::Verified(Ok(verified)) => {
                let Some(adapter) = session.adapter.clone() else {
                    return outcome;
                };
                info!("Verified {}", verified.label);
                session.label = Some(verified.label);

                // A verify payload that doubles as a snapshot is applied now;
                // the first poll then waits a full interval.
                let interval = self.config.polling.interval_for(session.platform);
                let first_poll = match verified.snapshot {
                    Some(raw) => {
                        let events = adapter.normalize(&raw);
                        outcome.picks =
                            apply_batch(registry, &mut session.seen, activity, &events);
                        session.touch();
                        interval
                    }
                    None => Duration::ZERO,
                };

                spawn_poll(
                    adapter.clone(),
                    interval,
                    first_poll,
                    event.generation,
                    self.events_tx.clone(),
                    session.cancel.clone(),
                );
                if self.config.stream.enabled {
                    if let Some(spec) = adapter.stream() {
                        spawn_stream(
                            adapter,
                            self.opener.clone(),
                            spec,
                            self.config.stream.heartbeat_interval(),
                            event.generation,
                            self.events_tx.clone(),
                            session.cancel.clone(),
                        );
                    }
                }
                outcome.state_changed = self.set_state(ConnectionState::Polling);
            }
            SessionEventKind::Verified(Err(e)) => {
                warn!("Connection failed: {e}");
                if let Some(session) = self.session.take() {
                    session.cancel.cancel();
                }
                outcome.state_changed = self.set_state(ConnectionState::Error {
                    reason: e.to_string(),
                });
            }
            SessionEventKind::Snapshot(events) => {
                outcome.picks = apply_batch(registry, &mut session.seen, activity, &events);
                session.touch();
                if outcome.picks.changed() {
                    info!(
                        "Snapshot: {} new picks ({} matched)",
                        outcome.picks.applied, outcome.picks.matched
                    );
                }
            }
            SessionEventKind::PollFailed(reason) => {
                warn!("Poll failed: {reason}");
            }
            SessionEventKind::StreamOpened => {
                if self.state == ConnectionState::Polling {
                    outcome.state_changed = self.set_state(ConnectionState::Streaming);
                }
            }
            SessionEventKind::StreamPick(pick) => {
                let result = apply_pick(registry, &mut session.seen, activity, &pick);
                session.touch();
                if result.applied {
                    outcome.picks.applied = 1;
                    outcome.picks.matched = usize::from(result.matched.is_some());
                }
            }
            SessionEventKind::StreamClosed => {
                info!("Push channel closed; polling continues");
                if self.state == ConnectionState::Streaming {
                    outcome.state_changed = self.set_state(ConnectionState::Polling);
                }
            }
        }
        outcome
    }

    fn set_state(&mut self, state: ConnectionState) -> bool {
        if self.state == state {
            return false;
        }
        debug!("Connection state {:?} -> {:?}", self.state, state);
        self.state = state;
        true
    }
}

// ---------------------------------------------------------------------------
// Session tasks
// ---------------------------------------------------------------------------

/// Send an event; false once the supervisor side is gone.
async fn emit(tx: &mpsc::Sender<SessionEvent>, generation: u64, kind: SessionEventKind) -> bool {
    tx.send(SessionEvent { generation, kind }).await.is_ok()
}

fn spawn_poll(
    adapter: Arc<dyn SourceAdapter>,
    interval: Duration,
    first_poll: Duration,
    generation: u64,
    tx: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + first_poll, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let fetched = tokio::select! {
                _ = cancel.cancelled() => break,
                fetched = adapter.fetch_snapshot() => fetched,
            };
            let kind = match fetched {
                Ok(raw) => SessionEventKind::Snapshot(adapter.normalize(&raw)),
                Err(e) => SessionEventKind::PollFailed(e.to_string()),
            };
            if !emit(&tx, generation, kind).await {
                break;
            }
        }
        debug!("Poll loop for generation {generation} stopped");
    });
}

fn spawn_stream(
    adapter: Arc<dyn SourceAdapter>,
    opener: Arc<dyn ChannelOpener>,
    spec: StreamSpec,
    heartbeat: Duration,
    generation: u64,
    tx: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        run_stream(adapter, opener, spec, heartbeat, generation, &tx, &cancel).await;
        debug!("Stream task for generation {generation} stopped");
    });
}

async fn run_stream(
    adapter: Arc<dyn SourceAdapter>,
    opener: Arc<dyn ChannelOpener>,
    spec: StreamSpec,
    heartbeat: Duration,
    generation: u64,
    tx: &mpsc::Sender<SessionEvent>,
    cancel: &CancellationToken,
) {
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = opener.open(&spec.url) => opened,
    };
    let mut channel = match opened {
        Ok(channel) => channel,
        Err(e) => {
            warn!("Push channel unavailable: {e}");
            emit(tx, generation, SessionEventKind::StreamClosed).await;
            return;
        }
    };

    for frame in spec.join_messages {
        if channel.outgoing.send(frame).await.is_err() {
            emit(tx, generation, SessionEventKind::StreamClosed).await;
            return;
        }
    }
    if !emit(tx, generation, SessionEventKind::StreamOpened).await {
        return;
    }

    let mut beat = tokio::time::interval_at(Instant::now() + heartbeat, heartbeat);
    beat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = beat.tick() => {
                if let Some(frame) = adapter.heartbeat_message() {
                    // A lost heartbeat shows up as a close on the incoming side.
                    let _ = channel.outgoing.try_send(frame);
                }
            }
            incoming = channel.incoming.recv() => match incoming {
                Some(ChannelEvent::Message(text)) => {
                    if let Some(pick) = adapter.on_message(&text) {
                        if !emit(tx, generation, SessionEventKind::StreamPick(pick)).await {
                            return;
                        }
                    }
                }
                Some(ChannelEvent::Closed) | None => {
                    emit(tx, generation, SessionEventKind::StreamClosed).await;
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{Candidate, Position};
    use crate::sources::channel::PushChannel;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Answers by URL suffix; anything unrouted is a network error.
    struct Routes(Vec<(&'static str, Value)>);

    #[async_trait]
    impl JsonFetcher for Routes {
        async fn fetch_json(&self, url: &str, _headers: &[(String, String)]) -> Result<Value> {
            self.0
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| SyncError::Network(format!("connection refused: {url}")))
        }
    }

    /// Hands out in-memory channels and keeps the far ends for the test.
    #[derive(Default)]
    struct MemoryOpener {
        links: Mutex<Vec<(mpsc::Receiver<String>, mpsc::Sender<ChannelEvent>)>>,
    }

    #[async_trait]
    impl ChannelOpener for MemoryOpener {
        async fn open(&self, _url: &str) -> Result<PushChannel> {
            let (out_tx, out_rx) = mpsc::channel(16);
            let (in_tx, in_rx) = mpsc::channel(16);
            self.links.lock().unwrap().push((out_rx, in_tx));
            Ok(PushChannel {
                outgoing: out_tx,
                incoming: in_rx,
            })
        }
    }

    /// Refuses every push channel.
    struct RefusingOpener;

    #[async_trait]
    impl ChannelOpener for RefusingOpener {
        async fn open(&self, url: &str) -> Result<PushChannel> {
            Err(SyncError::Network(format!("handshake rejected: {url}")))
        }
    }

    fn board() -> Registry {
        let mut registry = Registry::new();
        registry.push_back(Candidate::new("Josh Allen", "BUF", Position::Quarterback));
        registry.push_back(Candidate::new("Bijan Robinson", "ATL", Position::RunningBack));
        registry.push_back(Candidate::new("Puka Nacua", "LAR", Position::WideReceiver));
        registry
    }

    fn sleeper_pick(pick_no: u32, first: &str, last: &str, pos: &str) -> Value {
        json!({"pick_no": pick_no, "metadata": {"first_name": first, "last_name": last, "position": pos}})
    }

    fn sleeper_routes() -> Routes {
        Routes(vec![
            (
                "/draft/123456789",
                json!({"draft_id": "123456789", "metadata": {"name": "Home League"}}),
            ),
            (
                "/draft/123456789/picks",
                json!([sleeper_pick(1, "Bijan", "Robinson", "RB")]),
            ),
        ])
    }

    fn supervisor(
        fetcher: Routes,
        stream: bool,
    ) -> (Supervisor, mpsc::Receiver<SessionEvent>, Arc<MemoryOpener>) {
        let mut config = Config::default();
        config.stream.enabled = stream;
        let opener = Arc::new(MemoryOpener::default());
        let (sup, rx) = Supervisor::new(config, Arc::new(fetcher), opener.clone());
        (sup, rx, opener)
    }

    #[tokio::test]
    async fn invalid_params_leave_state_alone() {
        let (mut sup, _rx, _) = supervisor(Routes(vec![]), false);
        let err = sup
            .connect(Platform::Espn, &ConnectParams::new("not-a-number"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert_eq!(sup.state(), &ConnectionState::Disconnected);
        assert!(sup.session().is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_ends_in_error() {
        let (mut sup, mut rx, _) = supervisor(Routes(vec![]), false);
        let mut registry = board();
        let before = registry.snapshot();
        let mut activity = RecentActivity::new();

        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        assert_eq!(sup.state(), &ConnectionState::Connecting);

        let event = rx.recv().await.unwrap();
        let outcome = sup.handle_event(event, &mut registry, &mut activity);
        assert!(outcome.state_changed);
        assert!(matches!(sup.state(), ConnectionState::Error { .. }));
        assert_eq!(registry.snapshot(), before);
        assert_eq!(sup.status().picks_seen, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn verified_session_polls_and_applies_picks() {
        let (mut sup, mut rx, _) = supervisor(sleeper_routes(), false);
        let mut registry = board();
        let mut activity = RecentActivity::new();

        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        let verified = rx.recv().await.unwrap();
        sup.handle_event(verified, &mut registry, &mut activity);
        assert_eq!(sup.state(), &ConnectionState::Polling);
        assert_eq!(sup.status().label.as_deref(), Some("Sleeper: Home League"));

        let snapshot = rx.recv().await.unwrap();
        let outcome = sup.handle_event(snapshot, &mut registry, &mut activity);
        assert_eq!(outcome.picks.applied, 1);
        assert!(registry.get(2).unwrap().is_drafted);
        let first_update = sup.status().updated_at.unwrap();

        // The next poll returns the same pick and changes nothing.
        let again = rx.recv().await.unwrap();
        let outcome = sup.handle_event(again, &mut registry, &mut activity);
        assert!(!outcome.picks.changed());
        assert_eq!(activity.len(), 1);
        assert!(sup.status().updated_at.unwrap() > first_update);
    }

    #[tokio::test]
    async fn connect_while_active_is_rejected() {
        let (mut sup, _rx, _) = supervisor(sleeper_routes(), false);
        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        let err = sup
            .connect(Platform::Espn, &ConnectParams::new("1"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert_eq!(sup.state(), &ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn stale_events_discarded_after_disconnect() {
        let (mut sup, mut rx, _) = supervisor(sleeper_routes(), false);
        let mut registry = board();
        let mut activity = RecentActivity::new();

        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        let generation = sup.session().unwrap().generation;
        let verified = rx.recv().await.unwrap();
        sup.disconnect();

        let outcome = sup.handle_event(verified, &mut registry, &mut activity);
        assert_eq!(outcome, EventOutcome::default());
        assert_eq!(sup.state(), &ConnectionState::Disconnected);

        let stale = SessionEvent {
            generation,
            kind: SessionEventKind::Snapshot(vec![PickEvent::new(1, "Josh Allen")]),
        };
        sup.handle_event(stale, &mut registry, &mut activity);
        assert_eq!(registry.stats().drafted, 0);
        assert!(activity.is_empty());
    }

    #[tokio::test]
    async fn manual_mode_needs_no_network() {
        let (mut sup, _rx, _) = supervisor(Routes(vec![]), true);
        sup.connect(Platform::Manual, &ConnectParams::default()).unwrap();
        assert_eq!(sup.state(), &ConnectionState::Polling);
        assert_eq!(sup.status().label.as_deref(), Some(MANUAL_LABEL));
        sup.disconnect();
        assert_eq!(sup.state(), &ConnectionState::Disconnected);
        assert!(sup.status().platform.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_picks_apply_and_close_falls_back_to_polling() {
        let (mut sup, mut rx, opener) = supervisor(sleeper_routes(), true);
        let mut registry = board();
        let mut activity = RecentActivity::new();

        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        while sup.state() != &ConnectionState::Streaming {
            let event = rx.recv().await.unwrap();
            sup.handle_event(event, &mut registry, &mut activity);
        }

        let (mut outgoing, incoming) = opener.links.lock().unwrap().remove(0);
        let join: Value = serde_json::from_str(&outgoing.recv().await.unwrap()).unwrap();
        assert_eq!(join["topic"], "draft:123456789");

        let frame = json!(["1", null, "draft:123456789", "picked", sleeper_pick(2, "Puka", "Nacua", "WR")]);
        incoming
            .send(ChannelEvent::Message(frame.to_string()))
            .await
            .unwrap();
        loop {
            let event = rx.recv().await.unwrap();
            let is_pick = matches!(event.kind, SessionEventKind::StreamPick(_));
            sup.handle_event(event, &mut registry, &mut activity);
            if is_pick {
                break;
            }
        }
        assert!(registry.get(3).unwrap().is_drafted);

        incoming.send(ChannelEvent::Closed).await.unwrap();
        while sup.state() == &ConnectionState::Streaming {
            let event = rx.recv().await.unwrap();
            sup.handle_event(event, &mut registry, &mut activity);
        }
        assert_eq!(sup.state(), &ConnectionState::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_push_channel_keeps_polling() {
        let mut config = Config::default();
        config.stream.enabled = true;
        let (mut sup, mut rx) =
            Supervisor::new(config, Arc::new(sleeper_routes()), Arc::new(RefusingOpener));
        let mut registry = board();
        let mut activity = RecentActivity::new();

        sup.connect(Platform::Sleeper, &ConnectParams::new("123456789")).unwrap();
        loop {
            let event = rx.recv().await.unwrap();
            let closed = matches!(event.kind, SessionEventKind::StreamClosed);
            sup.handle_event(event, &mut registry, &mut activity);
            if closed {
                break;
            }
        }
        assert_eq!(sup.state(), &ConnectionState::Polling);

        // Polling still delivers picks.
        while !registry.get(2).unwrap().is_drafted {
            let event = rx.recv().await.unwrap();
            sup.handle_event(event, &mut registry, &mut activity);
        }
        assert_eq!(sup.state(), &ConnectionState::Polling);
    }
}
