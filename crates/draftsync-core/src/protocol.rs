// Messages between the front end and the orchestrator loop.

use crate::draft::ingest::{ActivityEntry, BatchOutcome};
use crate::draft::player::{Player, PlayerId, Position, Tag};
use crate::draft::registry::DraftStats;
use crate::draft::rows::ImportSummary;
use crate::draft::slots::SlotSummary;
use crate::error::SyncError;
use crate::refresh::RefreshSummary;
use crate::sources::{ConnectParams, Platform};
use crate::supervisor::ConnectionStatus;

/// Commands sent from the front end to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Connect {
        platform: Platform,
        params: ConnectParams,
    },
    Disconnect,
    GetConnectionState,
    Reorder {
        player_id: PlayerId,
        target_rank: u32,
    },
    SetRank {
        player_id: PlayerId,
        rank: u32,
    },
    DragOnto {
        player_id: PlayerId,
        target_id: PlayerId,
    },
    ToggleDrafted(PlayerId),
    ToggleTag(PlayerId, Tag),
    DisplayList {
        position: Option<Position>,
        query: Option<String>,
    },
    /// `rank: None` appends at the bottom.
    AddPlayer {
        name: String,
        team: String,
        position: Position,
        rank: Option<u32>,
    },
    ImportRows(Vec<Vec<String>>),
    ExportRows,
    ResetDraft,
    SaveSlot(usize),
    LoadSlot(usize),
    ClearSlot(usize),
    RenameSlot(usize, String),
    ListSlots,
    RefreshPlayers {
        force: bool,
    },
    Stats,
    RecentPicks,
    Quit,
}

/// Updates pushed from the orchestrator to the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Connection(ConnectionStatus),
    DisplayList(Vec<Player>),
    RankChanged {
        player_id: PlayerId,
        rank: u32,
        moved: bool,
    },
    DraftToggled {
        player_id: PlayerId,
        drafted: bool,
    },
    TagToggled {
        player_id: PlayerId,
        tag: Tag,
        active: bool,
    },
    PlayerAdded {
        player_id: PlayerId,
        rank: u32,
    },
    /// A session event applied at least one new pick.
    PicksApplied {
        applied: usize,
        matched: usize,
    },
    RecentPicks(Vec<ActivityEntry>),
    Imported(ImportSummary),
    Exported(Vec<Vec<String>>),
    Slots(Vec<SlotSummary>),
    Stats(DraftStats),
    RefreshComplete(RefreshSummary),
    Notice(String),
    Error(SyncError),
}

impl UiUpdate {
    pub fn picks_applied(outcome: BatchOutcome) -> Self {
        UiUpdate::PicksApplied {
            applied: outcome.applied,
            matched: outcome.matched,
        }
    }
}
