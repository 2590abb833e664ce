// Source adapters: one per draft platform, each turning platform payloads
// into `PickEvent`s. Nothing downstream of this module knows which platform
// produced an event.

pub mod channel;
pub mod espn;
pub mod http;
pub mod nfl;
pub mod sleeper;
pub mod yahoo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::draft::ingest::PickEvent;
use crate::draft::player::Position;
use crate::error::{Result, SyncError};

// ---------------------------------------------------------------------------
// Platforms and connect parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Sleeper,
    Espn,
    Yahoo,
    Nfl,
    Manual,
}

impl Platform {
    pub fn from_str_platform(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sleeper" => Some(Platform::Sleeper),
            "espn" => Some(Platform::Espn),
            "yahoo" => Some(Platform::Yahoo),
            "nfl" | "nfl.com" => Some(Platform::Nfl),
            "manual" => Some(Platform::Manual),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Platform::Sleeper => "Sleeper",
            Platform::Espn => "ESPN",
            Platform::Yahoo => "Yahoo",
            Platform::Nfl => "NFL Fantasy",
            Platform::Manual => "Manual",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// Raw connect input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    /// Draft id/URL (Sleeper), league id (ESPN, NFL), or league key (Yahoo).
    pub id: String,
    pub season: Option<String>,
}

impl ConnectParams {
    pub fn new(id: impl Into<String>) -> Self {
        ConnectParams {
            id: id.into(),
            season: None,
        }
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }
}

/// Connect parameters after per-platform validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceParams {
    Sleeper { draft_id: String },
    Espn { league_id: String, season: u16 },
    Yahoo { league_key: String, season: u16 },
    Nfl { league_id: String, season: u16 },
    Manual,
}

impl SourceParams {
    pub fn platform(&self) -> Platform {
        match self {
            SourceParams::Sleeper { .. } => Platform::Sleeper,
            SourceParams::Espn { .. } => Platform::Espn,
            SourceParams::Yahoo { .. } => Platform::Yahoo,
            SourceParams::Nfl { .. } => Platform::Nfl,
            SourceParams::Manual => Platform::Manual,
        }
    }
}

/// Pull a Sleeper draft id out of a bare id or a draft URL.
///
/// Prefers the first run of 15+ digits (the id inside a URL); otherwise
/// keeps every digit in the input.
fn extract_sleeper_draft_id(raw: &str) -> Option<String> {
    let mut run = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            if run.len() >= 15 {
                return Some(run);
            }
            run.clear();
        }
    }
    if run.len() >= 15 {
        return Some(run);
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() >= 5).then_some(digits)
}

fn parse_season(raw: Option<&str>, default_year: u16) -> Result<u16> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default_year);
    };
    match raw.parse::<u16>() {
        Ok(year) if (2000..=2100).contains(&year) => Ok(year),
        _ => Err(SyncError::validation(
            "season",
            format!("expected a four-digit year, got {raw:?}"),
        )),
    }
}

/// Format-check connect parameters for a platform. No network access.
pub fn validate_params(
    platform: Platform,
    params: &ConnectParams,
    default_year: u16,
) -> Result<SourceParams> {
    let id = params.id.trim();
    let season = params.season.as_deref();
    match platform {
        Platform::Sleeper => extract_sleeper_draft_id(id)
            .map(|draft_id| SourceParams::Sleeper { draft_id })
            .ok_or_else(|| SyncError::validation("draft_id", "invalid Sleeper draft ID or URL")),
        Platform::Espn => {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(SyncError::validation(
                    "league_id",
                    "ESPN league IDs are numeric",
                ));
            }
            Ok(SourceParams::Espn {
                league_id: id.to_string(),
                season: parse_season(season, default_year)?,
            })
        }
        Platform::Yahoo => {
            if id.is_empty() {
                return Err(SyncError::validation(
                    "league_key",
                    "enter a Yahoo league key (e.g. 449.l.12345678)",
                ));
            }
            Ok(SourceParams::Yahoo {
                league_key: id.to_string(),
                season: parse_season(season, default_year)?,
            })
        }
        Platform::Nfl => {
            if id.is_empty() {
                return Err(SyncError::validation("league_id", "enter an NFL Fantasy league ID"));
            }
            Ok(SourceParams::Nfl {
                league_id: id.to_string(),
                season: parse_season(season, default_year)?,
            })
        }
        Platform::Manual => Ok(SourceParams::Manual),
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// "GET this URL as JSON". Non-success statuses are errors: 404 maps to
/// `NotFound`, everything else to `Network`.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str, headers: &[(String, String)]) -> Result<Value>;
}

/// Result of the one-off reachability check made on connect.
#[derive(Debug, Clone, PartialEq)]
pub struct Verified {
    /// Human-readable source label, e.g. "Sleeper: Friends League".
    pub label: String,
    /// Some platforms verify by fetching the draft itself; that payload
    /// doubles as the first snapshot.
    pub snapshot: Option<Value>,
}

/// Push channel endpoint plus the frames to send right after it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub url: String,
    pub join_messages: Vec<String>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn verify(&self) -> Result<Verified>;

    async fn fetch_snapshot(&self) -> Result<Value>;

    /// Extract every well-formed pick. Malformed picks are skipped.
    fn normalize(&self, raw: &Value) -> Vec<PickEvent>;

    /// Push channel, for platforms that offer one.
    fn stream(&self) -> Option<StreamSpec> {
        None
    }

    /// Keep-alive frame sent on the push channel.
    fn heartbeat_message(&self) -> Option<String> {
        None
    }

    /// Decode one push-channel message into a pick, if it carries one.
    fn on_message(&self, _raw: &str) -> Option<PickEvent> {
        None
    }
}

/// Build the adapter for validated params. Manual mode has none.
pub fn build_adapter(
    params: &SourceParams,
    config: &Config,
    fetcher: Arc<dyn JsonFetcher>,
) -> Option<Arc<dyn SourceAdapter>> {
    let endpoints = &config.endpoints;
    match params {
        SourceParams::Sleeper { draft_id } => Some(Arc::new(sleeper::SleeperAdapter::new(
            draft_id.clone(),
            &endpoints.sleeper_api,
            &endpoints.sleeper_ws,
            fetcher,
        ))),
        SourceParams::Espn { league_id, season } => Some(Arc::new(espn::EspnAdapter::new(
            league_id.clone(),
            *season,
            &endpoints.espn_api,
            fetcher,
        ))),
        SourceParams::Yahoo { league_key, .. } => Some(Arc::new(yahoo::YahooAdapter::new(
            league_key.clone(),
            &endpoints.yahoo_api,
            config.credentials.yahoo_access_token.clone(),
            fetcher,
        ))),
        SourceParams::Nfl { league_id, season } => Some(Arc::new(nfl::NflAdapter::new(
            league_id.clone(),
            *season,
            &endpoints.nfl_api,
            fetcher,
        ))),
        SourceParams::Manual => None,
    }
}

// ---------------------------------------------------------------------------
// Payload helpers shared by the adapters
// ---------------------------------------------------------------------------

/// Non-empty trimmed string at a JSON pointer.
pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Positive integer at a JSON pointer; numeric strings are accepted.
pub(crate) fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| *n > 0)
}

/// String or number at a JSON pointer, rendered as text.
pub(crate) fn text_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Array at a JSON pointer, or an empty slice.
pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Canonical position code for a platform position string. Multi-position
/// strings ("WR,TE") use the first entry; unknown codes pass through
/// uppercased.
pub(crate) fn position_code(raw: &str) -> Option<String> {
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(match Position::from_str_pos(first) {
        Some(pos) => pos.display_str().to_string(),
        None => first.to_uppercase(),
    })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Run `parse` over every pick, dropping the ones that fail.
pub(crate) fn collect_picks<F>(platform: Platform, picks: &[Value], parse: F) -> Vec<PickEvent>
where
    F: Fn(&Value) -> Result<PickEvent>,
{
    picks
        .iter()
        .filter_map(|pick| match parse(pick) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("{platform}: skipping pick: {e}");
                None
            }
        })
        .collect()
}
