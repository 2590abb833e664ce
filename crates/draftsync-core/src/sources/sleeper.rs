// Sleeper adapter: REST snapshot of a draft's picks plus the Phoenix
// websocket that announces each pick as it happens.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    collect_picks, join_name, join_url, position_code, str_at, text_at, u32_at, JsonFetcher,
    Platform, SourceAdapter, StreamSpec, Verified,
};
use crate::draft::ingest::PickEvent;
use crate::error::{Result, SyncError};

/// Drafter labels are owner ids; the first ten characters are enough to tell
/// teams apart in the UI.
const DRAFTER_LABEL_LEN: usize = 10;

pub struct SleeperAdapter {
    draft_id: String,
    api_base: String,
    ws_url: String,
    fetcher: Arc<dyn JsonFetcher>,
}

impl SleeperAdapter {
    pub fn new(
        draft_id: String,
        api_base: &str,
        ws_url: &str,
        fetcher: Arc<dyn JsonFetcher>,
    ) -> Self {
        Self {
            draft_id,
            api_base: api_base.to_string(),
            ws_url: ws_url.to_string(),
            fetcher,
        }
    }

    fn topic(&self) -> String {
        format!("draft:{}", self.draft_id)
    }
}

fn truncate_label(label: String) -> String {
    label.chars().take(DRAFTER_LABEL_LEN).collect()
}

/// One pick object, as returned by `/draft/{id}/picks` and carried in the
/// `picked` push payload.
fn parse_pick(pick: &Value) -> Result<PickEvent> {
    let pick_no = u32_at(pick, "/pick_no")
        .ok_or_else(|| SyncError::Parse("pick without pick_no".into()))?;
    let name = join_name(
        str_at(pick, "/metadata/first_name"),
        str_at(pick, "/metadata/last_name"),
    )
    .ok_or_else(|| SyncError::Parse(format!("pick {pick_no} has no player name")))?;

    let drafter = text_at(pick, "/metadata/owner_id")
        .or_else(|| text_at(pick, "/picked_by"))
        .map(truncate_label);

    Ok(PickEvent {
        position: str_at(pick, "/metadata/position").and_then(position_code),
        team: str_at(pick, "/metadata/team").map(str::to_uppercase),
        overall_pick: Some(pick_no),
        drafter_label: drafter,
        round: u32_at(pick, "/round"),
        ..PickEvent::new(pick_no, name)
    })
}

/// Phoenix frames arrive either as `[join_ref, ref, topic, event, payload]`
/// arrays or as `{topic, event, payload}` objects.
fn picked_payload(frame: &Value) -> Option<&Value> {
    let (event, payload) = match frame {
        Value::Array(parts) if parts.len() >= 5 => (parts[3].as_str()?, &parts[4]),
        Value::Object(_) => (frame.get("event")?.as_str()?, frame.get("payload")?),
        _ => return None,
    };
    (event == "picked").then_some(payload)
}

#[async_trait]
impl SourceAdapter for SleeperAdapter {
    fn platform(&self) -> Platform {
        Platform::Sleeper
    }

    async fn verify(&self) -> Result<Verified> {
        let url = join_url(&self.api_base, &format!("draft/{}", self.draft_id));
        let draft = self.fetcher.fetch_json(&url, &[]).await?;
        if draft.get("draft_id").map_or(true, Value::is_null) {
            return Err(SyncError::NotFound(format!("Sleeper draft {}", self.draft_id)));
        }
        let name = str_at(&draft, "/metadata/name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Draft {}", self.draft_id));
        Ok(Verified {
            label: format!("Sleeper: {name}"),
            snapshot: None,
        })
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        let url = join_url(&self.api_base, &format!("draft/{}/picks", self.draft_id));
        self.fetcher.fetch_json(&url, &[]).await
    }

    fn normalize(&self, raw: &Value) -> Vec<PickEvent> {
        let picks = raw.as_array().map(Vec::as_slice).unwrap_or(&[]);
        collect_picks(Platform::Sleeper, picks, parse_pick)
    }

    fn stream(&self) -> Option<StreamSpec> {
        let join = json!({
            "topic": self.topic(),
            "event": "phx_join",
            "payload": {},
            "ref": "1",
        });
        Some(StreamSpec {
            url: self.ws_url.clone(),
            join_messages: vec![join.to_string()],
        })
    }

    fn heartbeat_message(&self) -> Option<String> {
        let beat = json!({
            "topic": "phoenix",
            "event": "heartbeat",
            "payload": {},
            "ref": chrono::Utc::now().timestamp_millis().to_string(),
        });
        Some(beat.to_string())
    }

    fn on_message(&self, raw: &str) -> Option<PickEvent> {
        let frame: Value = serde_json::from_str(raw).ok()?;
        parse_pick(picked_payload(&frame)?).ok()
    }
}
