// ESPN adapter: league draft detail view, polled.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    array_at, collect_picks, join_name, join_url, str_at, u32_at, JsonFetcher, Platform,
    SourceAdapter, Verified,
};
use crate::draft::ingest::PickEvent;
use crate::error::{Result, SyncError};

pub struct EspnAdapter {
    league_id: String,
    season: u16,
    api_base: String,
    fetcher: Arc<dyn JsonFetcher>,
}

impl EspnAdapter {
    pub fn new(league_id: String, season: u16, api_base: &str, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            league_id,
            season,
            api_base: api_base.to_string(),
            fetcher,
        }
    }

    fn league_url(&self) -> String {
        join_url(
            &self.api_base,
            &format!(
                "seasons/{}/segments/0/leagues/{}?view=mDraftDetail",
                self.season, self.league_id
            ),
        )
    }
}

/// ESPN `defaultPositionId` codes.
fn position_for_id(id: u64) -> Option<&'static str> {
    match id {
        1 => Some("QB"),
        2 => Some("RB"),
        3 => Some("WR"),
        4 => Some("TE"),
        5 => Some("K"),
        16 => Some("DST"),
        _ => None,
    }
}

fn parse_pick(pick: &Value) -> Result<PickEvent> {
    let overall = u32_at(pick, "/overallPickNumber")
        .ok_or_else(|| SyncError::Parse("pick without overallPickNumber".into()))?;
    let player = pick
        .pointer("/playerPoolEntry/playerPoolEntry/player")
        .unwrap_or(&Value::Null);
    let name = join_name(str_at(player, "/firstName"), str_at(player, "/lastName"))
        .or_else(|| str_at(player, "/fullName").map(str::to_string))
        .ok_or_else(|| SyncError::Parse(format!("pick {overall} has no player name")))?;

    Ok(PickEvent {
        position: player
            .get("defaultPositionId")
            .and_then(Value::as_u64)
            .and_then(position_for_id)
            .map(str::to_string),
        overall_pick: Some(overall),
        drafter_label: u32_at(pick, "/teamId").map(|id| format!("Team {id}")),
        round: u32_at(pick, "/roundId"),
        ..PickEvent::new(overall, name)
    })
}

#[async_trait]
impl SourceAdapter for EspnAdapter {
    fn platform(&self) -> Platform {
        Platform::Espn
    }

    async fn verify(&self) -> Result<Verified> {
        let league = self.fetcher.fetch_json(&self.league_url(), &[]).await?;
        if league.get("draftDetail").map_or(true, Value::is_null) {
            return Err(SyncError::NotFound(format!(
                "ESPN league {} has no draft data (private leagues are not supported)",
                self.league_id
            )));
        }
        let name = str_at(&league, "/settings/name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("League {}", self.league_id));
        Ok(Verified {
            label: format!("ESPN: {name}"),
            snapshot: Some(league),
        })
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        self.fetcher.fetch_json(&self.league_url(), &[]).await
    }

    fn normalize(&self, raw: &Value) -> Vec<PickEvent> {
        collect_picks(Platform::Espn, array_at(raw, "/draftDetail/picks"), parse_pick)
    }
}
