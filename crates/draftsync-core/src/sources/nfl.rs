// NFL Fantasy adapter: league picks endpoint, polled.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    array_at, collect_picks, join_name, join_url, position_code, str_at, text_at, u32_at,
    JsonFetcher, Platform, SourceAdapter, Verified,
};
use crate::draft::ingest::PickEvent;
use crate::error::{Result, SyncError};

pub struct NflAdapter {
    league_id: String,
    season: u16,
    api_base: String,
    fetcher: Arc<dyn JsonFetcher>,
}

impl NflAdapter {
    pub fn new(league_id: String, season: u16, api_base: &str, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            league_id,
            season,
            api_base: api_base.to_string(),
            fetcher,
        }
    }

    fn picks_url(&self) -> String {
        join_url(
            &self.api_base,
            &format!(
                "league/{}/picks?season={}&format=json",
                self.league_id, self.season
            ),
        )
    }
}

/// Field on the pick itself, else on its nested `player` object.
fn pick_or_player<'a>(pick: &'a Value, field: &str) -> Option<&'a str> {
    str_at(pick, &format!("/{field}")).or_else(|| str_at(pick, &format!("/player/{field}")))
}

fn parse_pick(pick: &Value) -> Result<PickEvent> {
    let number = u32_at(pick, "/pickNumber")
        .or_else(|| u32_at(pick, "/pick_no"))
        .ok_or_else(|| SyncError::Parse("pick without pickNumber".into()))?;
    let name = join_name(pick_or_player(pick, "firstName"), pick_or_player(pick, "lastName"))
        .ok_or_else(|| SyncError::Parse(format!("pick {number} has no player name")))?;

    Ok(PickEvent {
        position: pick_or_player(pick, "position").and_then(position_code),
        team: pick_or_player(pick, "nflTeamAbbr").map(str::to_uppercase),
        overall_pick: Some(number),
        drafter_label: text_at(pick, "/teamId").map(|id| format!("Team {id}")),
        round: u32_at(pick, "/round"),
        ..PickEvent::new(number, name)
    })
}

#[async_trait]
impl SourceAdapter for NflAdapter {
    fn platform(&self) -> Platform {
        Platform::Nfl
    }

    async fn verify(&self) -> Result<Verified> {
        let body = self.fetcher.fetch_json(&self.picks_url(), &[]).await?;
        if body.is_null() {
            return Err(SyncError::NotFound(format!("NFL Fantasy league {}", self.league_id)));
        }
        Ok(Verified {
            label: format!("NFL Fantasy: League {}", self.league_id),
            snapshot: Some(body),
        })
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        self.fetcher.fetch_json(&self.picks_url(), &[]).await
    }

    fn normalize(&self, raw: &Value) -> Vec<PickEvent> {
        let mut picks = array_at(raw, "/picks");
        if picks.is_empty() {
            picks = array_at(raw, "/draftPicks");
        }
        collect_picks(Platform::Nfl, picks, parse_pick)
    }
}
