// Yahoo adapter: league draft results, polled. Private leagues need an
// OAuth bearer token from the credentials file.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    array_at, collect_picks, join_url, position_code, str_at, text_at, u32_at, JsonFetcher,
    Platform, SourceAdapter, Verified,
};
use crate::draft::ingest::PickEvent;
use crate::error::{Result, SyncError};

pub struct YahooAdapter {
    league_key: String,
    api_base: String,
    access_token: Option<String>,
    fetcher: Arc<dyn JsonFetcher>,
}

impl YahooAdapter {
    pub fn new(
        league_key: String,
        api_base: &str,
        access_token: Option<String>,
        fetcher: Arc<dyn JsonFetcher>,
    ) -> Self {
        Self {
            league_key,
            api_base: api_base.to_string(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            fetcher,
        }
    }

    fn results_url(&self) -> String {
        join_url(
            &self.api_base,
            &format!("league/{}/draftresults?format=json", self.league_key),
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.access_token
            .iter()
            .map(|token| ("Authorization".to_string(), format!("Bearer {}", token.trim())))
            .collect()
    }

    async fn fetch(&self) -> Result<Value> {
        self.fetcher.fetch_json(&self.results_url(), &self.headers()).await
    }
}

fn parse_pick(entry: &Value) -> Result<PickEvent> {
    let pick = u32_at(entry, "/pick")
        .ok_or_else(|| SyncError::Parse("draft result without pick".into()))?;
    let name = str_at(entry, "/player/0/name/full")
        .ok_or_else(|| SyncError::Parse(format!("pick {pick} has no player name")))?;

    Ok(PickEvent {
        position: str_at(entry, "/player/0/display_position").and_then(position_code),
        team: str_at(entry, "/player/0/editorial_team_abbr").map(str::to_uppercase),
        overall_pick: Some(pick),
        drafter_label: text_at(entry, "/team_key"),
        round: u32_at(entry, "/round"),
        ..PickEvent::new(pick, name)
    })
}

#[async_trait]
impl SourceAdapter for YahooAdapter {
    fn platform(&self) -> Platform {
        Platform::Yahoo
    }

    async fn verify(&self) -> Result<Verified> {
        let body = self.fetch().await?;
        if body.get("fantasy_content").map_or(true, Value::is_null) {
            return Err(SyncError::NotFound(format!("Yahoo league {}", self.league_key)));
        }
        let name = str_at(&body, "/fantasy_content/league/0/name")
            .map(str::to_string)
            .unwrap_or_else(|| self.league_key.clone());
        Ok(Verified {
            label: format!("Yahoo: {name}"),
            snapshot: Some(body),
        })
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        self.fetch().await
    }

    fn normalize(&self, raw: &Value) -> Vec<PickEvent> {
        let results = array_at(raw, "/fantasy_content/league/1/draft_results/0/draft_result");
        collect_picks(Platform::Yahoo, results, parse_pick)
    }
}
