// JSON-over-HTTP fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::JsonFetcher;
use crate::error::{Result, SyncError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = concat!("draftsync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

/// Map a failed status to the error kind callers distinguish on.
fn status_error(url: &str, status: StatusCode) -> SyncError {
    if status == StatusCode::NOT_FOUND {
        SyncError::NotFound(url.to_string())
    } else {
        SyncError::Network(format!("{url} returned {status}"))
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str, headers: &[(String, String)]) -> Result<Value> {
        let mut request = self.http.get(url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("reading {url} failed: {e}")))?;
        debug!(url, bytes = body.len(), "fetched");
        serde_json::from_str(&body).map_err(|e| SyncError::Parse(format!("{url}: {e}")))
    }
}
