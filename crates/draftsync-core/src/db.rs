// SQLite persistence for the ranking board, saved slots, and the player
// feed cache.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::draft::registry::RegistrySnapshot;
use crate::draft::slots::SavedSlot;
use crate::refresh::{BulkRecord, FeedCache};

const REGISTRY_KEY: &str = "registry";
const SLOTS_KEY: &str = "saved_slots";

/// Storage the orchestrator persists through after every mutation.
pub trait RegistryStore: Send {
    fn load_registry_snapshot(&self) -> Result<Option<RegistrySnapshot>>;
    fn save_registry_snapshot(&self, snapshot: &RegistrySnapshot) -> Result<()>;
    fn load_slots(&self) -> Result<Option<Vec<SavedSlot>>>;
    fn save_slots(&self, slots: &[SavedSlot]) -> Result<()>;
    fn load_feed_cache(&self) -> Result<Option<FeedCache>>;
    fn save_feed_cache(&self, cache: &FeedCache) -> Result<()>;
    fn clear_feed_cache(&self) -> Result<()>;
}

/// SQLite-backed store: a key/value `state` table for JSON documents and a
/// single-row `feed_cache` table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// `":memory:"` gives an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS feed_cache (
                id         INTEGER PRIMARY KEY CHECK (id = 1),
                fetched_at TEXT NOT NULL,
                records    TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection, recovering from a poisoned mutex.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("database mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Store `value` as JSON under `key`, replacing any previous value.
    pub fn save_state<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json_str = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize state {key}"))?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
                params![key, json_str],
            )
            .with_context(|| format!("failed to save state {key}"))?;
        Ok(())
    }

    pub fn load_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let json_str: Option<String> = self
            .conn()
            .query_row("SELECT value FROM state WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to query state {key}"))?;

        json_str
            .map(|s| {
                serde_json::from_str(&s)
                    .with_context(|| format!("failed to deserialize state {key}"))
            })
            .transpose()
    }
}

impl RegistryStore for Database {
    fn load_registry_snapshot(&self) -> Result<Option<RegistrySnapshot>> {
        self.load_state(REGISTRY_KEY)
    }

    fn save_registry_snapshot(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        self.save_state(REGISTRY_KEY, snapshot)
    }

    fn load_slots(&self) -> Result<Option<Vec<SavedSlot>>> {
        self.load_state(SLOTS_KEY)
    }

    fn save_slots(&self, slots: &[SavedSlot]) -> Result<()> {
        self.save_state(SLOTS_KEY, slots)
    }

    fn load_feed_cache(&self) -> Result<Option<FeedCache>> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT fetched_at, records FROM feed_cache WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query feed cache")?;

        let Some((fetched_at, records)) = row else {
            return Ok(None);
        };
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .context("failed to parse feed cache timestamp")?
            .with_timezone(&Utc);
        let records: Vec<BulkRecord> =
            serde_json::from_str(&records).context("failed to deserialize feed cache")?;
        Ok(Some(FeedCache {
            fetched_at,
            records,
        }))
    }

    fn save_feed_cache(&self, cache: &FeedCache) -> Result<()> {
        let records =
            serde_json::to_string(&cache.records).context("failed to serialize feed cache")?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO feed_cache (id, fetched_at, records) VALUES (1, ?1, ?2)",
                params![cache.fetched_at.to_rfc3339(), records],
            )
            .context("failed to save feed cache")?;
        Ok(())
    }

    fn clear_feed_cache(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM feed_cache", [])
            .context("failed to clear feed cache")?;
        Ok(())
    }
}
