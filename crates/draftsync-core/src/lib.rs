// Library root: the draft synchronization engine, its platform adapters, and
// the persistence/config plumbing the app crate wires together.

pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod protocol;
pub mod refresh;
pub mod sources;
pub mod supervisor;

pub use error::{Result, SyncError};
