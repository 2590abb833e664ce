// Error taxonomy shared by the sync engine and its source adapters.

use thiserror::Error;

/// Errors surfaced by connection, ingestion, and ranking operations.
///
/// `Validation` and `NotFound` are user-facing and never change state.
/// `Network` only moves the connection into its error state when raised by
/// the initial verify call; later poll failures are logged and dropped.
/// `Parse` is scoped to a single pick and never aborts a whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed payload: {0}")]
    Parse(String),
}

impl SyncError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error should be shown to the user rather than only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, SyncError::Validation { .. } | SyncError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
