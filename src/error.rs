//! Domain errors shared by the ledger, catalog, and workflow.

use thiserror::Error;

/// Errors surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An id referenced a user, task, or submission that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed multi-field admin input; nothing was stored.
    #[error("format error: {0}")]
    FormatError(String),

    /// An admin-only operation was invoked by a non-admin identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    /// Short chat-facing text for a failed operation, or `None` when the
    /// actor should not hear about it at all.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => Some("❌ Error: not found".to_string()),
            Self::FormatError(_) => Some("❌ Format error".to_string()),
            // Admin-only commands from non-admins are dropped silently.
            Self::Unauthorized => None,
            Self::Storage(_) => Some("❌ Something went wrong, try again later".to_string()),
        }
    }
}
