//! Error taxonomy shared by the engine, the session and the adapters.

use thiserror::Error;

use crate::models::BoardId;

/// Common result type for client operations
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure or a request rejected by the server
    #[error("remote call failed: {0}")]
    Remote(String),

    /// 401-class response; the stored credential is no longer valid
    #[error("session expired")]
    AuthExpired,

    #[error("board {0} not found")]
    BoardNotFound(BoardId),

    #[error("invalid board ordering: {0}")]
    InvalidOrdering(String),

    /// Loaded data violates the tree's back-reference invariants
    #[error("malformed board tree: {0}")]
    MalformedTree(String),

    /// Some per-board status writes of a bulk toggle failed
    #[error("status update failed for {} board(s)", failed.len())]
    StatusFanOut { failed: Vec<(BoardId, String)> },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, SyncError::AuthExpired)
    }
}
