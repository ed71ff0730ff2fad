use thiserror::Error;

/// Failure taxonomy for competitive-play operations.
///
/// Everything except `Internal` is rejected before any mutation; state
/// conflicts leave the record exactly as it was.
#[derive(Debug, Error)]
pub enum CompetitionError {
    /// Missing or malformed input (e.g. a declared winner who is not a participant).
    #[error("{0}")]
    Validation(String),

    /// No usable bearer token, or the identity service rejected it.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform this operation.
    #[error("{0}")]
    Forbidden(String),

    /// Unknown tournament, ladder or match id.
    #[error("{0}")]
    NotFound(String),

    /// The record is not in a state that permits the attempted transition.
    #[error("{0}")]
    Conflict(String),

    /// Storage or collaborator failure; surfaced as a generic error upstream.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CompetitionResult<T> = Result<T, CompetitionError>;

impl CompetitionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CompetitionError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        CompetitionError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CompetitionError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CompetitionError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CompetitionError::Conflict(msg.into())
    }
}
