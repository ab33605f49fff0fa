//! Session error types.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by a database session or a session provider.
///
/// The session boundary is intentionally coarse: drivers differ wildly in
/// what they report, so everything that is not a closed-handle check is a
/// generic database error with a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session (or a view over it) has been closed.
    #[error("session is closed")]
    Closed,

    /// The underlying driver or database reported a failure.
    #[error("database error: {0}")]
    Database(String),
}

impl SessionError {
    /// Create a database error from any displayable cause.
    pub fn database(cause: impl std::fmt::Display) -> Self {
        SessionError::Database(cause.to_string())
    }
}
