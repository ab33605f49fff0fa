//! Transaction error types.

use thiserror::Error;

use crate::session::SessionError;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// The transaction manager hit an unexpected resource failure.
///
/// Raised by resource hooks when session acquisition, attribute
/// configuration, commit or rollback fails, or when a requested attribute
/// change is not allowed in the session's current state. Carries the
/// originating session failure when there is one.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SystemError {
    message: String,
    #[source]
    source: Option<SessionError>,
}

impl SystemError {
    /// A system error with a message and no underlying session failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A system error wrapping the session failure that caused it.
    pub fn with_source(message: impl Into<String>, source: SessionError) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }

    /// The session failure behind this error, if any.
    pub fn session_error(&self) -> Option<&SessionError> {
        self.source.as_ref()
    }
}

impl From<SessionError> for SystemError {
    fn from(source: SessionError) -> Self {
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The operation does not make sense for the scope's current status,
    /// e.g. commit with no active transaction. Always a programming error,
    /// never worth retrying.
    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    /// A transactional operation failed against the underlying resource.
    /// The transaction's outcome may be indeterminate.
    #[error("transaction system error: {0}")]
    System(#[from] SystemError),

    /// The transaction's outcome is a rollback: it was either marked
    /// rollback-only, or a failed commit was compensated by a successful
    /// rollback. The resource is in a known, clean state.
    #[error("transaction rolled back: {message}")]
    Rollback {
        message: String,
        /// The commit failure that forced the rollback, if any.
        #[source]
        source: Option<SystemError>,
    },
}

impl From<SessionError> for TransactionError {
    fn from(source: SessionError) -> Self {
        TransactionError::System(SystemError::from(source))
    }
}

impl TransactionError {
    /// An illegal-state error with the given message.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        TransactionError::IllegalState(message.into())
    }

    /// A rollback outcome with no underlying failure (marked rollback-only).
    pub fn rollback(message: impl Into<String>) -> Self {
        TransactionError::Rollback {
            message: message.into(),
            source: None,
        }
    }

    /// A rollback outcome compensating the given commit failure.
    pub fn rollback_after(message: impl Into<String>, cause: SystemError) -> Self {
        TransactionError::Rollback {
            message: message.into(),
            source: Some(cause),
        }
    }

    /// Whether this error reports a clean rolled-back outcome.
    pub fn is_rollback(&self) -> bool {
        matches!(self, TransactionError::Rollback { .. })
    }

    /// Whether this error reports a contract violation by the caller.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, TransactionError::IllegalState(_))
    }
}
