//! Transaction configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::IsolationLevel;

/// Declared intent for how a unit of work's transaction requirement relates
/// to an already-active transaction in the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Always start a new transaction. Starting one while another is active
    /// in the scope is an error, since single-resource scopes cannot
    /// suspend a transaction.
    #[default]
    RequiresNew,

    /// Require an active transaction and join it; error if there is none.
    Mandatory,

    /// Join the active transaction, or start a new one if there is none.
    Required,

    /// Join the active transaction, or run non-transactionally if there is
    /// none.
    Supports,

    /// Require that no transaction is active; error if one is.
    Never,

    /// Run non-transactionally; an active transaction is an error, since it
    /// cannot be suspended.
    NotSupported,
}

/// Immutable configuration for one transaction attempt.
///
/// A fresh `TransactionConfig::default()` starts a new read-write
/// transaction without touching the session's isolation level and without a
/// timeout. Overrides chain builder-style:
///
/// ```
/// use txscope::session::IsolationLevel;
/// use txscope::transaction::{Propagation, TransactionConfig};
///
/// let config = TransactionConfig::new()
///     .propagation(Propagation::Required)
///     .isolation(IsolationLevel::Serializable)
///     .read_only(true);
/// assert!(config.read_only);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// How to relate to an already-active transaction in the scope.
    pub propagation: Propagation,
    /// Isolation level to apply to the session; `Unspecified` leaves the
    /// session's current level alone.
    pub isolation: IsolationLevel,
    /// Requested transaction timeout. Recorded but not enforced.
    pub timeout: Option<Duration>,
    /// Whether the session should be switched to read-only mode.
    pub read_only: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            propagation: Propagation::default(),
            isolation: IsolationLevel::Unspecified,
            timeout: None,
            read_only: false,
        }
    }
}

impl TransactionConfig {
    /// Create a configuration with the default attribute values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the propagation policy.
    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Set the isolation level.
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the transaction timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the read-only flag.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
