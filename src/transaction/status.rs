//! Transaction status values.

use std::fmt;

/// Status of the transaction associated with a scope.
///
/// Exactly one status exists per scope at any time. `Active` and
/// `MarkedRollback` are the in-progress states; the remaining values are
/// initial or terminal. A scope always returns to `NoTransaction` once a
/// transaction ends, whatever the outcome was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    /// No transaction is associated with the scope.
    #[default]
    NoTransaction,

    /// A transaction has begun and can still commit.
    Active,

    /// A transaction has begun but its only possible outcome is rollback.
    MarkedRollback,

    /// The transaction committed.
    Committed,

    /// The transaction rolled back.
    RolledBack,

    /// A failure left the transaction's outcome indeterminate.
    Unknown,
}

impl TransactionStatus {
    /// Whether a transaction is in progress and can still be completed.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Active | TransactionStatus::MarkedRollback
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::NoTransaction => write!(f, "no transaction"),
            TransactionStatus::Active => write!(f, "active"),
            TransactionStatus::MarkedRollback => write!(f, "marked rollback"),
            TransactionStatus::Committed => write!(f, "committed"),
            TransactionStatus::RolledBack => write!(f, "rolled back"),
            TransactionStatus::Unknown => write!(f, "unknown"),
        }
    }
}
