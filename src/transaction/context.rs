//! Scope-bound transaction state.
//!
//! A [`Scope`] represents one unit of execution (conventionally one thread)
//! to which at most one transaction is bound at a time. It is an explicit
//! value passed to every manager operation, not ambient thread-local
//! storage, so scope boundaries are visible in signatures and testable
//! without real concurrency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::session::IsolationLevel;
use crate::transaction::status::TransactionStatus;

/// Metadata about the transaction currently bound to a scope.
#[derive(Debug, Clone)]
pub struct TransactionMetadata {
    /// Unique transaction ID, used in log events.
    pub tx_id: String,
    /// Isolation level the transaction was configured with.
    pub isolation: IsolationLevel,
    /// Whether the transaction was configured read-only.
    pub read_only: bool,
    /// When the transaction began.
    pub started_at: DateTime<Utc>,
}

/// Per-transaction session state: the bound session plus the saved values
/// of the attributes that were changed when the transaction began.
///
/// A `None` saved value means "no change was made, nothing to restore."
#[derive(Debug)]
pub struct SessionContext<S> {
    pub(crate) session: Option<Arc<S>>,
    pub(crate) previous_auto_commit: Option<bool>,
    pub(crate) previous_isolation: Option<IsolationLevel>,
    pub(crate) previous_read_only: Option<bool>,
}

impl<S> SessionContext<S> {
    /// An empty context with no session bound.
    pub fn new() -> Self {
        Self {
            session: None,
            previous_auto_commit: None,
            previous_isolation: None,
            previous_read_only: None,
        }
    }

    /// The session bound to this context, if one has been acquired.
    pub fn session(&self) -> Option<Arc<S>> {
        self.session.clone()
    }
}

impl<S> Default for SessionContext<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ScopeInner<C> {
    pub(crate) status: TransactionStatus,
    pub(crate) context: Option<C>,
    pub(crate) metadata: Option<TransactionMetadata>,
}

/// Handle to one execution scope's transaction state.
///
/// Cloning does not create a new scope: all clones alias the same state, so
/// a [`TransactionalSessionProvider`](crate::transaction::TransactionalSessionProvider)
/// can observe the scope it shares with the manager. Create a fresh `Scope`
/// per unit of execution instead of sharing one across threads.
pub struct Scope<C> {
    inner: Arc<Mutex<ScopeInner<C>>>,
}

impl<C> Scope<C> {
    /// Create a scope with no transaction bound.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScopeInner {
                status: TransactionStatus::NoTransaction,
                context: None,
                metadata: None,
            })),
        }
    }

    /// Current status of the scope's transaction. Never fails; a scope that
    /// never began a transaction reports `NoTransaction`.
    pub fn status(&self) -> TransactionStatus {
        self.inner.lock().status
    }

    /// Metadata of the transaction currently bound to the scope, if any.
    pub fn metadata(&self) -> Option<TransactionMetadata> {
        self.inner.lock().metadata.clone()
    }

    pub(crate) fn with_inner<T>(&self, f: impl FnOnce(&mut ScopeInner<C>) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

impl<C> Clone for Scope<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> Default for Scope<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Scope<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Scope alias for session-backed transactions over session type `S`.
pub type SessionScope<S> = Scope<SessionContext<S>>;

impl<S> Scope<SessionContext<S>> {
    /// The session bound to the scope's active transaction, if a
    /// transaction is in progress and a session has been acquired.
    pub fn bound_session(&self) -> Option<Arc<S>> {
        self.with_inner(|inner| {
            if inner.status == TransactionStatus::NoTransaction {
                return None;
            }
            inner.context.as_ref().and_then(|context| context.session())
        })
    }
}
