//! Transaction-aware session provider.
//!
//! Session-consuming code stays transaction-agnostic: it asks a provider
//! for a session and closes it when done. Behind this provider, "get a
//! session" returns the transaction's bound session whenever the scope has
//! a transaction in progress - wrapped so that closing it is a local no-op
//! - and an independent session otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::session::{IsolationLevel, Session, SessionError, SessionProvider, SessionResult};
use crate::transaction::context::SessionScope;
use crate::transaction::status::TransactionStatus;

/// A non-closable view over a transaction's bound session.
///
/// `close` only marks the view closed; the real session stays open and
/// owned by the transaction. Every other operation forwards to the real
/// session until the view is closed, after which it fails with a
/// "session is closed" error. `is_closed` reflects the view's own flag,
/// not the underlying session's.
#[derive(Debug)]
pub struct BoundSession<S> {
    session: Arc<S>,
    closed: AtomicBool,
}

impl<S: Session> BoundSession<S> {
    pub(crate) fn new(session: Arc<S>) -> Self {
        Self {
            session,
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}

impl<S: Session> Session for BoundSession<S> {
    fn auto_commit(&self) -> SessionResult<bool> {
        self.check_open()?;
        self.session.auto_commit()
    }

    fn set_auto_commit(&self, auto_commit: bool) -> SessionResult<()> {
        self.check_open()?;
        self.session.set_auto_commit(auto_commit)
    }

    fn isolation(&self) -> SessionResult<IsolationLevel> {
        self.check_open()?;
        self.session.isolation()
    }

    fn set_isolation(&self, isolation: IsolationLevel) -> SessionResult<()> {
        self.check_open()?;
        self.session.set_isolation(isolation)
    }

    fn is_read_only(&self) -> SessionResult<bool> {
        self.check_open()?;
        self.session.is_read_only()
    }

    fn set_read_only(&self, read_only: bool) -> SessionResult<()> {
        self.check_open()?;
        self.session.set_read_only(read_only)
    }

    fn commit(&self) -> SessionResult<()> {
        self.check_open()?;
        self.session.commit()
    }

    fn rollback(&self) -> SessionResult<()> {
        self.check_open()?;
        self.session.rollback()
    }

    fn close(&self) -> SessionResult<()> {
        // never closes the real session
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> SessionResult<bool> {
        Ok(self.closed.load(Ordering::Relaxed))
    }

    fn is_valid(&self) -> SessionResult<bool> {
        self.check_open()?;
        self.session.is_valid()
    }
}

/// A session handed out by [`TransactionalSessionProvider`]: either an
/// independent session or a view of the transaction's bound one.
#[derive(Debug)]
pub enum TransactionalSession<S> {
    /// An independent session; closing it really closes it.
    Independent(S),
    /// A view of the scope's transaction-bound session.
    Bound(BoundSession<S>),
}

impl<S> TransactionalSession<S> {
    /// Whether this session is a view of a transaction-bound session.
    pub fn is_bound(&self) -> bool {
        matches!(self, TransactionalSession::Bound(_))
    }
}

impl<S: Session> Session for TransactionalSession<S> {
    fn auto_commit(&self) -> SessionResult<bool> {
        match self {
            TransactionalSession::Independent(s) => s.auto_commit(),
            TransactionalSession::Bound(s) => s.auto_commit(),
        }
    }

    fn set_auto_commit(&self, auto_commit: bool) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.set_auto_commit(auto_commit),
            TransactionalSession::Bound(s) => s.set_auto_commit(auto_commit),
        }
    }

    fn isolation(&self) -> SessionResult<IsolationLevel> {
        match self {
            TransactionalSession::Independent(s) => s.isolation(),
            TransactionalSession::Bound(s) => s.isolation(),
        }
    }

    fn set_isolation(&self, isolation: IsolationLevel) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.set_isolation(isolation),
            TransactionalSession::Bound(s) => s.set_isolation(isolation),
        }
    }

    fn is_read_only(&self) -> SessionResult<bool> {
        match self {
            TransactionalSession::Independent(s) => s.is_read_only(),
            TransactionalSession::Bound(s) => s.is_read_only(),
        }
    }

    fn set_read_only(&self, read_only: bool) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.set_read_only(read_only),
            TransactionalSession::Bound(s) => s.set_read_only(read_only),
        }
    }

    fn commit(&self) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.commit(),
            TransactionalSession::Bound(s) => s.commit(),
        }
    }

    fn rollback(&self) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.rollback(),
            TransactionalSession::Bound(s) => s.rollback(),
        }
    }

    fn close(&self) -> SessionResult<()> {
        match self {
            TransactionalSession::Independent(s) => s.close(),
            TransactionalSession::Bound(s) => s.close(),
        }
    }

    fn is_closed(&self) -> SessionResult<bool> {
        match self {
            TransactionalSession::Independent(s) => s.is_closed(),
            TransactionalSession::Bound(s) => s.is_closed(),
        }
    }

    fn is_valid(&self) -> SessionResult<bool> {
        match self {
            TransactionalSession::Independent(s) => s.is_valid(),
            TransactionalSession::Bound(s) => s.is_valid(),
        }
    }
}

/// A provider facade that hands out the scope's transaction-bound session
/// while a transaction is in progress, and delegates to the underlying
/// provider otherwise.
pub struct TransactionalSessionProvider<P: SessionProvider> {
    provider: Arc<P>,
    scope: SessionScope<P::Session>,
}

impl<P: SessionProvider> TransactionalSessionProvider<P> {
    /// Create a facade over the given provider, observing the given scope.
    ///
    /// Pass a clone of the scope the transaction manager is driven with;
    /// clones alias the same scope state.
    pub fn new(provider: Arc<P>, scope: SessionScope<P::Session>) -> Self {
        Self { provider, scope }
    }
}

impl<P: SessionProvider> SessionProvider for TransactionalSessionProvider<P> {
    type Session = TransactionalSession<P::Session>;

    fn session(&self) -> SessionResult<Self::Session> {
        if self.scope.status() != TransactionStatus::NoTransaction {
            let Some(session) = self.scope.bound_session() else {
                return Err(SessionError::database(
                    "transaction is active but no session is bound",
                ));
            };
            Ok(TransactionalSession::Bound(BoundSession::new(session)))
        } else {
            Ok(TransactionalSession::Independent(self.provider.session()?))
        }
    }
}

impl<P: SessionProvider> std::fmt::Debug for TransactionalSessionProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalSessionProvider")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySession, MemorySessionProvider};
    use crate::transaction::config::TransactionConfig;
    use crate::transaction::context::Scope;
    use crate::transaction::manager::TransactionManager;
    use crate::transaction::resource::SessionResource;

    fn setup() -> (
        TransactionManager<SessionResource<MemorySessionProvider>>,
        Arc<MemorySessionProvider>,
        SessionScope<MemorySession>,
        TransactionalSessionProvider<MemorySessionProvider>,
    ) {
        let provider = Arc::new(MemorySessionProvider::new());
        let manager = TransactionManager::new(SessionResource::new(Arc::clone(&provider)));
        let scope: SessionScope<MemorySession> = Scope::new();
        let tx_provider = TransactionalSessionProvider::new(Arc::clone(&provider), scope.clone());
        (manager, provider, scope, tx_provider)
    }

    #[test]
    fn test_independent_session_outside_transaction() {
        let (_, provider, _, tx_provider) = setup();

        let session = tx_provider.session().unwrap();
        assert!(!session.is_bound());

        // closing really closes the session
        session.close().unwrap();
        assert!(provider.last_session().unwrap().is_closed().unwrap());
    }

    #[test]
    fn test_bound_session_inside_transaction() {
        let (manager, provider, scope, tx_provider) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        let session = tx_provider.session().unwrap();
        assert!(session.is_bound());

        // work on the view reaches the transaction's session
        session.commit().unwrap();
        assert_eq!(provider.last_session().unwrap().commit_calls(), 1);

        manager.rollback(&scope).unwrap();
    }

    #[test]
    fn test_closing_view_never_closes_real_session() {
        let (manager, provider, scope, tx_provider) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        let real = provider.last_session().unwrap();

        let view = tx_provider.session().unwrap();
        view.close().unwrap();

        assert!(view.is_closed().unwrap());
        assert!(!real.is_closed().unwrap());
        assert_eq!(real.close_calls(), 0);

        // the transaction can still complete against the open session
        manager.commit(&scope).unwrap();
        assert_eq!(real.commit_calls(), 1);
    }

    #[test]
    fn test_closed_view_rejects_operations() {
        let (manager, _, scope, tx_provider) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        let view = tx_provider.session().unwrap();
        view.close().unwrap();

        assert_eq!(view.auto_commit(), Err(SessionError::Closed));
        assert_eq!(view.commit(), Err(SessionError::Closed));
        assert_eq!(view.rollback(), Err(SessionError::Closed));
        assert_eq!(view.is_valid(), Err(SessionError::Closed));

        manager.rollback(&scope).unwrap();
    }

    #[test]
    fn test_view_is_closed_is_local() {
        let (manager, provider, scope, tx_provider) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        let first = tx_provider.session().unwrap();
        let second = tx_provider.session().unwrap();
        first.close().unwrap();

        // each view has its own closed flag over the same session
        assert!(first.is_closed().unwrap());
        assert!(!second.is_closed().unwrap());
        assert!(!provider.last_session().unwrap().is_closed().unwrap());

        manager.rollback(&scope).unwrap();
    }

    #[test]
    fn test_provider_returns_independent_sessions_again_after_end() {
        let (manager, provider, scope, tx_provider) = setup();

        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        assert!(tx_provider.session().unwrap().is_bound());
        manager.commit(&scope).unwrap();

        let session = tx_provider.session().unwrap();
        assert!(!session.is_bound());
        assert_eq!(provider.opened_count(), 2);
    }
}
