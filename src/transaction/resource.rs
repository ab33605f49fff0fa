//! Session-backed transaction resource.
//!
//! Binds the lifecycle state machine to the session layer: acquires a
//! session from a provider, applies the requested attributes with
//! save/restore semantics, and issues commit/rollback on the bound session.

use std::sync::Arc;

use crate::session::{IsolationLevel, Session, SessionProvider};
use crate::transaction::config::TransactionConfig;
use crate::transaction::context::SessionContext;
use crate::transaction::error::SystemError;
use crate::transaction::manager::TransactionResource;

/// [`TransactionResource`] implementation over a [`SessionProvider`].
///
/// On begin it acquires a session and configures it for the transaction:
/// read-only and isolation are applied only when they differ from the
/// session's current values, and only while the session is in auto-commit
/// mode - changing either inside a transaction another layer already
/// started is rejected. Whatever was changed is recorded in the context and
/// restored on release, so the session returns to its pool unconfigured.
pub struct SessionResource<P: SessionProvider> {
    provider: Arc<P>,
}

impl<P: SessionProvider> SessionResource<P> {
    /// Create a resource over the given session provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// The provider sessions are acquired from.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn apply_read_only(
        &self,
        context: &mut SessionContext<P::Session>,
        session: &P::Session,
        auto_commit: bool,
        read_only: bool,
    ) -> Result<(), SystemError> {
        let current = session.is_read_only()?;
        if read_only != current {
            if !auto_commit {
                return Err(SystemError::new(
                    "cannot change read-only mode inside an active transaction",
                ));
            }
            context.previous_read_only = Some(current);
            session.set_read_only(read_only)?;
        }
        Ok(())
    }

    fn apply_isolation(
        &self,
        context: &mut SessionContext<P::Session>,
        session: &P::Session,
        auto_commit: bool,
        isolation: IsolationLevel,
    ) -> Result<(), SystemError> {
        if isolation.is_unspecified() {
            return Ok(());
        }
        let current = session.isolation()?;
        if isolation != current {
            if !auto_commit {
                return Err(SystemError::new(
                    "cannot change isolation level inside an active transaction",
                ));
            }
            context.previous_isolation = Some(current);
            session.set_isolation(isolation)?;
        }
        Ok(())
    }
}

impl<P: SessionProvider> TransactionResource for SessionResource<P> {
    type Context = SessionContext<P::Session>;

    fn new_context(&self) -> Self::Context {
        SessionContext::new()
    }

    fn begin(
        &self,
        context: &mut Self::Context,
        config: &TransactionConfig,
    ) -> Result<(), SystemError> {
        let session = self
            .provider
            .session()
            .map_err(|err| SystemError::with_source("could not acquire session", err))?;
        let session = Arc::new(session);
        context.session = Some(Arc::clone(&session));

        let auto_commit = session.auto_commit()?;

        self.apply_read_only(context, &session, auto_commit, config.read_only)?;
        self.apply_isolation(context, &session, auto_commit, config.isolation)?;

        if auto_commit {
            context.previous_auto_commit = Some(auto_commit);
            // the actual transaction-start signal to the resource
            session.set_auto_commit(false)?;
        }

        Ok(())
    }

    fn commit(&self, context: &mut Self::Context) -> Result<(), SystemError> {
        let Some(session) = context.session.as_ref() else {
            return Err(SystemError::new("no session bound to transaction"));
        };
        session.commit()?;
        Ok(())
    }

    fn rollback(&self, context: &mut Self::Context) -> Result<(), SystemError> {
        let Some(session) = context.session.as_ref() else {
            return Err(SystemError::new("no session bound to transaction"));
        };
        session.rollback()?;
        Ok(())
    }

    fn release(&self, context: &mut Self::Context) {
        let Some(session) = context.session.take() else {
            return;
        };

        // each restoration step is best-effort and independent of the others
        if let Some(previous) = context.previous_auto_commit.take() {
            if let Err(err) = session.set_auto_commit(previous) {
                tracing::debug!(error = %err, "could not restore session auto-commit mode");
            }
        }
        if let Some(previous) = context.previous_isolation.take() {
            if let Err(err) = session.set_isolation(previous) {
                tracing::debug!(error = %err, "could not restore session isolation level");
            }
        }
        if let Some(previous) = context.previous_read_only.take() {
            if let Err(err) = session.set_read_only(previous) {
                tracing::debug!(error = %err, "could not restore session read-only flag");
            }
        }
        if let Err(err) = session.close() {
            tracing::debug!(error = %err, "could not close session");
        }
    }
}

impl<P: SessionProvider> std::fmt::Debug for SessionResource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResource").finish_non_exhaustive()
    }
}
