//! Declarative transaction demarcation.
//!
//! [`TransactionTemplate`] applies a [`TransactionConfig`] around a unit of
//! work: dispatch on the propagation policy, begin if one is called for,
//! run the work, then commit or roll back based on the outcome and the
//! marked-rollback status.

use crate::transaction::config::{Propagation, TransactionConfig};
use crate::transaction::context::Scope;
use crate::transaction::error::TransactionError;
use crate::transaction::manager::{TransactionManager, TransactionResource};
use crate::transaction::status::TransactionStatus;

/// Runs units of work transactionally against a manager.
///
/// The work's error type only needs a `From<TransactionError>` conversion
/// so that demarcation failures (begin, commit, propagation violations)
/// surface through the same channel as the work's own errors.
///
/// ```
/// use std::sync::Arc;
/// use txscope::session::{MemorySessionProvider, Session, SessionProvider};
/// use txscope::transaction::{
///     Scope, SessionResource, TransactionError, TransactionManager, TransactionTemplate,
///     TransactionalSessionProvider,
/// };
///
/// let provider = Arc::new(MemorySessionProvider::new());
/// let manager = TransactionManager::new(SessionResource::new(Arc::clone(&provider)));
/// let scope = Scope::new();
/// let sessions = TransactionalSessionProvider::new(Arc::clone(&provider), scope.clone());
///
/// let template = TransactionTemplate::new(&manager);
/// let result: Result<(), TransactionError> = template.execute(&scope, || {
///     let session = sessions.session()?;
///     // ... perform database work on the bound session ...
///     session.close()?; // no-op on the shared session
///     Ok(())
/// });
/// assert!(result.is_ok());
/// ```
pub struct TransactionTemplate<'a, R: TransactionResource> {
    manager: &'a TransactionManager<R>,
    config: TransactionConfig,
}

impl<'a, R: TransactionResource> TransactionTemplate<'a, R> {
    /// Create a template with the default configuration.
    pub fn new(manager: &'a TransactionManager<R>) -> Self {
        Self {
            manager,
            config: TransactionConfig::default(),
        }
    }

    /// Replace the template's configuration.
    pub fn with_config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration applied to each execution.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Run the unit of work under the template's configuration.
    ///
    /// When a new transaction is begun for the work: a normal return
    /// commits (which rolls back instead if the transaction was marked
    /// rollback-only), an error return rolls back - swallowing any
    /// secondary rollback failure - and re-raises the work's error
    /// unchanged. When the work joins an existing transaction, its outcome
    /// stays with the outer demarcation; a failed work marks the
    /// transaction rollback-only so the outer commit cannot succeed by
    /// accident.
    pub fn execute<T, E, F>(&self, scope: &Scope<R::Context>, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TransactionError>,
    {
        let active = self.manager.status(scope) != TransactionStatus::NoTransaction;

        match self.config.propagation {
            Propagation::RequiresNew => self.execute_new(scope, work),
            Propagation::Mandatory => {
                if active {
                    self.execute_joined(scope, work)
                } else {
                    Err(E::from(TransactionError::illegal_state(
                        "mandatory propagation requires an active transaction",
                    )))
                }
            }
            Propagation::Required => {
                if active {
                    self.execute_joined(scope, work)
                } else {
                    self.execute_new(scope, work)
                }
            }
            Propagation::Supports => {
                if active {
                    self.execute_joined(scope, work)
                } else {
                    work()
                }
            }
            Propagation::Never => {
                if active {
                    Err(E::from(TransactionError::illegal_state(
                        "never propagation forbids an active transaction",
                    )))
                } else {
                    work()
                }
            }
            Propagation::NotSupported => {
                if active {
                    Err(E::from(TransactionError::illegal_state(
                        "cannot suspend the active transaction",
                    )))
                } else {
                    work()
                }
            }
        }
    }

    /// Begin a new transaction around the work.
    fn execute_new<T, E, F>(&self, scope: &Scope<R::Context>, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TransactionError>,
    {
        self.manager.begin(scope, &self.config).map_err(E::from)?;

        match work() {
            Ok(result) => {
                if self.manager.status(scope) == TransactionStatus::NoTransaction {
                    // the work ended the transaction through the manager itself
                    return Ok(result);
                }
                // a marked-rollback transaction is rolled back here and
                // surfaces as a rollback error
                self.manager.commit(scope).map_err(E::from)?;
                Ok(result)
            }
            Err(err) => {
                if self.manager.status(scope) != TransactionStatus::NoTransaction {
                    if let Err(rollback_err) = self.manager.rollback(scope) {
                        tracing::debug!(
                            error = %rollback_err,
                            "could not roll back transaction after failed work",
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Run the work inside the scope's existing transaction.
    fn execute_joined<T, E, F>(&self, scope: &Scope<R::Context>, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TransactionError>,
    {
        match work() {
            Ok(result) => Ok(result),
            Err(err) => {
                if self.manager.status(scope).is_in_progress() {
                    if let Err(mark_err) = self.manager.set_rollback_only(scope) {
                        tracing::debug!(
                            error = %mark_err,
                            "could not mark joined transaction rollback-only",
                        );
                    }
                }
                Err(err)
            }
        }
    }
}
