//! Transaction manager - the lifecycle state machine.
//!
//! The manager owns the per-scope status transitions and delegates every
//! resource-specific action (acquire, commit, rollback, release) to a
//! [`TransactionResource`] implementation. The hard part is the failure
//! orderings: begin failure, commit failure followed by a compensating
//! rollback that itself may fail, and rollback failure. Whatever branch
//! executes, the resource is released and the scope is cleared exactly
//! once, so the scope is always back in `NoTransaction` with no bound
//! session after `begin`/`commit`/`rollback` return - except when `begin`
//! rejects the call outright, which leaves prior state untouched.

use chrono::Utc;
use ulid::Ulid;

use crate::transaction::config::TransactionConfig;
use crate::transaction::context::{Scope, ScopeInner, TransactionMetadata};
use crate::transaction::error::{SystemError, TransactionError, TransactionResult};
use crate::transaction::status::TransactionStatus;

/// Resource-specific actions a transaction needs.
///
/// The manager drives the lifecycle; implementations of this trait bind it
/// to an actual resource. All methods receive the per-scope context the
/// manager created with [`new_context`](TransactionResource::new_context).
pub trait TransactionResource {
    /// Per-scope state the resource needs across a transaction's lifetime.
    type Context;

    /// Create the context for a transaction that is about to begin.
    fn new_context(&self) -> Self::Context;

    /// Acquire the underlying resource and configure it for the given
    /// transaction attributes.
    fn begin(
        &self,
        context: &mut Self::Context,
        config: &TransactionConfig,
    ) -> Result<(), SystemError>;

    /// Commit the work bound to the context.
    fn commit(&self, context: &mut Self::Context) -> Result<(), SystemError>;

    /// Roll back the work bound to the context.
    fn rollback(&self, context: &mut Self::Context) -> Result<(), SystemError>;

    /// Undo configuration and return the resource.
    ///
    /// Must not fail: the transaction's outcome has already been determined
    /// when this runs, so internal failures are logged and swallowed.
    fn release(&self, context: &mut Self::Context);
}

/// Drives the transaction lifecycle for one resource type.
///
/// All operations are scoped to the [`Scope`] value passed in; the manager
/// itself holds no mutable state and can be shared freely.
pub struct TransactionManager<R: TransactionResource> {
    resource: R,
}

impl<R: TransactionResource> TransactionManager<R> {
    /// Create a manager over the given resource.
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    /// The resource this manager drives.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Current status of the scope's transaction.
    pub fn status(&self, scope: &Scope<R::Context>) -> TransactionStatus {
        scope.status()
    }

    /// Begin a new transaction in the scope.
    ///
    /// Fails with [`TransactionError::IllegalState`] if a transaction is
    /// already associated with the scope; that case leaves the scope
    /// untouched. A resource acquisition failure releases whatever was
    /// acquired, clears the scope and surfaces as
    /// [`TransactionError::System`].
    pub fn begin(
        &self,
        scope: &Scope<R::Context>,
        config: &TransactionConfig,
    ) -> TransactionResult<()> {
        scope.with_inner(|inner| {
            if inner.status != TransactionStatus::NoTransaction {
                return Err(TransactionError::illegal_state(
                    "transaction is already active",
                ));
            }

            let tx_id = Ulid::new().to_string().to_lowercase();
            tracing::debug!(tx_id = %tx_id, "beginning transaction");

            let mut context = self.resource.new_context();
            match self.resource.begin(&mut context, config) {
                Ok(()) => {
                    inner.status = TransactionStatus::Active;
                    inner.context = Some(context);
                    inner.metadata = Some(TransactionMetadata {
                        tx_id,
                        isolation: config.isolation,
                        read_only: config.read_only,
                        started_at: Utc::now(),
                    });
                    Ok(())
                }
                Err(err) => {
                    tracing::debug!(tx_id = %tx_id, error = %err, "could not begin transaction");
                    self.resource.release(&mut context);
                    inner.metadata = None;
                    inner.status = TransactionStatus::NoTransaction;
                    Err(TransactionError::System(err))
                }
            }
        })
    }

    /// Commit the transaction associated with the scope.
    ///
    /// When this returns - normally or with an error - the scope is no
    /// longer associated with a transaction. A transaction marked
    /// rollback-only is rolled back instead and reported as
    /// [`TransactionError::Rollback`]. A commit failure triggers a
    /// compensating rollback: if that succeeds the commit failure surfaces
    /// as `Rollback`, if it fails too the rollback failure surfaces as
    /// [`TransactionError::System`].
    pub fn commit(&self, scope: &Scope<R::Context>) -> TransactionResult<()> {
        scope.with_inner(|inner| {
            if !inner.status.is_in_progress() {
                return Err(TransactionError::illegal_state("transaction is not active"));
            }
            let Some(mut context) = inner.context.take() else {
                inner.status = TransactionStatus::NoTransaction;
                inner.metadata = None;
                return Err(TransactionError::illegal_state(
                    "no transaction context bound to scope",
                ));
            };

            if inner.status == TransactionStatus::MarkedRollback {
                return match self.resource.rollback(&mut context) {
                    Ok(()) => {
                        self.finish(inner, &mut context, TransactionStatus::RolledBack);
                        Err(TransactionError::rollback(
                            "transaction was marked rollback-only",
                        ))
                    }
                    Err(err) => {
                        self.finish(inner, &mut context, TransactionStatus::Unknown);
                        Err(TransactionError::System(err))
                    }
                };
            }

            match self.resource.commit(&mut context) {
                Ok(()) => {
                    self.finish(inner, &mut context, TransactionStatus::Committed);
                    Ok(())
                }
                Err(commit_err) => {
                    tracing::debug!(error = %commit_err, "could not commit transaction, rolling back");
                    match self.resource.rollback(&mut context) {
                        Ok(()) => {
                            self.finish(inner, &mut context, TransactionStatus::RolledBack);
                            Err(TransactionError::rollback_after(
                                "transaction failed to commit",
                                commit_err,
                            ))
                        }
                        Err(rollback_err) => {
                            self.finish(inner, &mut context, TransactionStatus::Unknown);
                            Err(TransactionError::System(rollback_err))
                        }
                    }
                }
            }
        })
    }

    /// Roll back the transaction associated with the scope.
    ///
    /// When this returns - normally or with an error - the scope is no
    /// longer associated with a transaction.
    pub fn rollback(&self, scope: &Scope<R::Context>) -> TransactionResult<()> {
        scope.with_inner(|inner| {
            if !inner.status.is_in_progress() {
                return Err(TransactionError::illegal_state("transaction is not active"));
            }
            let Some(mut context) = inner.context.take() else {
                inner.status = TransactionStatus::NoTransaction;
                inner.metadata = None;
                return Err(TransactionError::illegal_state(
                    "no transaction context bound to scope",
                ));
            };

            match self.resource.rollback(&mut context) {
                Ok(()) => {
                    self.finish(inner, &mut context, TransactionStatus::RolledBack);
                    Ok(())
                }
                Err(err) => {
                    self.finish(inner, &mut context, TransactionStatus::Unknown);
                    Err(TransactionError::System(err))
                }
            }
        })
    }

    /// Mark the scope's transaction such that its only possible outcome is
    /// rollback. Idempotent while a transaction is in progress.
    pub fn set_rollback_only(&self, scope: &Scope<R::Context>) -> TransactionResult<()> {
        scope.with_inner(|inner| {
            if !inner.status.is_in_progress() {
                return Err(TransactionError::illegal_state("transaction is not active"));
            }
            if let Some(metadata) = &inner.metadata {
                tracing::debug!(tx_id = %metadata.tx_id, "marking transaction rollback-only");
            }
            inner.status = TransactionStatus::MarkedRollback;
            Ok(())
        })
    }

    /// Release the resource and clear the scope. Runs exactly once on every
    /// exit path that ends a transaction; `outcome` is the terminal status
    /// the transaction reached.
    fn finish(
        &self,
        inner: &mut ScopeInner<R::Context>,
        context: &mut R::Context,
        outcome: TransactionStatus,
    ) {
        self.resource.release(context);
        if let Some(metadata) = inner.metadata.take() {
            let elapsed = Utc::now() - metadata.started_at;
            tracing::debug!(
                tx_id = %metadata.tx_id,
                %outcome,
                elapsed_ms = elapsed.num_milliseconds(),
                "transaction ended",
            );
        }
        inner.status = TransactionStatus::NoTransaction;
    }
}

impl<R: TransactionResource> std::fmt::Debug for TransactionManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// Counts hook invocations and fails on demand; stands in for a real
    /// resource so the state machine is tested in isolation.
    #[derive(Default)]
    struct StubState {
        begins: u32,
        commits: u32,
        rollbacks: u32,
        releases: u32,
        fail_begin: bool,
        fail_commit: bool,
        fail_rollback: bool,
    }

    #[derive(Clone, Default)]
    struct StubResource {
        state: Arc<Mutex<StubState>>,
    }

    impl StubResource {
        fn new() -> Self {
            Self::default()
        }

        fn fail_begin(&self) {
            self.state.lock().fail_begin = true;
        }

        fn fail_commit(&self) {
            self.state.lock().fail_commit = true;
        }

        fn fail_rollback(&self) {
            self.state.lock().fail_rollback = true;
        }

        fn counts(&self) -> (u32, u32, u32, u32) {
            let state = self.state.lock();
            (state.begins, state.commits, state.rollbacks, state.releases)
        }
    }

    impl TransactionResource for StubResource {
        type Context = ();

        fn new_context(&self) -> Self::Context {}

        fn begin(&self, _: &mut (), _: &TransactionConfig) -> Result<(), SystemError> {
            let mut state = self.state.lock();
            state.begins += 1;
            if state.fail_begin {
                return Err(SystemError::new("injected begin failure"));
            }
            Ok(())
        }

        fn commit(&self, _: &mut ()) -> Result<(), SystemError> {
            let mut state = self.state.lock();
            state.commits += 1;
            if state.fail_commit {
                return Err(SystemError::new("injected commit failure"));
            }
            Ok(())
        }

        fn rollback(&self, _: &mut ()) -> Result<(), SystemError> {
            let mut state = self.state.lock();
            state.rollbacks += 1;
            if state.fail_rollback {
                return Err(SystemError::new("injected rollback failure"));
            }
            Ok(())
        }

        fn release(&self, _: &mut ()) {
            self.state.lock().releases += 1;
        }
    }

    fn setup() -> (TransactionManager<StubResource>, StubResource, Scope<()>) {
        let resource = StubResource::new();
        let manager = TransactionManager::new(resource.clone());
        (manager, resource, Scope::new())
    }

    #[test]
    fn test_begin_activates_scope() {
        let (manager, resource, scope) = setup();

        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::Active);
        assert!(scope.metadata().is_some());
        assert_eq!(resource.counts(), (1, 0, 0, 0));
    }

    #[test]
    fn test_begin_twice_is_illegal_and_leaves_state_untouched() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        let err = manager
            .begin(&scope, &TransactionConfig::default())
            .unwrap_err();
        assert!(err.is_illegal_state());
        // first transaction still in place, no release happened
        assert_eq!(manager.status(&scope), TransactionStatus::Active);
        assert_eq!(resource.counts(), (1, 0, 0, 0));
    }

    #[test]
    fn test_begin_failure_releases_and_clears_scope() {
        let (manager, resource, scope) = setup();
        resource.fail_begin();

        let err = manager
            .begin(&scope, &TransactionConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransactionError::System(_)));
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert!(scope.metadata().is_none());
        assert_eq!(resource.counts(), (1, 0, 0, 1));
    }

    #[test]
    fn test_commit_success_clears_scope() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        manager.commit(&scope).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert!(scope.metadata().is_none());
        assert_eq!(resource.counts(), (1, 1, 0, 1));

        // scope is reusable
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::Active);
    }

    #[test]
    fn test_operations_without_transaction_are_illegal() {
        let (manager, resource, scope) = setup();

        assert!(manager.commit(&scope).unwrap_err().is_illegal_state());
        assert!(manager.rollback(&scope).unwrap_err().is_illegal_state());
        assert!(manager
            .set_rollback_only(&scope)
            .unwrap_err()
            .is_illegal_state());
        // no hook ran
        assert_eq!(resource.counts(), (0, 0, 0, 0));
    }

    #[test]
    fn test_marked_rollback_commit_rolls_back() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        manager.set_rollback_only(&scope).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::MarkedRollback);

        let err = manager.commit(&scope).unwrap_err();
        assert!(err.is_rollback());
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        // rollback ran, commit never did
        assert_eq!(resource.counts(), (1, 0, 1, 1));
    }

    #[test]
    fn test_set_rollback_only_is_idempotent() {
        let (manager, _, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        manager.set_rollback_only(&scope).unwrap();
        manager.set_rollback_only(&scope).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::MarkedRollback);
    }

    #[test]
    fn test_marked_rollback_commit_with_rollback_failure() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        manager.set_rollback_only(&scope).unwrap();
        resource.fail_rollback();

        let err = manager.commit(&scope).unwrap_err();
        assert!(matches!(err, TransactionError::System(_)));
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert_eq!(resource.counts(), (1, 0, 1, 1));
    }

    #[test]
    fn test_commit_failure_with_successful_compensation() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        resource.fail_commit();

        let err = manager.commit(&scope).unwrap_err();
        // outcome is a rollback wrapping the commit failure
        match err {
            TransactionError::Rollback { source, .. } => {
                assert!(source.is_some());
            }
            other => panic!("expected rollback error, got {other:?}"),
        }
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        // commit attempted once, compensating rollback ran exactly once
        assert_eq!(resource.counts(), (1, 1, 1, 1));
    }

    #[test]
    fn test_commit_failure_with_failed_compensation() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        resource.fail_commit();
        resource.fail_rollback();

        let err = manager.commit(&scope).unwrap_err();
        // the rollback failure wins, not the commit failure
        match err {
            TransactionError::System(sys) => {
                assert_eq!(sys.to_string(), "injected rollback failure");
            }
            other => panic!("expected system error, got {other:?}"),
        }
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert_eq!(resource.counts(), (1, 1, 1, 1));
    }

    #[test]
    fn test_rollback_success_clears_scope() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();

        manager.rollback(&scope).unwrap();
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert_eq!(resource.counts(), (1, 0, 1, 1));
    }

    #[test]
    fn test_rollback_failure_still_clears_scope() {
        let (manager, resource, scope) = setup();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        resource.fail_rollback();

        let err = manager.rollback(&scope).unwrap_err();
        assert!(matches!(err, TransactionError::System(_)));
        assert_eq!(manager.status(&scope), TransactionStatus::NoTransaction);
        assert_eq!(resource.counts(), (1, 0, 1, 1));
    }

    #[test]
    fn test_release_runs_exactly_once_per_transaction() {
        let (manager, resource, scope) = setup();

        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        manager.commit(&scope).unwrap();
        manager.begin(&scope, &TransactionConfig::default()).unwrap();
        manager.rollback(&scope).unwrap();

        let (_, _, _, releases) = resource.counts();
        assert_eq!(releases, 2);
    }
}
