//! txscope - local, single-resource transaction demarcation.
//!
//! This crate binds database work to explicit transaction boundaries: a
//! caller asks to run a unit of work transactionally, and txscope
//! guarantees that one underlying session is acquired, configured, bound to
//! the calling scope, and committed or rolled back exactly once, with the
//! session's prior attributes (auto-commit, isolation level, read-only)
//! restored afterward regardless of success or failure.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use txscope::session::{MemorySessionProvider, Session, SessionProvider};
//! use txscope::transaction::{
//!     Scope, SessionResource, TransactionError, TransactionManager, TransactionTemplate,
//!     TransactionalSessionProvider,
//! };
//!
//! let provider = Arc::new(MemorySessionProvider::new());
//! let manager = TransactionManager::new(SessionResource::new(Arc::clone(&provider)));
//! let scope = Scope::new();
//! let sessions = TransactionalSessionProvider::new(Arc::clone(&provider), scope.clone());
//!
//! let template = TransactionTemplate::new(&manager);
//! let total: Result<u32, TransactionError> = template.execute(&scope, || {
//!     // inside the transaction, the provider hands out the bound session
//!     let session = sessions.session()?;
//!     // ... perform database work ...
//!     session.close()?; // local no-op; the transaction owns the session
//!     Ok(42)
//! });
//! assert_eq!(total.unwrap(), 42);
//! ```

pub mod session;
pub mod transaction;
