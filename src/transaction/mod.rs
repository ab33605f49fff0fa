//! Transaction demarcation for a single session-backed resource.
//!
//! A caller asks to run a unit of work transactionally; this module
//! guarantees that one session is acquired, configured, bound to the
//! calling scope, and committed or rolled back exactly once, with the
//! session's prior attributes restored afterward regardless of outcome.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TransactionTemplate                       │
//! │      (propagation dispatch, begin/commit/rollback glue)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TransactionManager<R>                       │
//! │     (lifecycle state machine, per-scope status + context)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ TransactionResource hooks
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SessionResource<P>                        │
//! │   (acquire session, save/apply/restore session attributes)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                     session::SessionProvider
//! ```
//!
//! Alongside the stack, [`TransactionalSessionProvider`] lets ordinary
//! session-consuming code stay transaction-agnostic: inside a transaction
//! it hands out a non-closable view of the bound session, outside one it
//! delegates to the real provider.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use txscope::session::MemorySessionProvider;
//! use txscope::transaction::{
//!     Scope, SessionResource, TransactionConfig, TransactionError, TransactionManager,
//! };
//!
//! let provider = Arc::new(MemorySessionProvider::new());
//! let manager = TransactionManager::new(SessionResource::new(provider));
//! let scope = Scope::new();
//!
//! manager.begin(&scope, &TransactionConfig::default())?;
//! // ... perform work on the bound session ...
//! manager.commit(&scope)?;
//! # Ok::<(), TransactionError>(())
//! ```

mod config;
mod context;
mod error;
mod manager;
mod provider;
mod resource;
mod status;
mod template;

pub use config::{Propagation, TransactionConfig};
pub use context::{Scope, SessionContext, SessionScope, TransactionMetadata};
pub use error::{SystemError, TransactionError, TransactionResult};
pub use manager::{TransactionManager, TransactionResource};
pub use provider::{BoundSession, TransactionalSession, TransactionalSessionProvider};
pub use resource::SessionResource;
pub use status::TransactionStatus;
pub use template::TransactionTemplate;
