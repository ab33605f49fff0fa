//! The session layer - database sessions and their providers.
//!
//! This module defines the resource boundary the transaction core is built
//! on. A [`Session`] is an open handle to a database connection: it carries
//! the three configurable attributes (auto-commit, isolation level,
//! read-only) and can be committed, rolled back and closed. A
//! [`SessionProvider`] yields sessions on demand, analogous to a connection
//! source.
//!
//! Two implementations ship with the crate:
//! - [`MemorySession`] / [`MemorySessionProvider`]: in-memory sessions for
//!   tests and examples, with failure injection and call counters.
//! - [`LoggingSession`] / [`LoggingProvider`]: decorators that trace every
//!   call while preserving the wrapped contract's error semantics.

mod error;
mod isolation;
mod logging;
mod memory;
mod traits;

pub use error::{SessionError, SessionResult};
pub use isolation::IsolationLevel;
pub use logging::{LoggingProvider, LoggingSession};
pub use memory::{MemorySession, MemorySessionProvider};
pub use traits::{Session, SessionProvider};
