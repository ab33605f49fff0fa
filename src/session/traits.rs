//! Session and provider traits - the resource boundary.
//!
//! Everything above this boundary (the transaction module) talks to the
//! database exclusively through these two traits. Implementations decide how
//! a session maps onto a real connection; methods take `&self` and interior
//! mutability is the implementor's business, matching how driver handles are
//! usually shared.

use crate::session::error::SessionResult;
use crate::session::isolation::IsolationLevel;

/// An open handle to a database session.
///
/// A session carries three configurable attributes (auto-commit, isolation
/// level, read-only) and can be committed, rolled back and closed. Any
/// operation may fail with a [`SessionError`](crate::session::SessionError).
pub trait Session {
    /// Get the session's auto-commit mode.
    fn auto_commit(&self) -> SessionResult<bool>;

    /// Set the session's auto-commit mode.
    ///
    /// Switching auto-commit off is the transaction-start signal for
    /// explicit transaction demarcation.
    fn set_auto_commit(&self, auto_commit: bool) -> SessionResult<()>;

    /// Get the session's current isolation level.
    fn isolation(&self) -> SessionResult<IsolationLevel>;

    /// Set the session's isolation level.
    ///
    /// Implementations reject `IsolationLevel::Unspecified`. The result of
    /// changing isolation while a transaction is in progress is
    /// driver-defined; callers are expected to check auto-commit first.
    fn set_isolation(&self, isolation: IsolationLevel) -> SessionResult<()>;

    /// Get the session's read-only flag.
    fn is_read_only(&self) -> SessionResult<bool>;

    /// Set the session's read-only flag.
    ///
    /// Cannot be called while a transaction is in progress on the session.
    fn set_read_only(&self, read_only: bool) -> SessionResult<()>;

    /// Commit the current transaction on this session.
    fn commit(&self) -> SessionResult<()>;

    /// Roll back the current transaction on this session.
    fn rollback(&self) -> SessionResult<()>;

    /// Close the session, releasing the underlying connection.
    fn close(&self) -> SessionResult<()>;

    /// Whether this session has been closed.
    fn is_closed(&self) -> SessionResult<bool>;

    /// Whether the session is still usable.
    fn is_valid(&self) -> SessionResult<bool>;
}

/// A factory that yields sessions on demand.
///
/// Analogous to a connection source: callers ask for a session, use it, and
/// close it when done.
pub trait SessionProvider {
    /// The session type handed out by this provider.
    type Session: Session;

    /// Open a session.
    fn session(&self) -> SessionResult<Self::Session>;
}
