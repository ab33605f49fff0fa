//! In-memory session and provider.
//!
//! `MemorySession` implements the full [`Session`] contract against plain
//! in-process state. It is suitable for:
//! - Unit tests
//! - Integration tests that exercise transaction demarcation without a
//!   database
//!
//! Because it is the crate's reference implementation of the session
//! contract, it also carries the test instrumentation the rest of the crate
//! relies on: per-operation call counters and failure switches that make
//! every failure ordering of the transaction lifecycle reproducible.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::error::{SessionError, SessionResult};
use crate::session::isolation::IsolationLevel;
use crate::session::traits::{Session, SessionProvider};

#[derive(Debug)]
struct SessionState {
    auto_commit: bool,
    isolation: IsolationLevel,
    read_only: bool,
    closed: bool,
    valid: bool,

    // call counters, failed attempts included
    commit_calls: u32,
    rollback_calls: u32,
    close_calls: u32,
    set_auto_commit_calls: u32,
    set_isolation_calls: u32,
    set_read_only_calls: u32,

    // failure switches
    fail_on_commit: bool,
    fail_on_rollback: bool,
    fail_on_close: bool,
    fail_on_set_auto_commit: bool,
    fail_on_set_isolation: bool,
    fail_on_set_read_only: bool,
}

impl SessionState {
    fn new(auto_commit: bool, isolation: IsolationLevel, read_only: bool) -> Self {
        Self {
            auto_commit,
            isolation,
            read_only,
            closed: false,
            valid: true,
            commit_calls: 0,
            rollback_calls: 0,
            close_calls: 0,
            set_auto_commit_calls: 0,
            set_isolation_calls: 0,
            set_read_only_calls: 0,
            fail_on_commit: false,
            fail_on_rollback: false,
            fail_on_close: false,
            fail_on_set_auto_commit: false,
            fail_on_set_isolation: false,
            fail_on_set_read_only: false,
        }
    }
}

/// An in-memory database session.
///
/// Cloning yields another handle to the same session, so a test can keep a
/// handle for inspection while the session itself travels through a
/// provider and a transaction.
#[derive(Debug, Clone)]
pub struct MemorySession {
    state: Arc<Mutex<SessionState>>,
}

impl MemorySession {
    /// Create a session in the usual fresh-connection state:
    /// auto-commit on, read committed, read-write.
    pub fn new() -> Self {
        Self::with_state(true, IsolationLevel::ReadCommitted, false)
    }

    /// Create a session with explicit initial attributes.
    pub fn with_state(auto_commit: bool, isolation: IsolationLevel, read_only: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(auto_commit, isolation, read_only))),
        }
    }

    /// Mark the session invalid, as a dropped connection would be.
    pub fn invalidate(&self) {
        self.state.lock().valid = false;
    }

    // ==================== Failure injection ====================

    /// Make subsequent `commit` calls fail.
    pub fn fail_on_commit(&self, fail: bool) {
        self.state.lock().fail_on_commit = fail;
    }

    /// Make subsequent `rollback` calls fail.
    pub fn fail_on_rollback(&self, fail: bool) {
        self.state.lock().fail_on_rollback = fail;
    }

    /// Make subsequent `close` calls fail.
    pub fn fail_on_close(&self, fail: bool) {
        self.state.lock().fail_on_close = fail;
    }

    /// Make subsequent `set_auto_commit` calls fail.
    pub fn fail_on_set_auto_commit(&self, fail: bool) {
        self.state.lock().fail_on_set_auto_commit = fail;
    }

    /// Make subsequent `set_isolation` calls fail.
    pub fn fail_on_set_isolation(&self, fail: bool) {
        self.state.lock().fail_on_set_isolation = fail;
    }

    /// Make subsequent `set_read_only` calls fail.
    pub fn fail_on_set_read_only(&self, fail: bool) {
        self.state.lock().fail_on_set_read_only = fail;
    }

    // ==================== Call counters ====================

    /// Number of `commit` calls, failed attempts included.
    pub fn commit_calls(&self) -> u32 {
        self.state.lock().commit_calls
    }

    /// Number of `rollback` calls, failed attempts included.
    pub fn rollback_calls(&self) -> u32 {
        self.state.lock().rollback_calls
    }

    /// Number of `close` calls, failed attempts included.
    pub fn close_calls(&self) -> u32 {
        self.state.lock().close_calls
    }

    /// Number of `set_auto_commit` calls, failed attempts included.
    pub fn set_auto_commit_calls(&self) -> u32 {
        self.state.lock().set_auto_commit_calls
    }

    /// Number of `set_isolation` calls, failed attempts included.
    pub fn set_isolation_calls(&self) -> u32 {
        self.state.lock().set_isolation_calls
    }

    /// Number of `set_read_only` calls, failed attempts included.
    pub fn set_read_only_calls(&self) -> u32 {
        self.state.lock().set_read_only_calls
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn auto_commit(&self) -> SessionResult<bool> {
        let state = self.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state.auto_commit)
    }

    fn set_auto_commit(&self, auto_commit: bool) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.set_auto_commit_calls += 1;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.fail_on_set_auto_commit {
            return Err(SessionError::database("injected set_auto_commit failure"));
        }
        state.auto_commit = auto_commit;
        Ok(())
    }

    fn isolation(&self) -> SessionResult<IsolationLevel> {
        let state = self.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state.isolation)
    }

    fn set_isolation(&self, isolation: IsolationLevel) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.set_isolation_calls += 1;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if isolation.is_unspecified() {
            return Err(SessionError::database("cannot set unspecified isolation level"));
        }
        if state.fail_on_set_isolation {
            return Err(SessionError::database("injected set_isolation failure"));
        }
        state.isolation = isolation;
        Ok(())
    }

    fn is_read_only(&self) -> SessionResult<bool> {
        let state = self.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state.read_only)
    }

    fn set_read_only(&self, read_only: bool) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.set_read_only_calls += 1;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.fail_on_set_read_only {
            return Err(SessionError::database("injected set_read_only failure"));
        }
        state.read_only = read_only;
        Ok(())
    }

    fn commit(&self) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.commit_calls += 1;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.fail_on_commit {
            return Err(SessionError::database("injected commit failure"));
        }
        Ok(())
    }

    fn rollback(&self) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.rollback_calls += 1;
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.fail_on_rollback {
            return Err(SessionError::database("injected rollback failure"));
        }
        Ok(())
    }

    fn close(&self) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.close_calls += 1;
        if state.closed {
            // closing a closed session is a no-op
            return Ok(());
        }
        if state.fail_on_close {
            return Err(SessionError::database("injected close failure"));
        }
        state.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> SessionResult<bool> {
        Ok(self.state.lock().closed)
    }

    fn is_valid(&self) -> SessionResult<bool> {
        let state = self.state.lock();
        Ok(state.valid && !state.closed)
    }
}

#[derive(Debug)]
struct ProviderState {
    default_auto_commit: bool,
    default_isolation: IsolationLevel,
    default_read_only: bool,
    fail_on_session: bool,
    opened: Vec<MemorySession>,
}

/// A provider that opens [`MemorySession`]s directly, the way a minimal
/// driver-backed connection source would.
///
/// Keeps a handle to every session it opened so tests can inspect sessions
/// after the code under test is done with them.
#[derive(Debug, Clone)]
pub struct MemorySessionProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MemorySessionProvider {
    /// Create a provider whose sessions start in the usual fresh-connection
    /// state: auto-commit on, read committed, read-write.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                default_auto_commit: true,
                default_isolation: IsolationLevel::ReadCommitted,
                default_read_only: false,
                fail_on_session: false,
                opened: Vec::new(),
            })),
        }
    }

    /// Initial auto-commit mode for sessions opened from now on.
    pub fn set_default_auto_commit(&self, auto_commit: bool) {
        self.state.lock().default_auto_commit = auto_commit;
    }

    /// Initial isolation level for sessions opened from now on.
    pub fn set_default_isolation(&self, isolation: IsolationLevel) {
        self.state.lock().default_isolation = isolation;
    }

    /// Initial read-only flag for sessions opened from now on.
    pub fn set_default_read_only(&self, read_only: bool) {
        self.state.lock().default_read_only = read_only;
    }

    /// Make subsequent `session` calls fail.
    pub fn fail_on_session(&self, fail: bool) {
        self.state.lock().fail_on_session = fail;
    }

    /// Number of sessions opened so far.
    pub fn opened_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    /// Handle to the most recently opened session.
    pub fn last_session(&self) -> Option<MemorySession> {
        self.state.lock().opened.last().cloned()
    }
}

impl Default for MemorySessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for MemorySessionProvider {
    type Session = MemorySession;

    fn session(&self) -> SessionResult<MemorySession> {
        let mut state = self.state.lock();
        if state.fail_on_session {
            return Err(SessionError::database("injected session acquisition failure"));
        }
        let session = MemorySession::with_state(
            state.default_auto_commit,
            state.default_isolation,
            state.default_read_only,
        );
        state.opened.push(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_state() {
        let session = MemorySession::new();
        assert!(session.auto_commit().unwrap());
        assert_eq!(session.isolation().unwrap(), IsolationLevel::ReadCommitted);
        assert!(!session.is_read_only().unwrap());
        assert!(!session.is_closed().unwrap());
        assert!(session.is_valid().unwrap());
    }

    #[test]
    fn test_attribute_changes() {
        let session = MemorySession::new();
        session.set_auto_commit(false).unwrap();
        session.set_isolation(IsolationLevel::Serializable).unwrap();
        session.set_read_only(true).unwrap();

        assert!(!session.auto_commit().unwrap());
        assert_eq!(session.isolation().unwrap(), IsolationLevel::Serializable);
        assert!(session.is_read_only().unwrap());
        assert_eq!(session.set_isolation_calls(), 1);
        assert_eq!(session.set_read_only_calls(), 1);
    }

    #[test]
    fn test_unspecified_isolation_rejected() {
        let session = MemorySession::new();
        assert!(session.set_isolation(IsolationLevel::Unspecified).is_err());
        assert_eq!(session.isolation().unwrap(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let session = MemorySession::new();
        session.close().unwrap();

        assert_eq!(session.commit(), Err(SessionError::Closed));
        assert_eq!(session.rollback(), Err(SessionError::Closed));
        assert_eq!(session.set_auto_commit(true), Err(SessionError::Closed));
        assert!(!session.is_valid().unwrap());
        // a second close is a no-op
        session.close().unwrap();
    }

    #[test]
    fn test_failure_injection_counts_attempt() {
        let session = MemorySession::new();
        session.fail_on_commit(true);

        assert!(session.commit().is_err());
        assert_eq!(session.commit_calls(), 1);

        session.fail_on_commit(false);
        session.commit().unwrap();
        assert_eq!(session.commit_calls(), 2);
    }

    #[test]
    fn test_clone_shares_state() {
        let session = MemorySession::new();
        let handle = session.clone();
        session.set_read_only(true).unwrap();
        assert!(handle.is_read_only().unwrap());
    }

    #[test]
    fn test_provider_opens_independent_sessions() {
        let provider = MemorySessionProvider::new();
        let first = provider.session().unwrap();
        let second = provider.session().unwrap();

        first.set_read_only(true).unwrap();
        assert!(!second.is_read_only().unwrap());
        assert_eq!(provider.opened_count(), 2);
    }

    #[test]
    fn test_provider_defaults_and_failure() {
        let provider = MemorySessionProvider::new();
        provider.set_default_auto_commit(false);
        provider.set_default_isolation(IsolationLevel::Serializable);

        let session = provider.session().unwrap();
        assert!(!session.auto_commit().unwrap());
        assert_eq!(session.isolation().unwrap(), IsolationLevel::Serializable);

        provider.fail_on_session(true);
        assert!(provider.session().is_err());
    }

    #[test]
    fn test_last_session_tracks_opened() {
        let provider = MemorySessionProvider::new();
        assert!(provider.last_session().is_none());

        let session = provider.session().unwrap();
        session.set_read_only(true).unwrap();

        let tracked = provider.last_session().unwrap();
        assert!(tracked.is_read_only().unwrap());
    }
}
