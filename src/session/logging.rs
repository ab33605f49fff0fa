//! Tracing decorators for sessions and providers.
//!
//! These wrap any [`Session`] / [`SessionProvider`] and emit a `tracing`
//! event around each call. Results and errors pass through unchanged, so
//! wrapped and unwrapped objects are interchangeable.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::error::SessionResult;
use crate::session::isolation::IsolationLevel;
use crate::session::traits::{Session, SessionProvider};

/// A session decorator that logs every call at debug level.
#[derive(Debug)]
pub struct LoggingSession<S> {
    inner: S,
    label: String,
}

impl<S: Session> LoggingSession<S> {
    /// Wrap a session under the given label.
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }

    /// Consume the decorator and return the wrapped session.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn traced<T: fmt::Debug>(&self, call: &str, result: SessionResult<T>) -> SessionResult<T> {
        match &result {
            Ok(value) => tracing::debug!(session = %self.label, call, result = ?value, "session call"),
            Err(err) => tracing::debug!(session = %self.label, call, error = %err, "session call failed"),
        }
        result
    }
}

impl<S: Session> Session for LoggingSession<S> {
    fn auto_commit(&self) -> SessionResult<bool> {
        self.traced("auto_commit", self.inner.auto_commit())
    }

    fn set_auto_commit(&self, auto_commit: bool) -> SessionResult<()> {
        self.traced(
            if auto_commit { "set_auto_commit(true)" } else { "set_auto_commit(false)" },
            self.inner.set_auto_commit(auto_commit),
        )
    }

    fn isolation(&self) -> SessionResult<IsolationLevel> {
        self.traced("isolation", self.inner.isolation())
    }

    fn set_isolation(&self, isolation: IsolationLevel) -> SessionResult<()> {
        let result = self.inner.set_isolation(isolation);
        match &result {
            Ok(()) => {
                tracing::debug!(session = %self.label, %isolation, "session call: set_isolation");
            }
            Err(err) => {
                tracing::debug!(session = %self.label, %isolation, error = %err, "session call failed: set_isolation");
            }
        }
        result
    }

    fn is_read_only(&self) -> SessionResult<bool> {
        self.traced("is_read_only", self.inner.is_read_only())
    }

    fn set_read_only(&self, read_only: bool) -> SessionResult<()> {
        self.traced(
            if read_only { "set_read_only(true)" } else { "set_read_only(false)" },
            self.inner.set_read_only(read_only),
        )
    }

    fn commit(&self) -> SessionResult<()> {
        self.traced("commit", self.inner.commit())
    }

    fn rollback(&self) -> SessionResult<()> {
        self.traced("rollback", self.inner.rollback())
    }

    fn close(&self) -> SessionResult<()> {
        self.traced("close", self.inner.close())
    }

    fn is_closed(&self) -> SessionResult<bool> {
        self.traced("is_closed", self.inner.is_closed())
    }

    fn is_valid(&self) -> SessionResult<bool> {
        self.traced("is_valid", self.inner.is_valid())
    }
}

/// A provider decorator that logs session acquisition and wraps every
/// session it hands out in a [`LoggingSession`].
#[derive(Debug)]
pub struct LoggingProvider<P> {
    inner: P,
    label: String,
    next_session: AtomicU64,
}

impl<P: SessionProvider> LoggingProvider<P> {
    /// Wrap a provider under the given label.
    pub fn new(inner: P, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            next_session: AtomicU64::new(1),
        }
    }

    /// Consume the decorator and return the wrapped provider.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: SessionProvider> SessionProvider for LoggingProvider<P> {
    type Session = LoggingSession<P::Session>;

    fn session(&self) -> SessionResult<LoggingSession<P::Session>> {
        match self.inner.session() {
            Ok(session) => {
                let seq = self.next_session.fetch_add(1, Ordering::Relaxed);
                let label = format!("{}#{}", self.label, seq);
                tracing::debug!(provider = %self.label, session = %label, "session opened");
                Ok(LoggingSession::new(session, label))
            }
            Err(err) => {
                tracing::debug!(provider = %self.label, error = %err, "session acquisition failed");
                Err(err)
            }
        }
    }
}
