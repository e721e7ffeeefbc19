//! Fatal error payload
//!
//! A `FatalError` is an owned snapshot of a fault, taken on the thread that
//! observed it. It outlives the delivery call so that the fallback handler
//! can receive it later, from the timer's thread.

use std::fmt;
use std::thread::{self, ThreadId};
use std::time::SystemTime;

/// The thread that observed a fatal error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    /// Thread name, if the thread was named
    pub name: Option<String>,
    /// Thread ID
    pub id: ThreadId,
}

impl ThreadContext {
    /// Capture the calling thread
    pub fn current() -> Self {
        let current = thread::current();
        Self {
            name: current.name().map(str::to_string),
            id: current.id(),
        }
    }

    /// Display name, matching the std panic message (`<unnamed>` when absent)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// An unrecoverable error delivered to the guard
#[derive(Debug, Clone)]
pub struct FatalError {
    message: Option<String>,
    location: Option<String>,
    thread: ThreadContext,
    backtrace: Option<String>,
    occurred_at: SystemTime,
}

impl FatalError {
    /// Create a fatal error observed on the calling thread
    pub fn new(message: impl Into<String>) -> Self {
        Self::on_thread(Some(message.into()), ThreadContext::current())
    }

    /// Create a fatal error observed on a specific thread
    pub fn on_thread(message: Option<String>, thread: ThreadContext) -> Self {
        Self {
            message,
            location: None,
            thread,
            backtrace: None,
            occurred_at: SystemTime::now(),
        }
    }

    /// Attach the source location (`file:line:col`)
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a rendered backtrace
    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn thread(&self) -> &ThreadContext {
        &self.thread
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }

    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread '{}' failed", self.thread.display_name())?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        match &self.message {
            Some(message) => write!(f, ": {}", message),
            None => write!(f, ": <no message>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_current_thread() {
        let handle = thread::Builder::new()
            .name("worker-7".into())
            .spawn(|| FatalError::new("boom"))
            .unwrap();
        let error = handle.join().unwrap();

        assert_eq!(error.thread().name.as_deref(), Some("worker-7"));
        assert_ne!(error.thread().id, thread::current().id());
        assert_eq!(error.message(), Some("boom"));
    }

    #[test]
    fn test_display_format() {
        let ctx = ThreadContext {
            name: None,
            id: thread::current().id(),
        };
        let error = FatalError::on_thread(None, ctx).with_location("src/lib.rs:10:5");
        assert_eq!(
            error.to_string(),
            "thread '<unnamed>' failed at src/lib.rs:10:5: <no message>"
        );

        let error = FatalError::new("index out of bounds");
        assert!(error.to_string().ends_with(": index out of bounds"));
        assert!(error.location().is_none());
        assert!(error.backtrace().is_none());
    }
}
