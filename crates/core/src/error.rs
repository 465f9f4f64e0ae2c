//! Error types for transaction binding
//!
//! Every fatal error carries the label of the thread it was raised on, and
//! the transaction id where one is known, so that a failure can be traced
//! back to the unit of work that produced it.
//!
//! ## Taxonomy
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | NoActiveTransaction | A resource/listener operation runs with no transaction |
//! | ReadOnlyViolation | Read-write is required but the transaction is read-only |
//! | NoSynchronizationBound | A commit hook runs but the context is not bound |
//! | ResourceTypeMismatch | A key name is bound to a value of another type |
//! | ListenerCallback | A before-commit / before-completion listener failed |
//! | InvalidConfig | Configuration rejected |
//! | Host | The host transaction manager refused an operation |

use crate::types::TxnId;
use std::fmt;
use thiserror::Error;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned by listener callbacks
pub type ListenerResult = std::result::Result<(), ListenerError>;

/// All binding errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No transaction is active on the calling thread
    #[error("transaction must be active and synchronization is required: {thread}")]
    NoActiveTransaction {
        /// Label of the calling thread
        thread: String,
    },

    /// A read-write transaction is required but the active one is read-only
    #[error("the current operation requires an active read-write transaction: {thread}, txn {txn_id}")]
    ReadOnlyViolation {
        /// Label of the calling thread
        thread: String,
        /// Id of the active transaction, or `-` if no context exists yet
        txn_id: String,
    },

    /// A lifecycle hook ran but no context is bound to the thread
    #[error("no synchronization bound to thread: {thread}")]
    NoSynchronizationBound {
        /// Label of the calling thread
        thread: String,
    },

    /// The key is bound to a value of a different type
    #[error("resource '{key}' is not of type {expected}")]
    ResourceTypeMismatch {
        /// Name of the resource key
        key: String,
        /// Type the caller asked for
        expected: &'static str,
    },

    /// A listener failed during a phase whose failures abort the commit
    #[error("listener failed during {phase} of txn {txn_id}: {source}")]
    ListenerCallback {
        /// Lifecycle phase that was running
        phase: &'static str,
        /// Transaction whose listener failed
        txn_id: TxnId,
        /// Failure reported by the listener
        #[source]
        source: ListenerError,
    },

    /// Configuration rejected
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Host transaction manager refused the operation
    #[error("host error: {0}")]
    Host(String),
}

impl Error {
    /// Build a `NoActiveTransaction` for the calling thread.
    pub fn no_active_transaction() -> Self {
        Error::NoActiveTransaction {
            thread: current_thread_label(),
        }
    }

    /// Build a `ReadOnlyViolation` for the calling thread.
    pub fn read_only_violation(txn_id: Option<TxnId>) -> Self {
        Error::ReadOnlyViolation {
            thread: current_thread_label(),
            txn_id: txn_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        }
    }

    /// Build a `NoSynchronizationBound` for the calling thread.
    pub fn no_synchronization_bound() -> Self {
        Error::NoSynchronizationBound {
            thread: current_thread_label(),
        }
    }

    /// Check if this is a missing-transaction error.
    pub fn is_no_transaction(&self) -> bool {
        matches!(self, Error::NoActiveTransaction { .. })
    }

    /// Check if this is a read-only violation.
    pub fn is_read_only_violation(&self) -> bool {
        matches!(self, Error::ReadOnlyViolation { .. })
    }

    /// Check if this wraps a listener failure.
    pub fn is_listener_failure(&self) -> bool {
        matches!(self, Error::ListenerCallback { .. })
    }

    /// Fatal errors are never retried by this layer.
    ///
    /// Only listener failures are left for the host to interpret (as an
    /// abort signal); everything else is the caller's problem.
    pub fn is_fatal(&self) -> bool {
        !self.is_listener_failure()
    }
}

/// Failure reported by a listener callback.
#[derive(Debug)]
pub struct ListenerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ListenerError {
    /// Create a listener error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error
    pub fn from_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        ListenerError::new(message)
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        ListenerError::new(message)
    }
}

/// Label of the calling thread, e.g. `Thread[main, ThreadId(1)]`.
pub fn current_thread_label() -> String {
    let thread = std::thread::current();
    format!(
        "Thread[{}, {:?}]",
        thread.name().unwrap_or("unnamed"),
        thread.id()
    )
}
