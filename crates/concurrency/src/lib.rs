//! Concurrency layer for transaction binding
//!
//! This crate implements the per-transaction bookkeeping:
//! - TransactionContext: resource store + listener registry + identity
//! - Listener dispatch: fixed-point before-commit, snapshot fan-out for
//!   before-completion and after-completion
//! - ContextSynchronization: the hook object the host drives
//! - LocalTransactionManager: an in-process host manager
//!
//! Each context is owned by the single thread running its transaction.
//! Locks inside a context are never held while a listener runs, so
//! listeners may freely re-enter the context.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod dispatch;
pub mod listener;
pub mod manager;
pub mod registry;
pub mod synchronization;

pub use context::TransactionContext;
pub use listener::{ListenerHandle, ListenerIdentity, TransactionListener};
pub use manager::{
    HostMetrics, LocalTransactionManager, Propagation, TransactionDefinition, TransactionStatus,
};
pub use registry::{ListenerRegistry, ListenerSnapshot};
pub use synchronization::{
    bind_context, bound_context, clear_context, ContextSynchronization, CONTEXT_RESOURCE_KEY,
};

// Re-export the host traits from core for convenience
pub use txbind_core::traits::{ThreadResources, TransactionHost, TransactionSynchronization};
