//! Boundary contracts with the host transaction manager
//!
//! The binding layer never starts, commits or rolls back anything itself.
//! It observes the host through three traits:
//!
//! - [`ThreadResources`]: per-execution-unit storage keyed by a well-known
//!   name, where the binding layer stashes its context
//! - [`TransactionHost`]: ambient "is a transaction active / read-only"
//!   queries plus synchronization registration
//! - [`TransactionSynchronization`]: the lifecycle hook object the host
//!   drives at suspend, resume, commit and completion time
//!
//! Hooks receive the host's [`ThreadResources`] explicitly, so detaching a
//! context on suspend and reattaching it on resume is a visible
//! save/restore rather than a side effect on hidden globals.

use crate::error::Result;
use crate::types::CompletionStatus;
use std::any::Any;
use std::sync::Arc;

/// Value stored in the host's per-thread resource map
pub type ThreadResource = Arc<dyn Any + Send + Sync>;

/// Per-thread resource storage owned by the host
///
/// All operations act on the calling thread's slot only.
pub trait ThreadResources {
    /// Look up a resource bound to the calling thread
    fn get_thread_resource(&self, key: &str) -> Option<ThreadResource>;

    /// Bind a resource, replacing any previous binding
    fn bind_thread_resource(&self, key: &str, value: ThreadResource);

    /// Remove and return a binding
    fn unbind_thread_resource(&self, key: &str) -> Option<ThreadResource>;

    /// Check whether a binding exists
    fn has_thread_resource(&self, key: &str) -> bool {
        self.get_thread_resource(key).is_some()
    }

    /// Remove a binding if present, reporting whether one was removed
    fn clear_thread_resource(&self, key: &str) -> bool {
        if self.has_thread_resource(key) {
            self.unbind_thread_resource(key).is_some()
        } else {
            false
        }
    }
}

/// Host transaction manager as seen by the binding layer
pub trait TransactionHost: ThreadResources + Send + Sync {
    /// Is a transaction (with synchronization) active on this thread?
    fn is_transaction_active(&self) -> bool;

    /// Is the active transaction read-only?
    fn is_current_transaction_read_only(&self) -> bool;

    /// Register lifecycle hooks for the current transaction
    ///
    /// Fails if no transaction is active.
    fn register_synchronization(&self, synchronization: Arc<dyn TransactionSynchronization>)
        -> Result<()>;
}

/// Lifecycle hooks invoked by the host transaction manager
///
/// Ordering contract, per transaction:
///
/// ```text
/// commit:   before_commit -> before_completion -> after_completion(Committed)
/// rollback:                  before_completion -> after_completion(RolledBack)
/// nesting:  suspend ... (inner transaction) ... resume
/// ```
pub trait TransactionSynchronization: Send + Sync {
    /// Relative order; lower values run first
    fn order(&self) -> i32;

    /// Detach from the thread because a nested transaction is starting
    fn suspend(&self, resources: &dyn ThreadResources);

    /// Reattach to the thread after the nested transaction completed
    fn resume(&self, resources: &dyn ThreadResources);

    /// Commit path only; a failure aborts the commit
    fn before_commit(&self, read_only: bool, resources: &dyn ThreadResources) -> Result<()>;

    /// Both paths; a failure is reported to the host
    fn before_completion(&self, resources: &dyn ThreadResources) -> Result<()>;

    /// Both paths, always last; never fails
    fn after_completion(&self, status: CompletionStatus, resources: &dyn ThreadResources);
}
