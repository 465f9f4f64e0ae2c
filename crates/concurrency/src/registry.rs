//! Insertion-ordered listener set
//!
//! Order is the order in which distinct identities were first added.
//! Re-adding an identity is a no-op and never moves it.

use crate::listener::{ListenerHandle, ListenerIdentity};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Listener snapshot; most transactions carry only a handful of listeners
pub type ListenerSnapshot = SmallVec<[ListenerHandle; 8]>;

/// Ordered set of listener handles
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    ordered: Vec<ListenerHandle>,
    members: FxHashSet<ListenerIdentity>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener; returns false if its identity is already registered
    pub fn add(&mut self, handle: ListenerHandle) -> bool {
        if !self.members.insert(handle.identity().clone()) {
            return false;
        }
        self.ordered.push(handle);
        true
    }

    /// Is this identity registered?
    pub fn contains(&self, identity: &ListenerIdentity) -> bool {
        self.members.contains(identity)
    }

    /// Copy of all listeners in registration order
    pub fn snapshot(&self) -> ListenerSnapshot {
        self.ordered.iter().cloned().collect()
    }

    /// Listeners not yet in `visited`, in registration order
    pub fn pending(&self, visited: &FxHashSet<ListenerIdentity>) -> ListenerSnapshot {
        self.ordered
            .iter()
            .filter(|h| !visited.contains(h.identity()))
            .cloned()
            .collect()
    }

    /// Number of distinct listeners
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Check if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
