//! Per-transaction context
//!
//! One `TransactionContext` exists per active transaction per thread. It
//! bundles:
//! - the id and start time of the transaction (fixed at creation)
//! - the resource store: typed key -> shared value
//! - the listener registry
//!
//! # Thread Safety
//!
//! A context is only ever touched by the thread running its transaction.
//! The internal mutexes are therefore uncontended; they exist so that the
//! context can be stored in the host's `Send + Sync` resource map. No lock
//! is held across a call into user code.

use crate::listener::{ListenerHandle, ListenerIdentity};
use crate::registry::{ListenerRegistry, ListenerSnapshot};
use chrono::Utc;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use txbind_core::{Error, ResourceKey, Result, ThreadResource, Timestamp, TxnId};

/// Resources, listeners and identity of one transaction
pub struct TransactionContext {
    id: TxnId,
    start_time: Timestamp,
    resources: Mutex<FxHashMap<String, ThreadResource>>,
    listeners: Mutex<ListenerRegistry>,
}

impl TransactionContext {
    /// Create a fresh context, stamping id and start time
    pub fn new() -> Self {
        Self {
            id: TxnId::new(),
            start_time: Utc::now(),
            resources: Mutex::new(FxHashMap::with_capacity_and_hasher(17, Default::default())),
            listeners: Mutex::new(ListenerRegistry::new()),
        }
    }

    /// Transaction id
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Time the context was created
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    // ========================================================================
    // Resource store
    // ========================================================================

    /// Fetch the resource bound under `key`
    ///
    /// # Errors
    /// `ResourceTypeMismatch` if the name is bound to a value of another type.
    pub fn get_resource<T>(&self, key: &ResourceKey<T>) -> Result<Option<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        let found = self.resources.lock().get(key.name()).cloned();
        match found {
            Some(value) => downcast(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Bind a resource, replacing any previous value under the same name
    pub fn bind_resource<T>(&self, key: &ResourceKey<T>, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.resources.lock().insert(key.name().to_string(), value);
    }

    /// Remove a resource; returns whether one was bound
    pub fn unbind_resource<T>(&self, key: &ResourceKey<T>) -> bool {
        self.resources.lock().remove(key.name()).is_some()
    }

    /// Return the bound value, or bind and return the one built by `init`
    ///
    /// Repeated calls return the same `Arc`. `init` runs without the store
    /// locked and may use the context; if it binds `key` itself, that
    /// binding wins.
    pub fn get_or_bind_with<T, F>(&self, key: &ResourceKey<T>, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let existing = self.resources.lock().get(key.name()).cloned();
        if let Some(value) = existing {
            return downcast(key, value);
        }

        let fresh: ThreadResource = Arc::new(init());
        let value = self
            .resources
            .lock()
            .entry(key.name().to_string())
            .or_insert(fresh)
            .clone();
        downcast(key, value)
    }

    /// Bind `value` only if nothing is bound yet; returns whether it was bound
    pub fn bind_if_absent<T>(&self, key: &ResourceKey<T>, value: T) -> bool
    where
        T: Any + Send + Sync,
    {
        let mut resources = self.resources.lock();
        if resources.contains_key(key.name()) {
            return false;
        }
        resources.insert(key.name().to_string(), Arc::new(value));
        true
    }

    /// Is anything bound under this key name?
    pub fn has_resource<T>(&self, key: &ResourceKey<T>) -> bool {
        self.resources.lock().contains_key(key.name())
    }

    /// Number of bound resources
    pub fn resource_count(&self) -> usize {
        self.resources.lock().len()
    }

    // ========================================================================
    // Listener registry
    // ========================================================================

    /// Register a listener; returns false if it was already registered
    pub fn add_listener(&self, handle: ListenerHandle) -> bool {
        self.listeners.lock().add(handle)
    }

    /// Listeners in registration order
    pub fn listeners(&self) -> ListenerSnapshot {
        self.listeners.lock().snapshot()
    }

    /// Listeners not yet visited, in registration order
    pub fn pending_listeners(&self, visited: &FxHashSet<ListenerIdentity>) -> ListenerSnapshot {
        self.listeners.lock().pending(visited)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.resources.lock().keys().cloned().collect();
        keys.sort();
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.id)
            .field("start_time", &self.start_time)
            .field("resources", &keys)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransactionContext[txnId={}, resources={}, listeners={}]",
            self.id,
            self.resource_count(),
            self.listener_count()
        )
    }
}

fn downcast<T>(key: &ResourceKey<T>, value: ThreadResource) -> Result<Arc<T>>
where
    T: Any + Send + Sync,
{
    value.downcast::<T>().map_err(|_| Error::ResourceTypeMismatch {
        key: key.name().to_string(),
        expected: key.value_type(),
    })
}
