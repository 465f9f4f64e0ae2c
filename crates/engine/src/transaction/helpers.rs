//! Transactional collections and flags
//!
//! Thin conveniences over the resource store. Every collection helper
//! returns the same `Arc` for the same key within one transaction, so
//! callers can mutate it in place and see each other's changes.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use txbind_core::{ResourceKey, Result, TransactionHost};

use super::binding::TransactionBinding;

/// Transaction-scoped hash map
pub type TxnMap<K, V> = Mutex<HashMap<K, V>>;
/// Transaction-scoped hash set
pub type TxnSet<T> = Mutex<HashSet<T>>;
/// Transaction-scoped ordered set
pub type TxnTreeSet<T> = Mutex<BTreeSet<T>>;
/// Transaction-scoped list
pub type TxnList<T> = Mutex<Vec<T>>;

/// Key for a boolean "already done" marker
pub type FlagKey = ResourceKey<bool>;

impl<H: TransactionHost> TransactionBinding<H> {
    /// Bound value for `key`, or a freshly bound `T::default()`
    pub fn get_or_create<T>(&self, key: &ResourceKey<T>) -> Result<Arc<T>>
    where
        T: Any + Send + Sync + Default,
    {
        let context = self.current_context()?;
        context.get_or_bind_with(key, T::default)
    }

    /// Transaction-scoped map for `key`
    pub fn get_map<K, V>(&self, key: &ResourceKey<TxnMap<K, V>>) -> Result<Arc<TxnMap<K, V>>>
    where
        K: Send + 'static,
        V: Send + 'static,
    {
        self.get_or_create(key)
    }

    /// Transaction-scoped set for `key`
    pub fn get_set<T>(&self, key: &ResourceKey<TxnSet<T>>) -> Result<Arc<TxnSet<T>>>
    where
        T: Send + 'static,
    {
        self.get_or_create(key)
    }

    /// Transaction-scoped ordered set for `key`
    pub fn get_tree_set<T>(&self, key: &ResourceKey<TxnTreeSet<T>>) -> Result<Arc<TxnTreeSet<T>>>
    where
        T: Send + 'static,
    {
        self.get_or_create(key)
    }

    /// Transaction-scoped list for `key`
    pub fn get_list<T>(&self, key: &ResourceKey<TxnList<T>>) -> Result<Arc<TxnList<T>>>
    where
        T: Send + 'static,
    {
        self.get_or_create(key)
    }

    /// Mark `key` as set
    ///
    /// Returns `true` the first time in a transaction, `false` afterwards
    /// until [`reset_flag`](Self::reset_flag) is called.
    pub fn set_flag(&self, key: &FlagKey) -> Result<bool> {
        let context = self.current_context()?;
        let first = context.bind_if_absent(key, true);
        debug!(txn_id = %context.id(), key = %key, first, "Set flag");
        Ok(first)
    }

    /// Is the marker for `key` bound?
    pub fn test_flag(&self, key: &FlagKey) -> Result<bool> {
        let context = self.current_context()?;
        Ok(context.has_resource(key))
    }

    /// Remove the marker for `key`
    pub fn reset_flag(&self, key: &FlagKey) -> Result<()> {
        self.unbind_resource(key)
    }
}
