//! Transaction binding coordinator
//!
//! Maps the host's ambient "current transaction" to exactly one
//! [`TransactionContext`] per thread. The context is created lazily the
//! first time any operation needs it while a transaction is active, its
//! lifecycle hooks are registered with the host at the same moment, and it
//! is torn down by those hooks when the transaction completes.

use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};
use txbind_concurrency::{
    bind_context, bound_context, ContextSynchronization, ListenerHandle, TransactionContext,
};
use txbind_core::{
    Error, ResourceKey, Result, Timestamp, TransactionHost, TxnId, TxnReadState,
};

use crate::config::BindingConfig;

/// Per-thread transaction binding on top of a host transaction manager
///
/// Cheap to clone; clones share the host.
///
/// # Example
///
/// ```ignore
/// use txbind::prelude::*;
///
/// let host = Arc::new(LocalTransactionManager::new());
/// let binding = TransactionBinding::new(host.clone());
///
/// host.execute(&TransactionDefinition::required(), |_| {
///     binding.bind_resource(&USER, "alice".to_string())?;
///     binding.bind_listener(Arc::new(AuditOnCommit))?;
///     Ok::<_, Error>(())
/// })?;
/// ```
pub struct TransactionBinding<H: TransactionHost> {
    host: Arc<H>,
    config: BindingConfig,
}

impl<H: TransactionHost> TransactionBinding<H> {
    /// Bind to `host` with the default configuration
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            config: BindingConfig::default(),
        }
    }

    /// Bind to `host` with a validated configuration
    pub fn with_config(host: Arc<H>, config: BindingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { host, config })
    }

    /// The host transaction manager
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Active configuration
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    // ========================================================================
    // Context lookup
    // ========================================================================

    /// Context of the calling thread's transaction, created on first use
    ///
    /// # Errors
    /// `NoActiveTransaction` if no transaction is active.
    pub fn current_context(&self) -> Result<Arc<TransactionContext>> {
        if !self.host.is_transaction_active() {
            return Err(Error::no_active_transaction());
        }
        if let Some(context) = bound_context(self.host.as_ref()) {
            return Ok(context);
        }

        let context = Arc::new(TransactionContext::new());
        let synchronization = ContextSynchronization::new(context.clone())
            .with_order(self.config.synchronization_order())
            .with_catch_panics(self.config.catch_listener_panics);
        self.host.register_synchronization(Arc::new(synchronization))?;
        bind_context(self.host.as_ref(), &context);
        debug!(txn_id = %context.id(), "Bound txn synch: {}", context);
        Ok(context)
    }

    /// Context if one exists or can be created; `None` outside a transaction
    fn context_if_active(&self) -> Option<Arc<TransactionContext>> {
        if let Some(context) = bound_context(self.host.as_ref()) {
            return Some(context);
        }
        if !self.host.is_transaction_active() {
            return None;
        }
        match self.current_context() {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(error = %e, "could not register transaction synchronization");
                None
            }
        }
    }

    /// Id of the current transaction, or `None` outside a transaction
    ///
    /// Inside a transaction this creates the context if needed, so the id
    /// is defined from the first query on.
    pub fn transaction_id(&self) -> Option<TxnId> {
        self.context_if_active().map(|context| context.id())
    }

    /// Start time of the current transaction, or `None` outside a transaction
    pub fn transaction_start_time(&self) -> Option<Timestamp> {
        self.context_if_active().map(|context| context.start_time())
    }

    /// Start time in epoch milliseconds, or `-1` outside a transaction
    pub fn transaction_start_millis(&self) -> i64 {
        self.transaction_start_time()
            .map_or(-1, |time| time.timestamp_millis())
    }

    /// Read-write state from the host's flags; never creates a context
    pub fn read_state(&self) -> TxnReadState {
        TxnReadState::from_flags(
            self.host.is_transaction_active(),
            self.host.is_current_transaction_read_only(),
        )
    }

    /// Fail unless a transaction is active and, if required, writable
    ///
    /// # Errors
    /// - `NoActiveTransaction` if no transaction is active
    /// - `ReadOnlyViolation` if `require_read_write` and the transaction is read-only
    pub fn check_read_state(&self, require_read_write: bool) -> Result<()> {
        match self.read_state() {
            TxnReadState::None => Err(Error::no_active_transaction()),
            TxnReadState::ReadOnly if require_read_write => {
                let txn_id = bound_context(self.host.as_ref()).map(|context| context.id());
                Err(Error::read_only_violation(txn_id))
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Resource bound to the current transaction
    ///
    /// # Errors
    /// - `NoActiveTransaction` if no transaction is active
    /// - `ResourceTypeMismatch` if the key name holds another type
    pub fn get_resource<T>(&self, key: &ResourceKey<T>) -> Result<Option<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        let context = self.current_context()?;
        let resource = context.get_resource(key)?;
        debug!(
            txn_id = %context.id(),
            key = %key,
            found = resource.is_some(),
            "Fetched resource"
        );
        Ok(resource)
    }

    /// Bind a resource to the current transaction, replacing any previous one
    ///
    /// Accepts either a value or an existing `Arc`.
    pub fn bind_resource<T>(&self, key: &ResourceKey<T>, value: impl Into<Arc<T>>) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let context = self.current_context()?;
        context.bind_resource(key, value.into());
        debug!(txn_id = %context.id(), key = %key, "Bound resource");
        Ok(())
    }

    /// Remove a resource from the current transaction; no-op if absent
    pub fn unbind_resource<T>(&self, key: &ResourceKey<T>) -> Result<()> {
        let context = self.current_context()?;
        let removed = context.unbind_resource(key);
        debug!(txn_id = %context.id(), key = %key, removed, "Unbound resource");
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener with the current transaction
    ///
    /// Returns `true` if newly added, `false` if it was already bound.
    pub fn bind_listener(&self, listener: impl Into<ListenerHandle>) -> Result<bool> {
        let context = self.current_context()?;
        let handle = listener.into();
        let bound = context.add_listener(handle.clone());
        if bound {
            debug!(txn_id = %context.id(), listener = %handle, "Bound listener");
        } else {
            debug!(txn_id = %context.id(), listener = %handle, "Listener already bound");
        }
        Ok(bound)
    }
}

impl<H: TransactionHost> Clone for TransactionBinding<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            config: self.config.clone(),
        }
    }
}

impl<H: TransactionHost> std::fmt::Debug for TransactionBinding<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBinding")
            .field("config", &self.config)
            .finish()
    }
}
