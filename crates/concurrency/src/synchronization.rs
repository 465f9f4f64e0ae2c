//! Lifecycle hooks that tie a context to the host transaction
//!
//! A `ContextSynchronization` is registered with the host once per
//! transaction. The context itself is stashed in the host's thread
//! resources under [`CONTEXT_RESOURCE_KEY`]; the hooks detach it on
//! suspend, reattach it on resume and remove it once the transaction has
//! completed.

use crate::context::TransactionContext;
use crate::dispatch;
use std::panic;
use std::sync::Arc;
use tracing::{debug, warn};
use txbind_core::{
    CompletionStatus, Error, Result, ThreadResource, ThreadResources, TransactionSynchronization,
    BINDING_SYNCHRONIZATION_ORDER,
};

/// Thread resource key the context is bound under
pub const CONTEXT_RESOURCE_KEY: &str = "txbind.context";

/// Context bound to the calling thread, if any
pub fn bound_context(resources: &dyn ThreadResources) -> Option<Arc<TransactionContext>> {
    let resource = resources.get_thread_resource(CONTEXT_RESOURCE_KEY)?;
    match resource.downcast::<TransactionContext>() {
        Ok(context) => Some(context),
        Err(_) => {
            warn!(
                key = CONTEXT_RESOURCE_KEY,
                "thread resource is not a transaction context; ignoring"
            );
            None
        }
    }
}

/// Bind `context` to the calling thread
pub fn bind_context(resources: &dyn ThreadResources, context: &Arc<TransactionContext>) {
    let resource: ThreadResource = context.clone();
    resources.bind_thread_resource(CONTEXT_RESOURCE_KEY, resource);
    debug!(txn_id = %context.id(), "Bound txn context");
}

/// Remove whatever context is bound to the calling thread
pub fn clear_context(resources: &dyn ThreadResources) {
    if resources.clear_thread_resource(CONTEXT_RESOURCE_KEY) {
        debug!("Unbound txn context");
    }
}

/// Hook object registered with the host for one transaction
pub struct ContextSynchronization {
    context: Arc<TransactionContext>,
    order: i32,
    catch_panics: bool,
}

impl ContextSynchronization {
    /// Create hooks for `context` with the default order
    pub fn new(context: Arc<TransactionContext>) -> Self {
        Self {
            context,
            order: BINDING_SYNCHRONIZATION_ORDER,
            catch_panics: true,
        }
    }

    /// Override the synchronization order
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Choose whether after-completion panics are swallowed
    ///
    /// When not, the first panic is resumed after every listener ran and
    /// the context was unbound.
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// The context these hooks drive
    pub fn context(&self) -> &Arc<TransactionContext> {
        &self.context
    }
}

impl TransactionSynchronization for ContextSynchronization {
    fn order(&self) -> i32 {
        self.order
    }

    fn suspend(&self, resources: &dyn ThreadResources) {
        debug!(txn_id = %self.context.id(), "Suspending transaction: {}", self.context);
        clear_context(resources);
    }

    fn resume(&self, resources: &dyn ThreadResources) {
        debug!(txn_id = %self.context.id(), "Resuming transaction: {}", self.context);
        bind_context(resources, &self.context);
    }

    fn before_commit(&self, read_only: bool, resources: &dyn ThreadResources) -> Result<()> {
        debug!(
            txn_id = %self.context.id(),
            read_only,
            "Before commit: {}",
            self.context
        );
        if bound_context(resources).is_none() {
            return Err(Error::no_synchronization_bound());
        }
        dispatch::before_commit(&self.context, read_only)?;
        Ok(())
    }

    fn before_completion(&self, _resources: &dyn ThreadResources) -> Result<()> {
        debug!(txn_id = %self.context.id(), "Before completion: {}", self.context);
        dispatch::before_completion(&self.context)?;
        Ok(())
    }

    fn after_completion(&self, status: CompletionStatus, resources: &dyn ThreadResources) {
        debug!(
            txn_id = %self.context.id(),
            status = %status,
            "After completion ({}): {}",
            status,
            self.context
        );
        let report = dispatch::after_completion(&self.context, status, self.catch_panics);
        if report.failures > 0 {
            debug!(
                txn_id = %self.context.id(),
                failures = report.failures,
                "after-completion listeners failed"
            );
        }
        clear_context(resources);
        if let Some(payload) = report.panic {
            panic::resume_unwind(payload);
        }
    }
}

impl std::fmt::Debug for ContextSynchronization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSynchronization")
            .field("txn_id", &self.context.id())
            .field("order", &self.order)
            .finish()
    }
}
