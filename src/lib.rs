//! # txbind
//!
//! Transaction-scoped resource binding and ordered lifecycle listeners.
//!
//! txbind gives application code a per-transaction scratch space and a way
//! to react to commit and rollback, on top of whatever transaction manager
//! the host already runs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txbind::prelude::*;
//!
//! const CACHE: ResourceKey<TxnMap<u64, String>> = ResourceKey::new("cache");
//!
//! let host = Arc::new(LocalTransactionManager::new());
//! let binding = TransactionBinding::new(host.clone());
//!
//! host.execute(&TransactionDefinition::required(), |_| {
//!     // Resources live exactly as long as the transaction
//!     binding.get_map(&CACHE)?.lock().insert(1, "one".into());
//!
//!     // Listeners hear about commit or rollback
//!     binding.bind_listener(Arc::new(FlushOnCommit))?;
//!     Ok::<_, Error>(())
//! })?;
//! ```
//!
//! ## Layers
//!
//! - `txbind-core`: errors, ids, typed keys and the host boundary traits
//! - `txbind-concurrency`: per-transaction context, listener dispatch and
//!   the in-process [`LocalTransactionManager`]
//! - `txbind-engine`: the [`TransactionBinding`] coordinator and its helpers

#![warn(missing_docs)]

pub mod prelude;

// Re-export main entry points
pub use txbind_engine::{BindingConfig, TransactionBinding};
pub use txbind_core::{Error, Result, BINDING_SYNCHRONIZATION_ORDER, SESSION_SYNCHRONIZATION_ORDER};

// Re-export listener and host types
pub use txbind_concurrency::{
    ListenerHandle, LocalTransactionManager, Propagation, TransactionContext,
    TransactionDefinition, TransactionListener, TransactionStatus,
};

// Re-export host boundary traits
pub use txbind_core::{ThreadResources, TransactionHost, TransactionSynchronization};

// Re-export types
pub use txbind_core::{
    CompletionStatus, ListenerError, ListenerResult, ResourceKey, Timestamp, TxnId, TxnReadState,
};
pub use txbind_engine::{FlagKey, TxnList, TxnMap, TxnSet, TxnTreeSet};
