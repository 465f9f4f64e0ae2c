//! Convenient imports for txbind.
//!
//! ```ignore
//! use txbind::prelude::*;
//!
//! let host = Arc::new(LocalTransactionManager::new());
//! let binding = TransactionBinding::new(host);
//! ```

// Main entry point
pub use crate::{BindingConfig, TransactionBinding};

// Error handling
pub use crate::{Error, ListenerError, ListenerResult, Result};

// Listeners
pub use crate::{ListenerHandle, TransactionListener};

// Reference host
pub use crate::{LocalTransactionManager, Propagation, TransactionDefinition, TransactionStatus};

// Core types
pub use crate::{CompletionStatus, ResourceKey, Timestamp, TxnId, TxnReadState};

// Collections
pub use crate::{FlagKey, TxnList, TxnMap, TxnSet, TxnTreeSet};

pub use std::sync::Arc;
