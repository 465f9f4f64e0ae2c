//! Engine layer for transaction binding
//!
//! The engine is the application-facing entry point:
//! - [`TransactionBinding`]: coordinator over a host transaction manager
//! - [`BindingConfig`]: synchronization order and panic containment
//! - Transactional collections and flags

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod transaction;

pub use config::{BindingConfig, DEFAULT_ORDER_OFFSET};
pub use transaction::{FlagKey, TransactionBinding, TxnList, TxnMap, TxnSet, TxnTreeSet};
