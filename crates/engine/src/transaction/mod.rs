//! Transaction binding for application code
//!
//! This module provides:
//! - `TransactionBinding`: the per-thread coordinator that lazily creates a
//!   context, registers its lifecycle hooks and exposes resources,
//!   listeners, ids and read state
//! - Transactional collection and flag helpers built on the resource store
//!
//! # Architecture
//!
//! The coordinator holds no per-transaction state of its own. Everything
//! lives in the `TransactionContext` bound to the host's thread resources,
//! so a suspended transaction's context is restored exactly as it was
//! when the host resumes it.

pub mod binding;
pub mod helpers;

pub use binding::TransactionBinding;
pub use helpers::{FlagKey, TxnList, TxnMap, TxnSet, TxnTreeSet};
