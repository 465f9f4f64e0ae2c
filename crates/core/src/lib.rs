//! Core types for transaction-scoped binding
//!
//! This crate defines the vocabulary shared by every other layer:
//! - [`TxnId`]: Unique identifier for one transaction on one thread
//! - [`TxnReadState`] / [`CompletionStatus`]: ambient transaction state
//! - [`ResourceKey`]: typed key for transaction-scoped resources
//! - [`traits`]: the boundary contracts with the host transaction manager
//! - [`error`]: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod traits;
pub mod types;

pub use error::{current_thread_label, Error, ListenerError, ListenerResult, Result};
pub use key::ResourceKey;
pub use traits::{ThreadResource, ThreadResources, TransactionHost, TransactionSynchronization};
pub use types::{CompletionStatus, Timestamp, TxnId, TxnReadState};

/// Synchronization order of the host's session layer (ORM session cleanup).
pub const SESSION_SYNCHRONIZATION_ORDER: i32 = 1000;

/// Default order of the binding layer: strictly before session cleanup.
pub const BINDING_SYNCHRONIZATION_ORDER: i32 = SESSION_SYNCHRONIZATION_ORDER - 100;
