//! Core types for transaction binding
//!
//! This module defines the fundamental types used throughout the system:
//! - [`TxnId`]: Unique identifier for one transaction context
//! - [`TxnReadState`]: Read-write state of the ambient transaction
//! - [`CompletionStatus`]: Outcome reported to after-completion hooks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall-clock instant a transaction context was created
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a transaction context
///
/// Generated when the context is first created inside a transaction and
/// stable for its lifetime. Nested and sibling transactions always get
/// distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnId(Uuid);

impl TxnId {
    /// Create a new random TxnId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use txbind_core::TxnId;
    ///
    /// let id1 = TxnId::new();
    /// let id2 = TxnId::new();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn new() -> Self {
        TxnId(Uuid::new_v4())
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TxnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-write state of the current transaction
///
/// Derived purely from the host's ambient flags; querying it never creates
/// a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnReadState {
    /// No transaction is active
    None,
    /// The current transaction is read-only
    ReadOnly,
    /// The current transaction supports writes
    ReadWrite,
}

impl TxnReadState {
    /// Derive the state from the host's two ambient flags
    pub fn from_flags(active: bool, read_only: bool) -> Self {
        match (active, read_only) {
            (false, _) => TxnReadState::None,
            (true, true) => TxnReadState::ReadOnly,
            (true, false) => TxnReadState::ReadWrite,
        }
    }

    /// Check if a transaction is active at all
    pub fn is_active(&self) -> bool {
        !matches!(self, TxnReadState::None)
    }
}

impl std::fmt::Display for TxnReadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxnReadState::None => write!(f, "none"),
            TxnReadState::ReadOnly => write!(f, "read-only"),
            TxnReadState::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Outcome passed to after-completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Transaction committed
    Committed,
    /// Transaction rolled back
    RolledBack,
    /// Outcome could not be determined (heuristic completion)
    Unknown,
}

impl CompletionStatus {
    /// Check if the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, CompletionStatus::Committed)
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionStatus::Committed => write!(f, "committed"),
            CompletionStatus::RolledBack => write!(f, "rolled-back"),
            CompletionStatus::Unknown => write!(f, "unknown"),
        }
    }
}
