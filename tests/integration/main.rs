//! Transaction Binding Integration Suite
//!
//! Drives `TransactionBinding` through the in-process
//! `LocalTransactionManager` and checks the externally visible lifecycle:
//!
//! 1. Resources live exactly as long as their transaction
//! 2. Listeners fire once per phase, in registration order
//! 3. Listeners added during before-commit still get before-commit
//! 4. Nested transactions are isolated and the outer one is restored
//! 5. Threads never see each other's transactions
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # Listener dispatch only
//! cargo test --test integration listeners::
//! ```

mod common;

mod config;
mod nesting;
mod resources;
mod threads;
