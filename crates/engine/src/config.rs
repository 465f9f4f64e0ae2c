//! Binding configuration
//!
//! ```ignore
//! use txbind_engine::BindingConfig;
//!
//! // Builder style
//! let config = BindingConfig::new().order_offset(50);
//!
//! // From TOML
//! let config = BindingConfig::from_toml_str("session_order = 500\norder_offset = 10")?;
//! ```

use serde::Deserialize;
use txbind_core::{Error, Result, SESSION_SYNCHRONIZATION_ORDER};

/// Default distance between the binding layer and the session layer
pub const DEFAULT_ORDER_OFFSET: i32 = 100;

/// Configuration for [`TransactionBinding`](crate::TransactionBinding)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Order of the host's session-layer synchronization
    pub session_order: i32,
    /// How far before the session layer the binding hooks run
    pub order_offset: i32,
    /// Swallow panics raised by after-commit / after-rollback listeners
    ///
    /// When false, the first panic is resumed after all listeners ran and
    /// the context was torn down.
    pub catch_listener_panics: bool,
}

impl BindingConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: BindingConfig =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the session-layer order
    pub fn session_order(mut self, order: i32) -> Self {
        self.session_order = order;
        self
    }

    /// Set the offset before the session layer
    pub fn order_offset(mut self, offset: i32) -> Self {
        self.order_offset = offset;
        self
    }

    /// Choose whether after-completion panics are contained
    pub fn catch_listener_panics(mut self, catch: bool) -> Self {
        self.catch_listener_panics = catch;
        self
    }

    /// Order the binding hooks are registered with
    pub fn synchronization_order(&self) -> i32 {
        self.session_order.saturating_sub(self.order_offset)
    }

    /// Reject configurations that would not run before the session layer
    pub fn validate(&self) -> Result<()> {
        if self.order_offset <= 0 {
            return Err(Error::InvalidConfig(format!(
                "order_offset must be positive to run before the session layer, got {}",
                self.order_offset
            )));
        }
        Ok(())
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            session_order: SESSION_SYNCHRONIZATION_ORDER,
            order_offset: DEFAULT_ORDER_OFFSET,
            catch_listener_panics: true,
        }
    }
}
