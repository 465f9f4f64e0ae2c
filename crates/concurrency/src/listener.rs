//! Transaction listeners and their identity
//!
//! A listener is registered against the current transaction and receives
//! its lifecycle callbacks. Registration is add-once: the registry decides
//! "same listener" from the handle's [`ListenerIdentity`], which is either
//! the allocation of the `Arc` (the default) or a key chosen by the caller.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use txbind_core::ListenerResult;

/// Callbacks tied to a transaction's commit or rollback
///
/// Every hook defaults to a no-op, so implementors override only what they
/// need.
///
/// Failures from `before_commit` and `before_completion` abort the commit.
/// Failures from `after_commit` and `after_rollback` are logged and never
/// stop the remaining listeners.
pub trait TransactionListener: Send + Sync {
    /// Called once on the commit path, while the transaction is still live.
    ///
    /// May register further listeners; those receive their own
    /// `before_commit` within the same phase.
    fn before_commit(&self, _read_only: bool) -> ListenerResult {
        Ok(())
    }

    /// Called once on both paths, before the outcome is known
    fn before_completion(&self) -> ListenerResult {
        Ok(())
    }

    /// Called after a successful commit
    fn after_commit(&self) -> ListenerResult {
        Ok(())
    }

    /// Called after a rollback (or an unknown outcome)
    fn after_rollback(&self) -> ListenerResult {
        Ok(())
    }

    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// What makes two registrations "the same listener"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerIdentity {
    /// Same `Arc` allocation
    Instance(usize),
    /// Same caller-chosen key
    Keyed(Cow<'static, str>),
}

impl fmt::Display for ListenerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerIdentity::Instance(addr) => write!(f, "instance@{:#x}", addr),
            ListenerIdentity::Keyed(key) => write!(f, "key:{}", key),
        }
    }
}

/// A listener plus the identity it is registered under
#[derive(Clone)]
pub struct ListenerHandle {
    identity: ListenerIdentity,
    listener: Arc<dyn TransactionListener>,
}

impl ListenerHandle {
    /// Identify the listener by its allocation
    pub fn new(listener: Arc<dyn TransactionListener>) -> Self {
        // The registry holds the Arc, so the address cannot be reused while registered
        let addr = Arc::as_ptr(&listener) as *const () as usize;
        Self {
            identity: ListenerIdentity::Instance(addr),
            listener,
        }
    }

    /// Identify the listener by a key; later handles with the same key are duplicates
    pub fn keyed(key: impl Into<Cow<'static, str>>, listener: Arc<dyn TransactionListener>) -> Self {
        Self {
            identity: ListenerIdentity::Keyed(key.into()),
            listener,
        }
    }

    /// Registration identity
    pub fn identity(&self) -> &ListenerIdentity {
        &self.identity
    }

    /// The listener itself
    pub fn listener(&self) -> &dyn TransactionListener {
        self.listener.as_ref()
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        self.listener.name()
    }
}

impl<L: TransactionListener + 'static> From<Arc<L>> for ListenerHandle {
    fn from(listener: Arc<L>) -> Self {
        ListenerHandle::new(listener)
    }
}

impl PartialEq for ListenerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for ListenerHandle {}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("identity", &self.identity)
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.identity)
    }
}
