//! Typed resource keys
//!
//! A [`ResourceKey`] names a transaction-scoped resource and carries the
//! type of the value stored under it, so lookups come back typed without
//! casts at the call site.
//!
//! ```
//! use txbind_core::ResourceKey;
//! use std::collections::HashMap;
//!
//! static SEEN: ResourceKey<Vec<u64>> = ResourceKey::new("node.seen");
//! let dynamic: ResourceKey<HashMap<String, u32>> = ResourceKey::named(format!("cache.{}", 7));
//! assert_eq!(SEEN.name(), "node.seen");
//! assert_eq!(dynamic.name(), "cache.7");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

/// Key for a transaction-scoped resource of type `T`
///
/// Identity is the name alone. Binding two different types under the same
/// name is a caller error that surfaces as
/// [`Error::ResourceTypeMismatch`](crate::Error::ResourceTypeMismatch) on
/// lookup.
pub struct ResourceKey<T> {
    name: Cow<'static, str>,
    // fn() -> T keeps the key Send + Sync regardless of T
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    /// Create a key from a static name (usable in `static` items)
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _marker: PhantomData,
        }
    }

    /// Create a key from a runtime name
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Name of the key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the value, for diagnostics
    pub fn value_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ResourceKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for ResourceKey<T> {}

impl<T> std::hash::Hash for ResourceKey<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceKey")
            .field("name", &self.name)
            .field("type", &self.value_type())
            .finish()
    }
}

impl<T> fmt::Display for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
