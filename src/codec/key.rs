//! Storage Key Construction
//!
//! Every logical entry is addressed by a name and an optional namespace.
//! The backing store only knows flat string keys, so the pair is joined as
//! `namespace-name` (or just `name` when there is no namespace).
//!
//! ## Collisions
//!
//! The join is not escaped. A namespace or name that itself contains the
//! separator can alias another pair:
//!
//! ```text
//! ("b-c", ns "a")   ──┐
//!                     ├──>  "a-b-c"
//! ("c",   ns "a-b") ──┘
//! ```
//!
//! Callers that need strict isolation must keep `-` out of their namespaces.

use std::fmt;

/// Separator placed between namespace and name.
pub const KEY_SEPARATOR: char = '-';

/// Builds the concrete backing-store key for a name and optional namespace.
///
/// An empty namespace is treated the same as no namespace.
///
/// # Example
///
/// ```
/// use flashstore::codec::build_key;
///
/// assert_eq!(build_key("theme", None), "theme");
/// assert_eq!(build_key("theme", Some("user")), "user-theme");
/// assert_eq!(build_key("theme", Some("")), "theme");
/// ```
pub fn build_key(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => {
            let mut key = String::with_capacity(ns.len() + 1 + name.len());
            key.push_str(ns);
            key.push(KEY_SEPARATOR);
            key.push_str(name);
            key
        }
        _ => name.to_string(),
    }
}

/// A logical key: a name plus an optional namespace.
///
/// Facade operations accept anything convertible into a `LogicalKey`, so a
/// bare `&str` addresses an un-namespaced entry.
///
/// ```
/// use flashstore::codec::LogicalKey;
///
/// let key = LogicalKey::new("cart").in_namespace("shop");
/// assert_eq!(key.storage_key(), "shop-cart");
///
/// let plain: LogicalKey = "cart".into();
/// assert_eq!(plain.storage_key(), "cart");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalKey {
    name: String,
    namespace: Option<String>,
}

impl LogicalKey {
    /// Creates a key without a namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Places the key in a namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the concrete key used in the backing store.
    pub fn storage_key(&self) -> String {
        build_key(&self.name, self.namespace.as_deref())
    }
}

impl From<&str> for LogicalKey {
    fn from(name: &str) -> Self {
        LogicalKey::new(name)
    }
}

impl From<String> for LogicalKey {
    fn from(name: String) -> Self {
        LogicalKey::new(name)
    }
}

impl From<&LogicalKey> for LogicalKey {
    fn from(key: &LogicalKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
