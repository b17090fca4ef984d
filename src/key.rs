//! Dependency identification keys.
//!
//! A dependency is addressed either by a [`Key`] (a named token, for
//! values that are not naturally a type — a capability like `"hash"` or
//! a plain configuration string) or by a Rust type via
//! [`DependencyKey::of`]. Both flavours collapse into [`DependencyKey`],
//! the index type of the registry.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A named dependency token.
///
/// Use a `Key` when the thing being injected is not naturally identified
/// by a type — for instance a `"hash"` capability bound to a function,
/// or two differently-configured values of the same type.
///
/// Two keys are equal iff their labels are equal. Immutable once created.
///
/// # Examples
///
/// ```rust
/// use keywire::Key;
///
/// let a = Key::new("hash");
/// let b = Key::new("hash");
/// assert_eq!(a, b);
/// assert_ne!(a, Key::new("digest"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    label: Arc<str>,
}

impl Key {
    /// Create a key from a label.
    #[inline]
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The identifying label.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.label).finish()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl From<&str> for Key {
    #[inline]
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Key {
    #[inline]
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

/// The index type of the registry: either a named token or a type.
///
/// Equality and hashing for the `Type` case use only the `TypeId`; the
/// type name is carried for error messages.
///
/// # Examples
///
/// ```rust
/// use keywire::{DependencyKey, Key};
///
/// struct Conn;
///
/// let by_type = DependencyKey::of::<Conn>();
/// let by_name: DependencyKey = Key::new("conn").into();
/// assert_ne!(by_type, by_name);
/// ```
#[derive(Clone)]
pub enum DependencyKey {
    /// A string-labelled token.
    Named(Key),
    /// A first-class type identifier.
    Type {
        /// Identity used for equality and hashing.
        id: TypeId,
        /// Human-readable name, used in diagnostics only.
        name: &'static str,
    },
}

impl DependencyKey {
    /// Key for the type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Key for a named token.
    #[inline]
    pub fn named(label: impl Into<Arc<str>>) -> Self {
        Self::Named(Key::new(label))
    }

    /// True for the `Named` case.
    #[inline]
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named(a), Self::Named(b)) => a == b,
            (Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Named(key) => {
                0u8.hash(state);
                key.hash(state);
            }
            Self::Type { id, .. } => {
                1u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(key) => f.debug_tuple("Named").field(&key.label()).finish(),
            Self::Type { name, .. } => f.debug_tuple("Type").field(name).finish(),
        }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(key) => write!(f, "'{}'", key.label()),
            Self::Type { name, .. } => f.write_str(name),
        }
    }
}

impl From<Key> for DependencyKey {
    #[inline]
    fn from(key: Key) -> Self {
        Self::Named(key)
    }
}

impl From<&Key> for DependencyKey {
    #[inline]
    fn from(key: &Key) -> Self {
        Self::Named(key.clone())
    }
}

impl From<&str> for DependencyKey {
    #[inline]
    fn from(label: &str) -> Self {
        Self::named(label)
    }
}

impl From<String> for DependencyKey {
    #[inline]
    fn from(label: String) -> Self {
        Self::named(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::RandomState;
    use std::hash::BuildHasher;

    struct Conn;
    struct Other;

    #[test]
    fn named_keys_equal_by_label() {
        assert_eq!(DependencyKey::named("redis"), DependencyKey::named("redis"));
        assert_ne!(DependencyKey::named("redis"), DependencyKey::named("pg"));
    }

    #[test]
    fn type_keys_equal_by_type() {
        assert_eq!(DependencyKey::of::<Conn>(), DependencyKey::of::<Conn>());
        assert_ne!(DependencyKey::of::<Conn>(), DependencyKey::of::<Other>());
    }

    #[test]
    fn named_never_equals_type() {
        assert_ne!(DependencyKey::named("Conn"), DependencyKey::of::<Conn>());
    }

    #[test]
    fn equal_keys_hash_equal() {
        let hasher = RandomState::new();
        let a = DependencyKey::named("hash");
        let b = DependencyKey::named("hash");
        assert_eq!(hasher.hash_one(&a), hasher.hash_one(&b));
    }

    #[test]
    fn display_formats() {
        assert_eq!(DependencyKey::named("hash").to_string(), "'hash'");
        assert!(DependencyKey::of::<Conn>().to_string().contains("Conn"));
    }
}
