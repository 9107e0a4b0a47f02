//! Component keys for adapter registration and lookup.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Key identifying one component registration.
///
/// Keys are opaque to the adapter core: they only need to be hashable,
/// comparable and printable. Two flavours are supported, mirroring how
/// components are usually registered:
///
/// - **Type**: keyed by the Rust type (or trait object type) the component is
///   published under. Equality and hashing only look at the `TypeId`; the
///   name is kept for diagnostics.
/// - **Named**: keyed by an arbitrary string, for registrations where several
///   components share a type.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{Key, key_of_type};
///
/// struct Database;
///
/// let by_type = key_of_type::<Database>();
/// let by_name = Key::named("primary-db");
///
/// assert_eq!(by_type, key_of_type::<Database>());
/// assert_ne!(by_type, by_name);
/// assert_eq!(by_name.display_name(), "primary-db");
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Type key with `TypeId` and type name for diagnostics
    Type(TypeId, &'static str),
    /// String key
    Named(Arc<str>),
}

impl Key {
    /// Creates a named key.
    pub fn named(name: impl AsRef<str>) -> Self {
        Key::Named(Arc::from(name.as_ref()))
    }

    /// Human-readable name used in error paths and log output.
    pub fn display_name(&self) -> &str {
        match self {
            Key::Type(_, name) => name,
            Key::Named(name) => name,
        }
    }

    /// Returns the `TypeId` for type keys.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Key::Type(id, _) => Some(*id),
            Key::Named(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// TypeId-only comparison for type keys, the name is diagnostic only
impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Named(a), Key::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a.cmp(b),
            (Key::Named(a), Key::Named(b)) => a.cmp(b),
            (Key::Type(_, _), Key::Named(_)) => Ordering::Less,
            (Key::Named(_), Key::Type(_, _)) => Ordering::Greater,
        }
    }
}

impl std::hash::Hash for Key {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::named(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Named(Arc::from(name))
    }
}

/// Creates the type key for `T`.
#[inline]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}
