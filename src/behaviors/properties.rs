//! Registration properties consulted by behavior factories.

use std::collections::BTreeMap;
use std::fmt;

/// A well-known name/value switch, see [`characteristics`](crate::characteristics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristic {
    pub name: &'static str,
    pub value: &'static str,
}

/// Per-registration properties.
///
/// Factories consume the properties they understand. Anything still present
/// after the whole factory chain ran was not understood by any factory and
/// the container rejects the registration.
///
/// ```rust
/// use ferrous_adapters::{characteristics, Properties};
///
/// let mut props = Properties::new().with(characteristics::NO_CACHE);
/// assert!(props.remove_if_present(characteristics::NO_CACHE));
/// assert!(props.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, characteristic: Characteristic) -> Self {
        self.set(characteristic.name, characteristic.value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Whether `characteristic` is set with exactly its value.
    pub fn is_present(&self, characteristic: Characteristic) -> bool {
        self.get(characteristic.name) == Some(characteristic.value)
    }

    /// Consumes `characteristic` if set with exactly its value.
    pub fn remove_if_present(&mut self, characteristic: Characteristic) -> bool {
        if self.is_present(characteristic) {
            self.entries.remove(characteristic.name);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl From<Characteristic> for Properties {
    fn from(characteristic: Characteristic) -> Self {
        Properties::new().with(characteristic)
    }
}

/// Characteristics understood by the built-in behavior factories.
pub mod characteristics {
    use super::Characteristic;

    /// Skip the caching behavior for this registration.
    pub const NO_CACHE: Characteristic = Characteristic { name: "cache", value: "false" };

    /// Request the caching behavior explicitly.
    pub const CACHE: Characteristic = Characteristic { name: "cache", value: "true" };

    /// Request the lifecycle-forcing behavior explicitly.
    pub const AUTOMATIC: Characteristic = Characteristic { name: "automatic", value: "true" };
}
