//! Explicit constructor parameters for component registrations.

use std::sync::Arc;

#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::adapter::AnyArc;
use crate::key::Key;

/// A literal value supplied in place of a resolved dependency.
///
/// Constants resolve to `Arc<bool>`, `Arc<i64>`, `Arc<f64>` or `Arc<String>`
/// inside the constructor's [`Arguments`](crate::Arguments).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(tag = "type", content = "value", rename_all = "snake_case"))]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstantValue {
    pub(crate) fn to_instance(&self) -> AnyArc {
        match self {
            ConstantValue::Bool(b) => Arc::new(*b),
            ConstantValue::Int(i) => Arc::new(*i),
            ConstantValue::Float(f) => Arc::new(*f),
            ConstantValue::Str(s) => Arc::new(s.clone()),
        }
    }
}

/// One position of a constructor's argument list.
///
/// An empty parameter list at registration means "use the declared
/// dependency signature of the implementation". A non-empty list replaces
/// the signature position by position and must have the same arity.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{Key, Parameter, ConstantValue, key_of_type};
///
/// struct Database;
///
/// let params = vec![
///     Parameter::component(key_of_type::<Database>()),
///     Parameter::constant(ConstantValue::Int(8080)),
/// ];
/// assert_eq!(params[0].key(), Some(&key_of_type::<Database>()));
/// assert_eq!(params[1].key(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// Resolve the component registered under this key
    Component(Key),
    /// Use a literal value
    Constant(ConstantValue),
}

impl Parameter {
    pub fn component(key: impl Into<Key>) -> Self {
        Parameter::Component(key.into())
    }

    pub fn constant(value: ConstantValue) -> Self {
        Parameter::Constant(value)
    }

    /// The dependency key, if this parameter refers to another component.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Parameter::Component(key) => Some(key),
            Parameter::Constant(_) => None,
        }
    }
}

impl From<Key> for Parameter {
    fn from(key: Key) -> Self {
        Parameter::Component(key)
    }
}
