//! Error types for adapter resolution, lifecycle and deployment.

use thiserror::Error;

use crate::deployment::DiscoveryError;
use crate::key::Key;
use crate::lifecycle::{LifecycleAction, LifecycleState};

/// Errors raised by component adapters, behaviors and the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{DiError, Key};
///
/// let circular = DiError::Circular(vec![Key::named("a"), Key::named("b"), Key::named("a")]);
/// assert_eq!(circular.to_string(), "Circular dependency: a -> b -> a");
///
/// let missing = DiError::UnsatisfiedDependency {
///     component: Key::named("service"),
///     dependency: Key::named("database"),
/// };
/// assert!(missing.is_unsatisfied());
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Requested key has no registration
    #[error("Component not found: {0}")]
    NotFound(Key),
    /// A declared dependency has no resolvable adapter
    #[error("Unsatisfied dependency: {component} requires {dependency}, which is not registered")]
    UnsatisfiedDependency { component: Key, dependency: Key },
    /// Resolution re-entered a key already in progress (includes path)
    #[error("Circular dependency: {}", format_path(.0))]
    Circular(Vec<Key>),
    /// Maximum nesting depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Invalid lifecycle state transition
    #[error("Invalid lifecycle transition for {subject}: cannot {action} when {from}")]
    LifecycleTransition {
        subject: String,
        from: LifecycleState,
        action: LifecycleAction,
    },
    /// A lifecycle strategy hook reported a failure
    #[error("Lifecycle {action} failed for {key}: {message}")]
    LifecycleHook {
        key: Key,
        action: LifecycleAction,
        message: String,
    },
    /// Composition lookup failed during archive deployment
    #[error(transparent)]
    CompositionDiscovery(#[from] DiscoveryError),
    /// Instance could not be downcast to the requested type
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch { key: Key, expected: &'static str },
    /// Key registered twice
    #[error("Duplicate registration for key: {0}")]
    DuplicateKey(Key),
    /// Registration rejected (e.g. parameter arity mismatch)
    #[error("Invalid registration for {key}: {reason}")]
    InvalidRegistration { key: Key, reason: String },
    /// Constructor reported a failure
    #[error("Construction of {key} failed: {message}")]
    Construction { key: Key, message: String },
    /// Container dropped or disposed while a handle still refers to it
    #[error("Container has been disposed")]
    ContainerDisposed,
    /// Every error collected during a best-effort disposal cascade
    #[error("{} error(s) during disposal: {}", .0.len(), format_errors(.0))]
    Disposal(Vec<DiError>),
    /// Snapshot could not be restored
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    /// Invalid configuration input
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiError {
    /// True for [`DiError::Circular`].
    pub fn is_cyclic(&self) -> bool {
        matches!(self, DiError::Circular(_))
    }

    /// True for [`DiError::UnsatisfiedDependency`].
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self, DiError::UnsatisfiedDependency { .. })
    }

    /// True for [`DiError::LifecycleTransition`].
    pub fn is_lifecycle_transition(&self) -> bool {
        matches!(self, DiError::LifecycleTransition { .. })
    }

    /// Whether both errors belong to the same class (same variant).
    pub fn same_kind(&self, other: &DiError) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

fn format_path(path: &[Key]) -> String {
    path.iter()
        .map(Key::display_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_errors(errors: &[DiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for adapter operations
pub type DiResult<T> = Result<T, DiError>;
