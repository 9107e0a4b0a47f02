//! Component adapters: the uniform contract shared by leaf injectors and
//! the behaviors that decorate them.
//!
//! A registration is a chain of adapters owned outermost-first:
//!
//! ```text
//! Automated ──► Cached ──► ConstructorInjector
//! ```
//!
//! Every link answers the same four questions (which dependencies, verify,
//! produce an instance, participate in lifecycle?). Behaviors forward the
//! dependency questions unchanged and only intercept instance production or
//! lifecycle participation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::error::DiResult;
use crate::implementation::{Arguments, Implementation};
use crate::key::Key;
use crate::parameter::Parameter;
use crate::reference::ReferenceScope;

pub mod context;
mod injector;

pub use context::{ComponentRegistry, ResolutionContext, DEFAULT_MAX_DEPTH};
pub use injector::ConstructorInjector;

/// Type-erased shared instance produced by an adapter.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Identifies which behavior a decorating adapter adds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(tag = "behavior", content = "scope", rename_all = "snake_case"))]
pub enum BehaviorKind {
    /// Stores the first instance in a reference cell of the given scope
    Cached(ReferenceScope),
    /// Hands out a proxy that redirects every call to a per-thread instance
    ThreadLocalized,
    /// Forces lifecycle participation
    Automated,
    /// Any other decorator, e.g. one inserted by a monitor
    Custom(String),
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorKind::Cached(ReferenceScope::Process) => f.write_str("Cached"),
            BehaviorKind::Cached(ReferenceScope::Thread) => f.write_str("ThreadCached"),
            BehaviorKind::ThreadLocalized => f.write_str("ThreadLocalized"),
            BehaviorKind::Automated => f.write_str("Automated"),
            BehaviorKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Produces (or returns a previously produced) instance of one component and
/// exposes that component's declared dependencies.
///
/// Implemented by the leaf [`ConstructorInjector`] and by every behavior in
/// [`behaviors`](crate::behaviors). Behaviors own exactly one delegate, so a
/// chain is a simple linked list that cannot be cyclic: the delegate must
/// exist before the behavior wrapping it can be built.
pub trait ComponentAdapter: Send + Sync {
    /// Registration key.
    fn key(&self) -> &Key;

    /// Implementation this chain ultimately constructs.
    fn implementation(&self) -> &Implementation;

    /// Effective constructor parameters, in order.
    fn parameters(&self) -> &[Parameter];

    /// Resolves every declared dependency through `ctx`, in order.
    ///
    /// Fails with [`DiError::UnsatisfiedDependency`](crate::DiError::UnsatisfiedDependency)
    /// when a dependency key has no adapter and with
    /// [`DiError::Circular`](crate::DiError::Circular) when a key is already
    /// being resolved in `ctx`.
    fn resolve_dependencies(&self, ctx: &mut ResolutionContext) -> DiResult<Arguments>;

    /// Constructs or retrieves the instance.
    fn get_instance(&self, ctx: &mut ResolutionContext) -> DiResult<AnyArc>;

    /// Dry-run of [`get_instance`](Self::get_instance): the same cycle and
    /// missing-dependency checks without constructing anything.
    fn verify(&self, ctx: &mut ResolutionContext) -> DiResult<()>;

    /// Whether instances of this chain receive start/stop/dispose.
    fn has_lifecycle(&self) -> bool;

    /// The behavior this link adds, `None` for leaf adapters.
    fn behavior(&self) -> Option<BehaviorKind> {
        None
    }

    /// The wrapped adapter, `None` for leaf adapters.
    fn delegate(&self) -> Option<&Arc<dyn ComponentAdapter>> {
        None
    }
}

impl fmt::Debug for dyn ComponentAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentAdapter")
            .field("key", self.key())
            .field("chain", &describe_chain(self))
            .finish()
    }
}

/// Behaviors of a chain, outermost first.
pub fn behavior_chain(adapter: &dyn ComponentAdapter) -> Vec<BehaviorKind> {
    let mut kinds = Vec::new();
    let mut current: Option<&dyn ComponentAdapter> = Some(adapter);
    while let Some(link) = current {
        if let Some(kind) = link.behavior() {
            kinds.push(kind);
        }
        current = link.delegate().map(|d| d.as_ref());
    }
    kinds
}

/// Human-readable chain, e.g. `Automated+Cached+ConstructorInjector`.
pub fn describe_chain(adapter: &dyn ComponentAdapter) -> String {
    let mut parts: Vec<String> = behavior_chain(adapter)
        .iter()
        .map(ToString::to_string)
        .collect();
    parts.push("ConstructorInjector".to_string());
    parts.join("+")
}
