//! Monitors: reporting sinks for adapter, lifecycle and deployment events.
//!
//! Monitors observe; they never decide outcomes. The only influence a
//! [`ComponentMonitor`] has is substitution at wrap time via
//! [`new_injector`](ComponentMonitor::new_injector) and
//! [`new_behavior`](ComponentMonitor::new_behavior), which allows a monitor
//! to insert instrumenting adapters into a chain.
//!
//! Every callback is invoked behind a panic guard. A monitor that panics is
//! reported to stderr and otherwise ignored.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::ComponentAdapter;
use crate::deployment::DiscoveryError;
use crate::error::DiError;
use crate::implementation::ImplementationType;
use crate::internal::guard;
use crate::key::Key;
use crate::lifecycle::LifecycleAction;

mod logging;

pub use logging::LoggingMonitor;

/// Observer of adapter creation, behavior wrapping and instance lifecycle.
///
/// All methods have no-op defaults.
///
/// # Examples
///
/// ```
/// use ferrous_adapters::{ComponentMonitor, ImplementationType, Key};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingMonitor {
///     built: AtomicUsize,
/// }
///
/// impl ComponentMonitor for CountingMonitor {
///     fn instantiated(&self, _key: &Key, _ty: &ImplementationType, _elapsed: Duration) {
///         self.built.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait ComponentMonitor: Send + Sync {
    /// A leaf adapter was created. Returning a different adapter substitutes it.
    fn new_injector(&self, adapter: Arc<dyn ComponentAdapter>) -> Arc<dyn ComponentAdapter> {
        adapter
    }

    /// A behavior was wrapped around a chain. Returning a different adapter substitutes it.
    fn new_behavior(&self, adapter: Arc<dyn ComponentAdapter>) -> Arc<dyn ComponentAdapter> {
        adapter
    }

    /// A leaf adapter constructed an instance.
    fn instantiated(&self, _key: &Key, _ty: &ImplementationType, _elapsed: Duration) {}

    /// Dependency resolution or construction failed.
    fn instantiation_failed(&self, _key: &Key, _ty: &ImplementationType, _error: &DiError) {}

    /// A lifecycle hook failed during a container transition.
    fn lifecycle_invocation_failed(&self, _key: &Key, _action: LifecycleAction, _error: &DiError) {}
}

/// Observer of archive deployments.
///
/// `archive` is `None` when the deployment has no backing location.
pub trait DeploymentMonitor: Send + Sync {
    fn deploy_success(&self, _archive: Option<&Path>, _description: &str, _elapsed: Duration) {}

    fn error_performing_deploy(&self, _archive: Option<&Path>, _error: &DiError) {}

    fn no_composition_found(&self, _archive: Option<&Path>, _name: &str, _error: &DiscoveryError) {}

    fn composition_wrong_type(&self, _archive: Option<&Path>, _name: &str, _expected: &str) {}
}

/// Monitor that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl ComponentMonitor for NullMonitor {}

impl DeploymentMonitor for NullMonitor {}

/// Reports a new leaf adapter, keeping the original if the monitor panics.
pub(crate) fn new_injector(
    monitor: &Arc<dyn ComponentMonitor>,
    adapter: Arc<dyn ComponentAdapter>,
) -> Arc<dyn ComponentAdapter> {
    guard::substitute("new_injector", adapter, |a| monitor.new_injector(a))
}

/// Reports a behavior wrap, keeping the original if the monitor panics.
pub(crate) fn new_behavior(
    monitor: &Arc<dyn ComponentMonitor>,
    adapter: Arc<dyn ComponentAdapter>,
) -> Arc<dyn ComponentAdapter> {
    guard::substitute("new_behavior", adapter, |a| monitor.new_behavior(a))
}
