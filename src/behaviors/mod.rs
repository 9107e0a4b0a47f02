//! Behaviors and the factories that build decorator chains.
//!
//! A factory chain mirrors the adapter chain it produces. Each behavior
//! factory first asks its nested factory for an adapter, then wraps the
//! result and reports the wrap to the monitor:
//!
//! ```rust
//! use ferrous_adapters::{Automating, Caching};
//!
//! // Produces Automated(Cached(ConstructorInjector))
//! let factory = Automating::new().wrap(Caching::new());
//! ```
//!
//! The innermost factory is always [`ConstructorInjection`], which builds
//! the leaf [`ConstructorInjector`](crate::ConstructorInjector).

use std::sync::Arc;

use crate::adapter::{ComponentAdapter, ConstructorInjector};
use crate::error::DiResult;
use crate::implementation::Implementation;
use crate::key::Key;
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::{self, ComponentMonitor};
use crate::parameter::Parameter;

mod automated;
mod cached;
mod properties;
mod thread_local;

pub use automated::{Automated, Automating};
pub use cached::{Cached, Caching};
pub use properties::{characteristics, Characteristic, Properties};
pub use thread_local::{
    InstanceSource, ScopeIsolation, ThreadLocalProxy, ThreadLocalized, ThreadLocalizing,
};

/// Builds adapters for registrations (chain of responsibility).
pub trait ComponentFactory: Send + Sync {
    /// Builds a new chain for `key`.
    #[allow(clippy::too_many_arguments)]
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>>;

    /// Decorates an adapter that was built elsewhere.
    fn add_component_adapter(
        &self,
        _monitor: &Arc<dyn ComponentMonitor>,
        _lifecycle: &Arc<dyn LifecycleStrategy>,
        _properties: &mut Properties,
        adapter: Arc<dyn ComponentAdapter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        Ok(adapter)
    }
}

/// Leaf factory producing [`ConstructorInjector`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstructorInjection;

impl ComponentFactory for ConstructorInjection {
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        _properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        let injector = ConstructorInjector::new(
            key,
            implementation,
            parameters,
            Arc::clone(lifecycle),
            Arc::clone(monitor),
        )?;
        Ok(monitor::new_injector(monitor, Arc::new(injector)))
    }
}

/// Shared delegation logic of behavior factories.
#[derive(Clone)]
pub struct BehaviorFactoryBase {
    delegate: Arc<dyn ComponentFactory>,
}

impl BehaviorFactoryBase {
    pub fn new() -> Self {
        Self {
            delegate: Arc::new(ConstructorInjection),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ComponentFactory>) {
        self.delegate = delegate;
    }

    pub fn delegate(&self) -> &Arc<dyn ComponentFactory> {
        &self.delegate
    }

    pub fn create(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        self.delegate
            .create_component_adapter(monitor, lifecycle, properties, key, implementation, parameters)
    }

    pub fn add(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        adapter: Arc<dyn ComponentAdapter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        self.delegate
            .add_component_adapter(monitor, lifecycle, properties, adapter)
    }
}

impl Default for BehaviorFactoryBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports a freshly wrapped behavior and returns the (possibly substituted) adapter.
pub(crate) fn wrapped(
    monitor: &Arc<dyn ComponentMonitor>,
    behavior: impl ComponentAdapter + 'static,
) -> Arc<dyn ComponentAdapter> {
    monitor::new_behavior(monitor, Arc::new(behavior))
}
