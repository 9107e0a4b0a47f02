use std::sync::Arc;

use crate::adapter::{AnyArc, BehaviorKind, ComponentAdapter, ResolutionContext};
use crate::behaviors::{characteristics, wrapped, BehaviorFactoryBase, ComponentFactory, Properties};
use crate::error::DiResult;
use crate::implementation::{Arguments, Implementation};
use crate::key::Key;
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::ComponentMonitor;
use crate::parameter::Parameter;

/// Behavior that always participates in lifecycle.
///
/// Construction is untouched; only [`has_lifecycle`](ComponentAdapter::has_lifecycle)
/// is overridden. Use it for components the lifecycle strategy would not
/// detect on its own, so that the container starts them eagerly and drives
/// their stop/dispose.
pub struct Automated {
    delegate: Arc<dyn ComponentAdapter>,
}

impl Automated {
    pub fn new(delegate: Arc<dyn ComponentAdapter>) -> Self {
        Self { delegate }
    }
}

impl ComponentAdapter for Automated {
    fn key(&self) -> &Key {
        self.delegate.key()
    }

    fn implementation(&self) -> &Implementation {
        self.delegate.implementation()
    }

    fn parameters(&self) -> &[Parameter] {
        self.delegate.parameters()
    }

    fn resolve_dependencies(&self, ctx: &mut ResolutionContext) -> DiResult<Arguments> {
        self.delegate.resolve_dependencies(ctx)
    }

    fn get_instance(&self, ctx: &mut ResolutionContext) -> DiResult<AnyArc> {
        self.delegate.get_instance(ctx)
    }

    fn verify(&self, ctx: &mut ResolutionContext) -> DiResult<()> {
        self.delegate.verify(ctx)
    }

    fn has_lifecycle(&self) -> bool {
        true
    }

    fn behavior(&self) -> Option<BehaviorKind> {
        Some(BehaviorKind::Automated)
    }

    fn delegate(&self) -> Option<&Arc<dyn ComponentAdapter>> {
        Some(&self.delegate)
    }
}

/// Factory for [`Automated`]. Wraps every registration.
#[derive(Clone, Default)]
pub struct Automating {
    base: BehaviorFactoryBase,
}

impl Automating {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nests `inner` inside this factory.
    pub fn wrap(mut self, inner: impl ComponentFactory + 'static) -> Self {
        self.base.set_delegate(Arc::new(inner));
        self
    }
}

impl ComponentFactory for Automating {
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        properties.remove_if_present(characteristics::AUTOMATIC);
        let delegate = self
            .base
            .create(monitor, lifecycle, properties, key, implementation, parameters)?;
        Ok(wrapped(monitor, Automated::new(delegate)))
    }

    fn add_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        adapter: Arc<dyn ComponentAdapter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        properties.remove_if_present(characteristics::AUTOMATIC);
        let delegate = self.base.add(monitor, lifecycle, properties, adapter)?;
        Ok(wrapped(monitor, Automated::new(delegate)))
    }
}
