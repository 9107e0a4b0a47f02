use std::sync::Arc;

use crate::adapter::{AnyArc, BehaviorKind, ComponentAdapter, ResolutionContext};
use crate::behaviors::{characteristics, wrapped, BehaviorFactoryBase, ComponentFactory, Properties};
use crate::error::DiResult;
use crate::implementation::{Arguments, Implementation};
use crate::key::Key;
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::ComponentMonitor;
use crate::parameter::Parameter;
use crate::reference::{InitRequest, ObjectReference, SimpleReference, ThreadLocalReference};

/// Behavior storing the first instance its delegate produces.
///
/// The storage cell is injected: with a [`SimpleReference`] this is a
/// process-wide singleton, with a [`ThreadLocalReference`] a per-thread one.
/// Instances stored here are reported to the registry so the container can
/// drive their lifecycle.
pub struct Cached {
    delegate: Arc<dyn ComponentAdapter>,
    reference: Arc<dyn ObjectReference>,
}

impl Cached {
    pub fn new(delegate: Arc<dyn ComponentAdapter>, reference: Arc<dyn ObjectReference>) -> Self {
        Self { delegate, reference }
    }

    /// Caches process-wide.
    pub fn process_wide(delegate: Arc<dyn ComponentAdapter>) -> Self {
        Self::new(delegate, Arc::new(SimpleReference::new()))
    }

    pub fn reference(&self) -> &Arc<dyn ObjectReference> {
        &self.reference
    }

    /// Empties the cell for the calling scope unit.
    ///
    /// The next [`get_instance`](ComponentAdapter::get_instance) builds a new
    /// instance. The flushed instance is returned so the caller can release it.
    pub fn flush(&self) -> Option<AnyArc> {
        self.reference.clear()
    }
}

impl ComponentAdapter for Cached {
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
        if let Some(existing) = self.reference.get() {
            return Ok(existing);
        }
        let request = InitRequest::new(self.key().clone(), ctx.in_progress());
        let mut created = false;
        let instance = self.reference.get_or_try_init(&request, &mut || {
            created = true;
            self.delegate.get_instance(ctx)
        })?;
        if created {
            if let Err(err) = ctx.instance_created(self.key(), &instance) {
                // Never hand out an instance whose start failed
                self.reference.clear();
                return Err(err);
            }
        }
        Ok(instance)
    }

    fn verify(&self, ctx: &mut ResolutionContext) -> DiResult<()> {
        self.delegate.verify(ctx)
    }

    fn has_lifecycle(&self) -> bool {
        self.delegate.has_lifecycle()
    }

    fn behavior(&self) -> Option<BehaviorKind> {
        Some(BehaviorKind::Cached(self.reference.scope()))
    }

    fn delegate(&self) -> Option<&Arc<dyn ComponentAdapter>> {
        Some(&self.delegate)
    }
}

type ReferenceMaker = Arc<dyn Fn() -> Arc<dyn ObjectReference> + Send + Sync>;

/// Factory for [`Cached`].
///
/// Honors [`characteristics::NO_CACHE`] by leaving the delegate unwrapped.
#[derive(Clone)]
pub struct Caching {
    base: BehaviorFactoryBase,
    reference: ReferenceMaker,
}

impl Caching {
    /// Process-wide caching.
    pub fn new() -> Self {
        Self::with_reference(|| Arc::new(SimpleReference::new()))
    }

    /// Per-thread caching.
    pub fn thread_local() -> Self {
        Self::with_reference(|| Arc::new(ThreadLocalReference::new()))
    }

    /// Caching with a custom storage cell; `make` runs once per registration.
    pub fn with_reference<F>(make: F) -> Self
    where
        F: Fn() -> Arc<dyn ObjectReference> + Send + Sync + 'static,
    {
        Self {
            base: BehaviorFactoryBase::new(),
            reference: Arc::new(make),
        }
    }

    /// Nests `inner` inside this factory.
    pub fn wrap(mut self, inner: impl ComponentFactory + 'static) -> Self {
        self.base.set_delegate(Arc::new(inner));
        self
    }

    fn decorate(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        delegate: Arc<dyn ComponentAdapter>,
    ) -> Arc<dyn ComponentAdapter> {
        wrapped(monitor, Cached::new(delegate, (self.reference)()))
    }
}

impl Default for Caching {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentFactory for Caching {
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        if properties.remove_if_present(characteristics::NO_CACHE) {
            return self
                .base
                .create(monitor, lifecycle, properties, key, implementation, parameters);
        }
        properties.remove_if_present(characteristics::CACHE);
        let delegate = self
            .base
            .create(monitor, lifecycle, properties, key, implementation, parameters)?;
        Ok(self.decorate(monitor, delegate))
    }

    fn add_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        adapter: Arc<dyn ComponentAdapter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        if properties.remove_if_present(characteristics::NO_CACHE) {
            return self.base.add(monitor, lifecycle, properties, adapter);
        }
        properties.remove_if_present(characteristics::CACHE);
        let delegate = self.base.add(monitor, lifecycle, properties, adapter)?;
        Ok(self.decorate(monitor, delegate))
    }
}
