//! Per-thread isolation of component instances.
//!
//! Two mutually exclusive modes, chosen with [`ScopeIsolation`]:
//!
//! - [`ScopeIsolation::ScopeEnsuresIsolation`] wraps the delegate in a
//!   [`Cached`] with a [`ThreadLocalReference`]. Whoever resolves the
//!   component gets the instance of the resolving thread. This is only
//!   correct when every consumer resolves on the thread that uses the
//!   result: an instance captured as a dependency of a process-wide cached
//!   component stays frozen in that component, whichever thread later reads
//!   it.
//! - [`ScopeIsolation::AlwaysIsolate`] (the default) wraps the delegate in a
//!   [`ThreadLocalized`], which hands out one shared [`ThreadLocalProxy`].
//!   Every access through the proxy is routed to the calling thread's own
//!   instance, no matter who holds the proxy.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::adapter::{AnyArc, BehaviorKind, ComponentAdapter, ComponentRegistry, ResolutionContext};
use crate::behaviors::{wrapped, BehaviorFactoryBase, Cached, ComponentFactory, Properties};
use crate::error::{DiError, DiResult};
use crate::implementation::{Arguments, Implementation};
use crate::key::Key;
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::ComponentMonitor;
use crate::parameter::Parameter;
use crate::reference::{InitRequest, ObjectReference, ThreadLocalReference};

/// Selects how [`ThreadLocalizing`] isolates instances per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(rename_all = "kebab-case"))]
pub enum ScopeIsolation {
    /// Thread-local cache; relies on callers resolving on the consuming thread
    ScopeEnsuresIsolation,
    /// Proxy redirecting every access to the calling thread's instance
    #[default]
    AlwaysIsolate,
}

impl From<bool> for ScopeIsolation {
    /// `true` selects [`AlwaysIsolate`](ScopeIsolation::AlwaysIsolate).
    fn from(always_isolate: bool) -> Self {
        if always_isolate {
            ScopeIsolation::AlwaysIsolate
        } else {
            ScopeIsolation::ScopeEnsuresIsolation
        }
    }
}

/// Call-time source of the instance a [`ThreadLocalProxy`] targets.
pub trait InstanceSource: Send + Sync {
    /// Key of the component being proxied.
    fn key(&self) -> &Key;

    /// Instance for the calling thread, created on first access.
    fn current(&self) -> DiResult<AnyArc>;

    /// Forgets the calling thread's instance, returning it.
    fn release(&self) -> Option<AnyArc>;
}

/// Shared handle whose every access resolves to the calling thread's instance.
///
/// This is what a [`ThreadLocalized`] component resolves to, both for direct
/// lookups and when injected as a dependency: constructors of dependents
/// take `ThreadLocalProxy<T>`, not `T`. Identity-sensitive use (comparing
/// the targets of two threads, holding on to a target) is outside what the
/// proxy guarantees.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{Container, Implementation, ThreadLocalProxy, ThreadLocalizing, key_of_type};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct RequestBuffer { id: usize }
/// static NEXT: AtomicUsize = AtomicUsize::new(0);
///
/// let container = Container::builder().factory(ThreadLocalizing::new()).build();
/// container
///     .add_component(
///         key_of_type::<RequestBuffer>(),
///         Implementation::of(|_| Ok(RequestBuffer { id: NEXT.fetch_add(1, Ordering::SeqCst) })),
///         vec![],
///     )
///     .unwrap();
///
/// let proxy = container
///     .get::<ThreadLocalProxy<RequestBuffer>>(&key_of_type::<RequestBuffer>())
///     .unwrap();
/// let here = proxy.with(|buf| buf.id).unwrap();
/// let there = std::thread::scope(|s| s.spawn(|| proxy.with(|buf| buf.id).unwrap()).join().unwrap());
/// assert_ne!(here, there);
/// ```
pub struct ThreadLocalProxy<T> {
    source: Arc<dyn InstanceSource>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ThreadLocalProxy<T> {
    pub(crate) fn new(source: Arc<dyn InstanceSource>) -> Self {
        Self {
            source,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &Key {
        self.source.key()
    }

    /// The calling thread's instance.
    pub fn try_target(&self) -> DiResult<Arc<T>> {
        self.source
            .current()?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch {
                key: self.source.key().clone(),
                expected: type_name::<T>(),
            })
    }

    /// Runs `f` against the calling thread's instance.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> DiResult<R> {
        let target = self.try_target()?;
        Ok(f(&target))
    }

    /// Drops the calling thread's instance; the next access builds a new one.
    ///
    /// Other threads keep their instances. The returned instance is still
    /// lifecycle-managed; pass it to [`Container::release`](crate::Container::release)
    /// to stop and dispose it now.
    pub fn reset(&self) -> Option<AnyArc> {
        self.source.release()
    }
}

impl<T> Clone for ThreadLocalProxy<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ThreadLocalProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocalProxy")
            .field("key", self.source.key())
            .field("target", &type_name::<T>())
            .finish()
    }
}

struct LocalizedSource {
    key: Key,
    delegate: Arc<dyn ComponentAdapter>,
    reference: Arc<ThreadLocalReference>,
    registry: Weak<dyn ComponentRegistry>,
    max_depth: usize,
}

impl InstanceSource for LocalizedSource {
    fn key(&self) -> &Key {
        &self.key
    }

    fn current(&self) -> DiResult<AnyArc> {
        if let Some(existing) = self.reference.get() {
            return Ok(existing);
        }
        let registry = self.registry.upgrade().ok_or(DiError::ContainerDisposed)?;
        // Fresh context: dependencies are resolved on the calling thread
        let mut ctx = ResolutionContext::new(registry).with_max_depth(self.max_depth);

        let request = InitRequest::new(self.key.clone(), &[self.key.clone()]);
        let mut created = false;
        let instance = self.reference.get_or_try_init(&request, &mut || {
            created = true;
            ctx.resolve_adapter(self.delegate.as_ref())
        })?;
        if created {
            if let Err(err) = ctx.instance_created(&self.key, &instance) {
                self.reference.clear();
                return Err(err);
            }
        }
        Ok(instance)
    }

    fn release(&self) -> Option<AnyArc> {
        self.reference.clear()
    }
}

/// Behavior handing out a [`ThreadLocalProxy`] that isolates per thread.
pub struct ThreadLocalized {
    delegate: Arc<dyn ComponentAdapter>,
    reference: Arc<ThreadLocalReference>,
    proxy: OnceCell<AnyArc>,
}

impl ThreadLocalized {
    pub fn new(delegate: Arc<dyn ComponentAdapter>) -> Self {
        Self {
            delegate,
            reference: Arc::new(ThreadLocalReference::new()),
            proxy: OnceCell::new(),
        }
    }

    /// Drops the calling thread's instance without touching the proxy.
    pub fn flush(&self) -> Option<AnyArc> {
        self.reference.clear()
    }
}

impl ComponentAdapter for ThreadLocalized {
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
        let proxy = self.proxy.get_or_try_init(|| {
            // Targets are built lazily per thread, so surface graph errors now
            self.delegate.verify(ctx)?;
            let source = LocalizedSource {
                key: self.delegate.key().clone(),
                delegate: Arc::clone(&self.delegate),
                reference: Arc::clone(&self.reference),
                registry: ctx.registry_weak(),
                max_depth: ctx.max_depth(),
            };
            Ok::<_, DiError>(self.delegate.implementation().make_proxy(Arc::new(source)))
        })?;
        Ok(Arc::clone(proxy))
    }

    fn verify(&self, ctx: &mut ResolutionContext) -> DiResult<()> {
        self.delegate.verify(ctx)
    }

    fn has_lifecycle(&self) -> bool {
        self.delegate.has_lifecycle()
    }

    fn behavior(&self) -> Option<BehaviorKind> {
        Some(BehaviorKind::ThreadLocalized)
    }

    fn delegate(&self) -> Option<&Arc<dyn ComponentAdapter>> {
        Some(&self.delegate)
    }
}

/// Factory for per-thread isolation in either [`ScopeIsolation`] mode.
#[derive(Clone, Default)]
pub struct ThreadLocalizing {
    isolation: ScopeIsolation,
    base: BehaviorFactoryBase,
}

impl ThreadLocalizing {
    /// Always-isolate mode.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation(isolation: impl Into<ScopeIsolation>) -> Self {
        Self {
            isolation: isolation.into(),
            base: BehaviorFactoryBase::new(),
        }
    }

    pub fn isolation(&self) -> ScopeIsolation {
        self.isolation
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
        match self.isolation {
            ScopeIsolation::AlwaysIsolate => wrapped(monitor, ThreadLocalized::new(delegate)),
            ScopeIsolation::ScopeEnsuresIsolation => {
                let reference: Arc<dyn ObjectReference> = Arc::new(ThreadLocalReference::new());
                wrapped(monitor, Cached::new(delegate, reference))
            }
        }
    }
}

impl ComponentFactory for ThreadLocalizing {
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
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
        let delegate = self.base.add(monitor, lifecycle, properties, adapter)?;
        Ok(self.decorate(monitor, delegate))
    }
}
