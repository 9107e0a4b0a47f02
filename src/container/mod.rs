//! A minimal container over the adapter core.
//!
//! The container owns registrations, runs each top-level resolution with a
//! fresh [`ResolutionContext`], keeps every stored lifecycle-aware instance
//! in construction order and drives the container-level lifecycle cascade.
//! It is deliberately small: no child containers and no registration DSL
//! beyond key, implementation and parameters.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::adapter::{describe_chain, AnyArc, ComponentAdapter, ComponentRegistry, ResolutionContext};
use crate::behaviors::{Caching, ComponentFactory, Properties, ThreadLocalizing};
use crate::config::ContainerConfig;
use crate::error::{DiError, DiResult};
use crate::implementation::Implementation;
use crate::internal::ManagedInstance;
use crate::key::Key;
use crate::lifecycle::{LifecycleAction, LifecycleState, LifecycleStrategy, NullLifecycleStrategy};
use crate::monitor::{ComponentMonitor, NullMonitor};
use crate::parameter::Parameter;

mod registry;

use registry::{same_instance, AdapterTable};

/// Registration and resolution front end for adapter chains.
///
/// Cloning is cheap and every clone refers to the same container.
///
/// # Examples
///
/// ```
/// use ferrous_adapters::{Container, Implementation, key_of_type};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container
///     .add_component(
///         key_of_type::<Database>(),
///         Implementation::of(|_| Ok(Database { url: "postgres://localhost".into() })),
///         vec![],
///     )
///     .unwrap();
/// container
///     .add_component(
///         key_of_type::<UserService>(),
///         Implementation::of(|args| Ok(UserService { db: args.take::<Database>()? }))
///             .depends_on::<Database>(),
///         vec![],
///     )
///     .unwrap();
///
/// let users = container.get::<UserService>(&key_of_type::<UserService>()).unwrap();
/// let db = container.get::<Database>(&key_of_type::<Database>()).unwrap();
/// assert!(Arc::ptr_eq(&users.db, &db));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    adapters: RwLock<AdapterTable>,
    factory: Arc<dyn ComponentFactory>,
    monitor: Arc<dyn ComponentMonitor>,
    lifecycle: Arc<dyn LifecycleStrategy>,
    // Construction order
    managed: Mutex<Vec<Arc<ManagedInstance>>>,
    state: Mutex<LifecycleState>,
    config: ContainerConfig,
}

enum FactoryChoice {
    Caching,
    ThreadLocalizing,
    Custom(Arc<dyn ComponentFactory>),
}

/// Builder for [`Container`].
pub struct ContainerBuilder {
    factory: FactoryChoice,
    monitor: Arc<dyn ComponentMonitor>,
    lifecycle: Arc<dyn LifecycleStrategy>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            factory: FactoryChoice::Caching,
            monitor: Arc::new(NullMonitor),
            lifecycle: Arc::new(NullLifecycleStrategy),
            config: ContainerConfig::default(),
        }
    }

    /// Factory chain used by [`Container::add_component`]. Defaults to [`Caching`].
    pub fn factory(mut self, factory: impl ComponentFactory + 'static) -> Self {
        self.factory = FactoryChoice::Custom(Arc::new(factory));
        self
    }

    /// Uses [`ThreadLocalizing`] in the mode selected by the configuration.
    pub fn thread_localizing(mut self) -> Self {
        self.factory = FactoryChoice::ThreadLocalizing;
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn ComponentMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn LifecycleStrategy>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Container {
        let factory: Arc<dyn ComponentFactory> = match self.factory {
            FactoryChoice::Caching => Arc::new(Caching::new()),
            FactoryChoice::ThreadLocalizing => {
                Arc::new(ThreadLocalizing::with_isolation(self.config.scope_isolation))
            }
            FactoryChoice::Custom(factory) => factory,
        };

        Container {
            inner: Arc::new(ContainerInner {
                adapters: RwLock::new(AdapterTable::default()),
                factory,
                monitor: self.monitor,
                lifecycle: self.lifecycle,
                managed: Mutex::new(Vec::new()),
                state: Mutex::new(LifecycleState::Unstarted),
                config: self.config,
            }),
        }
    }
}

impl Container {
    /// Container with process-wide caching, no monitor and no lifecycle strategy.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn monitor(&self) -> &Arc<dyn ComponentMonitor> {
        &self.inner.monitor
    }

    pub fn lifecycle_strategy(&self) -> &Arc<dyn LifecycleStrategy> {
        &self.inner.lifecycle
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    /// Registers `implementation` under `key` through the container's factory chain.
    ///
    /// An empty `parameters` list uses the implementation's declared dependencies.
    pub fn add_component(
        &self,
        key: impl Into<Key>,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        self.add_component_with(key, implementation, parameters, Properties::new())
    }

    /// Like [`add_component`](Self::add_component) with registration properties.
    ///
    /// Properties no factory in the chain consumed are rejected with
    /// [`DiError::InvalidRegistration`].
    pub fn add_component_with(
        &self,
        key: impl Into<Key>,
        implementation: Implementation,
        parameters: Vec<Parameter>,
        mut properties: Properties,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        let key = key.into();
        self.check_registrable(&key)?;

        let adapter = self.inner.factory.create_component_adapter(
            &self.inner.monitor,
            &self.inner.lifecycle,
            &mut properties,
            key,
            implementation,
            parameters,
        )?;
        Self::check_consumed(adapter.key(), &properties)?;
        self.insert(adapter)
    }

    /// Registers an adapter built elsewhere, decorating it with the factory chain.
    pub fn add_adapter(&self, adapter: Arc<dyn ComponentAdapter>) -> DiResult<Arc<dyn ComponentAdapter>> {
        self.add_adapter_with(adapter, Properties::new())
    }

    pub fn add_adapter_with(
        &self,
        adapter: Arc<dyn ComponentAdapter>,
        mut properties: Properties,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        self.check_registrable(adapter.key())?;
        let adapter = self.inner.factory.add_component_adapter(
            &self.inner.monitor,
            &self.inner.lifecycle,
            &mut properties,
            adapter,
        )?;
        Self::check_consumed(adapter.key(), &properties)?;
        self.insert(adapter)
    }

    /// Registers a finished chain as-is, bypassing the factory chain.
    pub(crate) fn insert(&self, adapter: Arc<dyn ComponentAdapter>) -> DiResult<Arc<dyn ComponentAdapter>> {
        tracing::debug!(key = %adapter.key(), chain = %describe_chain(adapter.as_ref()), "registered component");
        self.inner.adapters.write().insert(Arc::clone(&adapter))?;
        Ok(adapter)
    }

    fn check_registrable(&self, key: &Key) -> DiResult<()> {
        if self.state().is_disposed() {
            return Err(DiError::ContainerDisposed);
        }
        if self.inner.adapters.read().contains_key(key) {
            return Err(DiError::DuplicateKey(key.clone()));
        }
        Ok(())
    }

    fn check_consumed(key: &Key, properties: &Properties) -> DiResult<()> {
        if properties.is_empty() {
            return Ok(());
        }
        Err(DiError::InvalidRegistration {
            key: key.clone(),
            reason: format!(
                "unprocessed characteristics: {}",
                properties.names().collect::<Vec<_>>().join(", ")
            ),
        })
    }

    /// Outermost adapter registered under `key`.
    pub fn adapter(&self, key: &Key) -> Option<Arc<dyn ComponentAdapter>> {
        self.inner.adapter(key)
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.adapters.read().iter().map(|a| a.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.adapters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn context(&self) -> ResolutionContext {
        let registry: Arc<dyn ComponentRegistry> = self.inner.clone();
        ResolutionContext::new(registry).with_max_depth(self.inner.config.max_depth)
    }

    /// Resolves the component registered under `key`.
    pub fn get_instance(&self, key: &Key) -> DiResult<AnyArc> {
        if self.state().is_disposed() {
            return Err(DiError::ContainerDisposed);
        }
        tracing::trace!(key = %key, "resolving");
        self.context().resolve(key)
    }

    /// Typed [`get_instance`](Self::get_instance).
    pub fn get<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
        self.get_instance(key)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch {
                key: key.clone(),
                expected: type_name::<T>(),
            })
    }

    /// Checks every registration for missing dependencies and cycles
    /// without constructing anything.
    pub fn verify(&self) -> DiResult<()> {
        let adapters: Vec<_> = self.inner.adapters.read().iter().cloned().collect();
        for adapter in adapters {
            self.context().verify_adapter(adapter.as_ref())?;
        }
        Ok(())
    }

    /// [`verify`](Self::verify) for a single key.
    pub fn verify_key(&self, key: &Key) -> DiResult<()> {
        self.context().verify(key)
    }

    /// Starts the container.
    ///
    /// Every registration whose chain participates in lifecycle is
    /// instantiated, then all managed instances are started in construction
    /// order. Instances stored later while the container runs are started as
    /// they are created.
    ///
    /// On failure the container returns to [`LifecycleState::Unstarted`], so
    /// `start` may be retried; instances already started stay started.
    pub fn start(&self) -> DiResult<()> {
        {
            let mut state = self.inner.state.lock();
            match state.next("container", LifecycleAction::Start)? {
                Some(next) => *state = next,
                None => return Ok(()),
            }
        }
        tracing::debug!("starting container");

        let result = self.start_managed();
        if let Err(err) = &result {
            tracing::warn!(error = %err, "container start failed");
            let mut state = self.inner.state.lock();
            if *state == LifecycleState::Started {
                *state = LifecycleState::Unstarted;
            }
        }
        result
    }

    fn start_managed(&self) -> DiResult<()> {
        let eager: Vec<_> = self
            .inner
            .adapters
            .read()
            .iter()
            .filter(|a| a.has_lifecycle())
            .cloned()
            .collect();
        for adapter in eager {
            self.context().resolve_adapter(adapter.as_ref())?;
        }

        for managed in self.managed_snapshot() {
            self.inner.apply(&managed, LifecycleAction::Start)?;
        }
        Ok(())
    }

    /// Stops every managed instance in reverse construction order.
    ///
    /// All instances are attempted; the first failure is returned.
    pub fn stop(&self) -> DiResult<()> {
        {
            let mut state = self.inner.state.lock();
            match state.next("container", LifecycleAction::Stop)? {
                Some(next) => *state = next,
                None => return Ok(()),
            }
        }
        tracing::debug!("stopping container");

        let mut first_error = None;
        for managed in self.managed_snapshot().iter().rev() {
            if let Err(err) = self.inner.apply(managed, LifecycleAction::Stop) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Disposes the container.
    ///
    /// Each managed instance is stopped and then disposed, last-constructed
    /// first. A failure on one instance does not prevent the others from
    /// being disposed; every error is returned together as
    /// [`DiError::Disposal`]. Disposing twice is a
    /// [`DiError::LifecycleTransition`].
    pub fn dispose(&self) -> DiResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.is_disposed() {
                return Err(DiError::LifecycleTransition {
                    subject: "container".to_string(),
                    from: *state,
                    action: LifecycleAction::Dispose,
                });
            }
            *state = LifecycleState::Disposed;
        }
        tracing::debug!("disposing container");

        let managed = std::mem::take(&mut *self.inner.managed.lock());
        let mut errors = Vec::new();
        for instance in managed.iter().rev() {
            for action in [LifecycleAction::Stop, LifecycleAction::Dispose] {
                if let Err(err) = self.inner.apply(instance, action) {
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::warn!(count = errors.len(), "errors during container disposal");
            Err(DiError::Disposal(errors))
        }
    }

    /// Stops and disposes one managed instance and forgets it.
    ///
    /// Dispose is attempted even when stop fails; every failure is returned
    /// together as [`DiError::Disposal`].
    ///
    /// Returns `false` if `instance` is not managed by this container. Any
    /// cache still holding the instance must be flushed separately.
    pub fn release(&self, instance: &AnyArc) -> DiResult<bool> {
        let managed = {
            let mut list = self.inner.managed.lock();
            match list.iter().position(|m| same_instance(m.instance(), instance)) {
                Some(pos) => list.remove(pos),
                None => return Ok(false),
            }
        };
        tracing::debug!(key = %managed.key(), state = %managed.state(), "releasing instance");
        let errors: Vec<DiError> = [LifecycleAction::Stop, LifecycleAction::Dispose]
            .into_iter()
            .filter_map(|action| self.inner.apply(&managed, action).err())
            .collect();
        if errors.is_empty() {
            Ok(true)
        } else {
            Err(DiError::Disposal(errors))
        }
    }

    /// Number of instances currently lifecycle-managed.
    pub fn managed_count(&self) -> usize {
        self.inner.managed.lock().len()
    }

    fn managed_snapshot(&self) -> Vec<Arc<ManagedInstance>> {
        self.inner.managed.lock().clone()
    }

    /// One line per registration: key, behavior chain and implementation.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut out = format!("Container ({}):\n", self.state());
        for adapter in self.inner.adapters.read().iter() {
            out.push_str(&format!(
                "  {} => {} [{}]\n",
                adapter.key(),
                describe_chain(adapter.as_ref()),
                adapter.implementation().type_name()
            ));
        }
        out
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("components", &self.keys())
            .field("managed", &self.managed_count())
            .finish()
    }
}
