//! Snapshot and restore of container configuration.
//!
//! A snapshot records what a container was configured with: every key, the
//! implementation name, the explicit parameters and the behavior chain.
//! Instances, caches, monitors and lifecycle strategies are runtime handles
//! and are never persisted; they are supplied again on restore, and
//! implementations are looked up by name in an [`ImplementationCatalog`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::{behavior_chain, BehaviorKind, ComponentAdapter};
use crate::behaviors::{
    Automated, Cached, ComponentFactory, ConstructorInjection, Properties, ThreadLocalized,
};
use crate::config::ContainerConfig;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::implementation::Implementation;
use crate::key::{key_of_type, Key};
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::{self, ComponentMonitor};
use crate::parameter::{ConstantValue, Parameter};
use crate::reference::{ObjectReference, ReferenceScope, SimpleReference, ThreadLocalReference};

/// Serializable form of a [`Key`]. Type keys are stored by type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum KeySnapshot {
    Type(String),
    Named(String),
}

impl From<&Key> for KeySnapshot {
    fn from(key: &Key) -> Self {
        match key {
            Key::Type(_, name) => KeySnapshot::Type((*name).to_string()),
            Key::Named(name) => KeySnapshot::Named(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSnapshot {
    Component(KeySnapshot),
    Constant(ConstantValue),
}

/// One registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSnapshot {
    pub key: KeySnapshot,
    pub implementation: String,
    pub parameters: Vec<ParameterSnapshot>,
    /// Outermost first
    pub behaviors: Vec<BehaviorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub config: ContainerConfig,
    pub components: Vec<AdapterSnapshot>,
}

impl ContainerSnapshot {
    pub fn to_json(&self) -> DiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DiError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Snapshot(e.to_string()))
    }
}

/// Lookup table from type names back to implementations and type keys.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{
///     Container, ContainerSnapshot, ImplementationCatalog, Implementation, NullLifecycleStrategy,
///     NullMonitor, key_of_type,
/// };
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let container = Container::new();
/// container.add_component(key_of_type::<Clock>(), Implementation::of(|_| Ok(Clock)), vec![]).unwrap();
///
/// let snapshot = container.snapshot().unwrap();
/// let json = snapshot.to_json().unwrap();
///
/// let catalog = ImplementationCatalog::new()
///     .register(Implementation::of(|_| Ok(Clock)))
///     .register_key::<Clock>();
/// let restored = Container::restore(
///     ContainerSnapshot::from_json(&json).unwrap(),
///     &catalog,
///     Arc::new(NullLifecycleStrategy),
///     Arc::new(NullMonitor),
/// )
/// .unwrap();
/// assert!(restored.get::<Clock>(&key_of_type::<Clock>()).is_ok());
/// ```
#[derive(Default, Clone)]
pub struct ImplementationCatalog {
    implementations: HashMap<String, Implementation>,
    keys: HashMap<String, Key>,
}

impl ImplementationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `implementation` restorable under its type name.
    pub fn register(mut self, implementation: Implementation) -> Self {
        self.implementations
            .insert(implementation.type_name().to_string(), implementation);
        self
    }

    /// Makes the type key of `T` restorable.
    pub fn register_key<T: ?Sized + 'static>(mut self) -> Self {
        let key = key_of_type::<T>();
        self.keys.insert(key.display_name().to_string(), key);
        self
    }

    fn implementation(&self, name: &str) -> DiResult<Implementation> {
        self.implementations
            .get(name)
            .cloned()
            .ok_or_else(|| DiError::Snapshot(format!("implementation '{}' is not in the catalog", name)))
    }

    fn key(&self, snapshot: &KeySnapshot) -> DiResult<Key> {
        match snapshot {
            KeySnapshot::Named(name) => Ok(Key::named(name)),
            KeySnapshot::Type(name) => self
                .keys
                .get(name)
                .cloned()
                .ok_or_else(|| DiError::Snapshot(format!("type key '{}' is not in the catalog", name))),
        }
    }
}

impl Container {
    /// Captures the configuration of every registration.
    pub fn snapshot(&self) -> DiResult<ContainerSnapshot> {
        let components = self
            .keys()
            .iter()
            .filter_map(|key| self.adapter(key))
            .map(|adapter| snapshot_adapter(adapter.as_ref()))
            .collect();

        Ok(ContainerSnapshot {
            config: *self.config(),
            components,
        })
    }

    /// Rebuilds a container from `snapshot`.
    ///
    /// Each chain is reconstructed innermost first and every step is
    /// reported to `monitor` exactly like a fresh registration. Custom
    /// behaviors cannot be rebuilt and fail the restore.
    pub fn restore(
        snapshot: ContainerSnapshot,
        catalog: &ImplementationCatalog,
        lifecycle: Arc<dyn LifecycleStrategy>,
        monitor: Arc<dyn ComponentMonitor>,
    ) -> DiResult<Container> {
        let container = Container::builder()
            .config(snapshot.config)
            .lifecycle(Arc::clone(&lifecycle))
            .monitor(Arc::clone(&monitor))
            .build();

        for component in snapshot.components {
            let key = catalog.key(&component.key)?;
            let implementation = catalog.implementation(&component.implementation)?;
            let parameters = component
                .parameters
                .iter()
                .map(|p| match p {
                    ParameterSnapshot::Component(k) => catalog.key(k).map(Parameter::Component),
                    ParameterSnapshot::Constant(c) => Ok(Parameter::Constant(c.clone())),
                })
                .collect::<DiResult<Vec<_>>>()?;

            let mut adapter = ConstructorInjection.create_component_adapter(
                &monitor,
                &lifecycle,
                &mut Properties::new(),
                key,
                implementation,
                parameters,
            )?;
            for behavior in component.behaviors.iter().rev() {
                adapter = monitor::new_behavior(&monitor, rebuild(behavior, adapter)?);
            }
            container.insert(adapter)?;
        }

        tracing::debug!(components = container.len(), "restored container from snapshot");
        Ok(container)
    }
}

fn snapshot_adapter(adapter: &dyn ComponentAdapter) -> AdapterSnapshot {
    AdapterSnapshot {
        key: adapter.key().into(),
        implementation: adapter.implementation().type_name().to_string(),
        parameters: adapter
            .parameters()
            .iter()
            .map(|p| match p {
                Parameter::Component(key) => ParameterSnapshot::Component(key.into()),
                Parameter::Constant(value) => ParameterSnapshot::Constant(value.clone()),
            })
            .collect(),
        behaviors: behavior_chain(adapter),
    }
}

fn rebuild(
    behavior: &BehaviorKind,
    delegate: Arc<dyn ComponentAdapter>,
) -> DiResult<Arc<dyn ComponentAdapter>> {
    let adapter: Arc<dyn ComponentAdapter> = match behavior {
        BehaviorKind::Cached(scope) => {
            let reference: Arc<dyn ObjectReference> = match scope {
                ReferenceScope::Process => Arc::new(SimpleReference::new()),
                ReferenceScope::Thread => Arc::new(ThreadLocalReference::new()),
            };
            Arc::new(Cached::new(delegate, reference))
        }
        BehaviorKind::ThreadLocalized => Arc::new(ThreadLocalized::new(delegate)),
        BehaviorKind::Automated => Arc::new(Automated::new(delegate)),
        BehaviorKind::Custom(name) => {
            return Err(DiError::Snapshot(format!(
                "custom behavior '{}' on {} cannot be restored",
                name,
                delegate.key()
            )))
        }
    };
    Ok(adapter)
}
