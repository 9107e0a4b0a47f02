//! Adapter table and the registry view resolutions run against.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::{AnyArc, ComponentAdapter, ComponentRegistry};
use crate::container::ContainerInner;
use crate::error::{DiError, DiResult};
use crate::internal::{guard, ManagedInstance};
use crate::key::Key;
use crate::lifecycle::{LifecycleAction, LifecycleState};

/// Registered adapters in registration order with O(1) key lookup.
#[derive(Default)]
pub(crate) struct AdapterTable {
    order: Vec<Arc<dyn ComponentAdapter>>,
    index: HashMap<Key, usize>,
}

impl AdapterTable {
    pub(crate) fn insert(&mut self, adapter: Arc<dyn ComponentAdapter>) -> DiResult<()> {
        let key = adapter.key().clone();
        if self.index.contains_key(&key) {
            return Err(DiError::DuplicateKey(key));
        }
        self.index.insert(key, self.order.len());
        self.order.push(adapter);
        Ok(())
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Arc<dyn ComponentAdapter>> {
        self.index.get(key).map(|&i| &self.order[i])
    }

    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<dyn ComponentAdapter>> {
        self.order.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// Pointer identity of two type-erased instances.
pub(crate) fn same_instance(a: &AnyArc, b: &AnyArc) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl ComponentRegistry for ContainerInner {
    fn adapter(&self, key: &Key) -> Option<Arc<dyn ComponentAdapter>> {
        self.adapters.read().get(key).cloned()
    }

    fn instance_created(&self, key: &Key, instance: &AnyArc) -> DiResult<()> {
        let state = *self.state.lock();
        if state.is_disposed() {
            return Err(DiError::ContainerDisposed);
        }

        // Lifecycle participation is decided by the outermost adapter
        let participates = self
            .adapters
            .read()
            .get(key)
            .map_or(false, |adapter| adapter.has_lifecycle());
        if !participates {
            return Ok(());
        }

        let managed = {
            let mut list = self.managed.lock();
            if list.iter().any(|m| same_instance(m.instance(), instance)) {
                return Ok(());
            }
            let managed = Arc::new(ManagedInstance::new(key.clone(), instance.clone()));
            list.push(Arc::clone(&managed));
            managed
        };
        tracing::debug!(key = %key, "instance now lifecycle-managed");

        if state == LifecycleState::Started {
            if let Err(err) = self.apply(&managed, LifecycleAction::Start) {
                // The storing behavior drops the instance, so stop managing it
                self.managed.lock().retain(|m| !Arc::ptr_eq(m, &managed));
                return Err(err);
            }
        }
        Ok(())
    }
}

impl ContainerInner {
    /// Applies one transition to a managed instance, reporting failures.
    pub(crate) fn apply(&self, managed: &ManagedInstance, action: LifecycleAction) -> DiResult<()> {
        managed
            .apply(action, self.lifecycle.as_ref())
            .map_err(|err| {
                tracing::warn!(key = %managed.key(), action = %action, error = %err, "lifecycle invocation failed");
                guard::notify("lifecycle_invocation_failed", || {
                    self.monitor
                        .lifecycle_invocation_failed(managed.key(), action, &err)
                });
                err
            })
    }
}
