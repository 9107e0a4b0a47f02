//! Lifecycle bookkeeping for instances the container retains.

use parking_lot::Mutex;

use crate::adapter::AnyArc;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifecycle::{LifecycleAction, LifecycleState, LifecycleStrategy};

/// A stored instance together with its lifecycle state.
///
/// The state lock is held while the strategy hook runs, so each transition's
/// hook fires exactly once even when the cascade races a release.
pub(crate) struct ManagedInstance {
    key: Key,
    instance: AnyArc,
    state: Mutex<LifecycleState>,
}

impl ManagedInstance {
    pub(crate) fn new(key: Key, instance: AnyArc) -> Self {
        Self {
            key,
            instance,
            state: Mutex::new(LifecycleState::Unstarted),
        }
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn instance(&self) -> &AnyArc {
        &self.instance
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub(crate) fn apply(
        &self,
        action: LifecycleAction,
        strategy: &dyn LifecycleStrategy,
    ) -> DiResult<()> {
        let mut state = self.state.lock();
        let Some(next) = state.next(&self.key, action)? else {
            return Ok(());
        };

        let result = match action {
            LifecycleAction::Start => strategy.start(&self.instance),
            LifecycleAction::Stop => strategy.stop(&self.instance),
            LifecycleAction::Dispose => strategy.dispose(&self.instance),
        };

        // A failed start leaves the instance unstarted; stop and dispose
        // cannot be retried so they always advance
        if result.is_ok() || action != LifecycleAction::Start {
            *state = next;
        }

        result.map_err(|err| match err {
            DiError::LifecycleHook { action, message, .. } => DiError::LifecycleHook {
                key: self.key.clone(),
                action,
                message,
            },
            other => other,
        })
    }
}
