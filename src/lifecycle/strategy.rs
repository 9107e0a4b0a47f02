//! Lifecycle strategies: the policy that actually calls start/stop/dispose.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::adapter::AnyArc;
use crate::error::{DiError, DiResult};
use crate::implementation::ImplementationType;
use crate::internal::guard::panic_message;
use crate::key::Key;
use crate::lifecycle::LifecycleAction;
use crate::traits::{Dispose, Startable};

/// Stateless policy invoked to drive instance lifecycles.
///
/// Supplied by the embedding container; the adapter core only asks it
/// whether a type participates and forwards transitions to it.
pub trait LifecycleStrategy: Send + Sync {
    fn start(&self, instance: &AnyArc) -> DiResult<()>;

    fn stop(&self, instance: &AnyArc) -> DiResult<()>;

    fn dispose(&self, instance: &AnyArc) -> DiResult<()>;

    /// Whether instances of `ty` are lifecycle-aware absent a forcing behavior.
    fn has_lifecycle(&self, ty: &ImplementationType) -> bool;
}

/// Strategy for containers that manage no lifecycles.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLifecycleStrategy;

impl LifecycleStrategy for NullLifecycleStrategy {
    fn start(&self, _instance: &AnyArc) -> DiResult<()> {
        Ok(())
    }

    fn stop(&self, _instance: &AnyArc) -> DiResult<()> {
        Ok(())
    }

    fn dispose(&self, _instance: &AnyArc) -> DiResult<()> {
        Ok(())
    }

    fn has_lifecycle(&self, _ty: &ImplementationType) -> bool {
        false
    }
}

type Hook = Arc<dyn Fn(&AnyArc) + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    name: &'static str,
    start: Option<Hook>,
    stop: Option<Hook>,
    dispose: Option<Hook>,
}

/// Strategy driven by the [`Startable`] and [`Dispose`] traits.
///
/// Rust has no runtime trait inspection, so the implementing types are
/// registered up front. Any registered type reports `has_lifecycle`.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{Dispose, ImplementationType, LifecycleStrategy, Startable, StartableLifecycleStrategy};
///
/// struct Pool;
/// impl Startable for Pool {
///     fn start(&self) {}
///     fn stop(&self) {}
/// }
/// impl Dispose for Pool {
///     fn dispose(&self) {}
/// }
///
/// let strategy = StartableLifecycleStrategy::new()
///     .with_startable::<Pool>()
///     .with_disposable::<Pool>();
/// assert!(strategy.has_lifecycle(&ImplementationType::of::<Pool>()));
/// assert!(!strategy.has_lifecycle(&ImplementationType::of::<String>()));
/// ```
#[derive(Clone, Default)]
pub struct StartableLifecycleStrategy {
    hooks: HashMap<TypeId, Hooks>,
}

impl StartableLifecycleStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`'s start and stop hooks.
    pub fn with_startable<T: Startable>(mut self) -> Self {
        let hooks = self.entry::<T>();
        hooks.start = Some(Arc::new(|any: &AnyArc| {
            if let Some(t) = any.downcast_ref::<T>() {
                t.start();
            }
        }));
        hooks.stop = Some(Arc::new(|any: &AnyArc| {
            if let Some(t) = any.downcast_ref::<T>() {
                t.stop();
            }
        }));
        self
    }

    /// Registers `T`'s dispose hook.
    pub fn with_disposable<T: Dispose>(mut self) -> Self {
        self.entry::<T>().dispose = Some(Arc::new(|any: &AnyArc| {
            if let Some(t) = any.downcast_ref::<T>() {
                t.dispose();
            }
        }));
        self
    }

    fn entry<T: 'static>(&mut self) -> &mut Hooks {
        self.hooks.entry(TypeId::of::<T>()).or_insert_with(|| Hooks {
            name: std::any::type_name::<T>(),
            ..Hooks::default()
        })
    }

    fn invoke(&self, instance: &AnyArc, action: LifecycleAction) -> DiResult<()> {
        let id = (**instance).type_id();
        let Some(hooks) = self.hooks.get(&id) else {
            return Ok(());
        };
        let hook = match action {
            LifecycleAction::Start => &hooks.start,
            LifecycleAction::Stop => &hooks.stop,
            LifecycleAction::Dispose => &hooks.dispose,
        };
        let Some(hook) = hook else {
            return Ok(());
        };

        panic::catch_unwind(AssertUnwindSafe(|| hook(instance))).map_err(|payload| {
            DiError::LifecycleHook {
                key: Key::Type(id, hooks.name),
                action,
                message: panic_message(payload.as_ref()),
            }
        })
    }
}

impl LifecycleStrategy for StartableLifecycleStrategy {
    fn start(&self, instance: &AnyArc) -> DiResult<()> {
        self.invoke(instance, LifecycleAction::Start)
    }

    fn stop(&self, instance: &AnyArc) -> DiResult<()> {
        self.invoke(instance, LifecycleAction::Stop)
    }

    fn dispose(&self, instance: &AnyArc) -> DiResult<()> {
        self.invoke(instance, LifecycleAction::Dispose)
    }

    fn has_lifecycle(&self, ty: &ImplementationType) -> bool {
        self.hooks.contains_key(&ty.id())
    }
}

impl std::fmt::Debug for StartableLifecycleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.values().map(|h| h.name).collect();
        f.debug_struct("StartableLifecycleStrategy")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        starts: AtomicUsize,
    }

    impl Startable for Counter {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self) {
            panic!("stop exploded");
        }
    }

    #[test]
    fn hooks_dispatch_on_dynamic_type() {
        let strategy = StartableLifecycleStrategy::new().with_startable::<Counter>();
        let counter = Arc::new(Counter::default());
        let any: AnyArc = counter.clone();

        strategy.start(&any).unwrap();
        assert_eq!(counter.starts.load(Ordering::SeqCst), 1);

        // Unregistered types are ignored
        strategy.start(&(Arc::new(5u8) as AnyArc)).unwrap();
    }

    #[test]
    fn panicking_hook_becomes_error() {
        let strategy = StartableLifecycleStrategy::new().with_startable::<Counter>();
        let any: AnyArc = Arc::new(Counter::default());

        match strategy.stop(&any) {
            Err(DiError::LifecycleHook { action, message, .. }) => {
                assert_eq!(action, LifecycleAction::Stop);
                assert!(message.contains("stop exploded"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
