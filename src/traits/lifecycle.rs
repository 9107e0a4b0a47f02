//! Component-side lifecycle traits.

/// Components that need to be started and stopped with their container.
///
/// Register implementing types with
/// [`StartableLifecycleStrategy::with_startable`](crate::StartableLifecycleStrategy::with_startable).
/// Hooks run at most once per transition; a panicking hook is reported as
/// [`DiError::LifecycleHook`](crate::DiError::LifecycleHook).
///
/// # Examples
///
/// ```
/// use ferrous_adapters::Startable;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Listener {
///     running: AtomicBool,
/// }
///
/// impl Startable for Listener {
///     fn start(&self) {
///         self.running.store(true, Ordering::SeqCst);
///     }
///
///     fn stop(&self) {
///         self.running.store(false, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait Startable: Send + Sync + 'static {
    fn start(&self);

    fn stop(&self);
}

/// Trait for synchronous resource disposal.
///
/// Implement this trait for components that need structured teardown (e.g.,
/// flushing caches, closing connections). Disposal runs after `stop`, in
/// reverse construction order, when the owning container is disposed.
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
