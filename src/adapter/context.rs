//! Per-call resolution bookkeeping.
//!
//! A [`ResolutionContext`] is created for each top-level resolution and
//! dropped when that call returns. It owns the in-progress key stack used for
//! cycle detection, so concurrent resolutions never share cycle state.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use crate::adapter::{AnyArc, ComponentAdapter};
use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Nesting limit applied when no explicit depth is configured.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Lookup surface a resolution runs against, usually the container.
pub trait ComponentRegistry: Send + Sync {
    /// Outermost adapter registered under `key`.
    fn adapter(&self, key: &Key) -> Option<Arc<dyn ComponentAdapter>>;

    /// Called by storing behaviors when a new instance was produced and kept.
    ///
    /// The registry decides, from the outermost adapter for `key`, whether
    /// the instance becomes lifecycle-managed.
    fn instance_created(&self, key: &Key, instance: &AnyArc) -> DiResult<()>;
}

/// Bookkeeping for one top-level resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{
///     AnyArc, ComponentAdapter, ComponentRegistry, DiError, DiResult, Key, ResolutionContext,
/// };
/// use std::sync::Arc;
///
/// struct Empty;
///
/// impl ComponentRegistry for Empty {
///     fn adapter(&self, _key: &Key) -> Option<Arc<dyn ComponentAdapter>> {
///         None
///     }
///
///     fn instance_created(&self, _key: &Key, _instance: &AnyArc) -> DiResult<()> {
///         Ok(())
///     }
/// }
///
/// let mut ctx = ResolutionContext::new(Arc::new(Empty));
/// assert!(matches!(ctx.resolve(&Key::named("missing")), Err(DiError::NotFound(_))));
/// ```
pub struct ResolutionContext {
    registry: Arc<dyn ComponentRegistry>,
    in_progress: Vec<Key>,
    max_depth: usize,
    unit: ThreadId,
}

impl ResolutionContext {
    pub fn new(registry: Arc<dyn ComponentRegistry>) -> Self {
        Self {
            registry,
            in_progress: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            unit: thread::current().id(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Arc<dyn ComponentRegistry> {
        &self.registry
    }

    pub(crate) fn registry_weak(&self) -> Weak<dyn ComponentRegistry> {
        Arc::downgrade(&self.registry)
    }

    /// Logical unit (thread) this resolution runs on.
    pub fn unit(&self) -> ThreadId {
        self.unit
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Keys currently being resolved, outermost first.
    pub fn in_progress(&self) -> &[Key] {
        &self.in_progress
    }

    /// Resolves the component registered under `key`.
    pub fn resolve(&mut self, key: &Key) -> DiResult<AnyArc> {
        let adapter = self
            .registry
            .adapter(key)
            .ok_or_else(|| DiError::NotFound(key.clone()))?;
        self.resolve_adapter(adapter.as_ref())
    }

    /// Resolves through a specific adapter, guarding its key against cycles.
    pub fn resolve_adapter(&mut self, adapter: &dyn ComponentAdapter) -> DiResult<AnyArc> {
        self.guarded(adapter.key(), |ctx| adapter.get_instance(ctx))
    }

    /// Verifies the component registered under `key` without instantiating it.
    pub fn verify(&mut self, key: &Key) -> DiResult<()> {
        let adapter = self
            .registry
            .adapter(key)
            .ok_or_else(|| DiError::NotFound(key.clone()))?;
        self.verify_adapter(adapter.as_ref())
    }

    pub fn verify_adapter(&mut self, adapter: &dyn ComponentAdapter) -> DiResult<()> {
        self.guarded(adapter.key(), |ctx| adapter.verify(ctx))
    }

    pub(crate) fn instance_created(&self, key: &Key, instance: &AnyArc) -> DiResult<()> {
        self.registry.instance_created(key, instance)
    }

    fn guarded<T, F>(&mut self, key: &Key, f: F) -> DiResult<T>
    where
        F: FnOnce(&mut Self) -> DiResult<T>,
    {
        self.enter(key)?;
        let result = f(self);
        self.in_progress.pop();
        result
    }

    fn enter(&mut self, key: &Key) -> DiResult<()> {
        // Cycle check BEFORE pushing the key
        if let Some(pos) = self.in_progress.iter().position(|k| k == key) {
            let mut path = self.in_progress[pos..].to_vec();
            path.push(key.clone());
            return Err(DiError::Circular(path));
        }

        if self.in_progress.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(self.in_progress.len()));
        }

        self.in_progress.push(key.clone());
        Ok(())
    }
}
