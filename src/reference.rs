//! Storage cells injected into caching behaviors.
//!
//! The cell decides the scope of a cached instance: a [`SimpleReference`] is
//! shared by every thread, a [`ThreadLocalReference`] gives each thread its
//! own slot. The caching behavior itself never knows which one it holds.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::adapter::AnyArc;
use crate::error::DiResult;
use crate::internal::init_graph::{self, Turn};
use crate::key::Key;

/// Unit of isolation for a cached instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(rename_all = "snake_case"))]
pub enum ReferenceScope {
    /// One instance for the whole process
    Process,
    /// One instance per thread
    Thread,
}

/// Who asks a cell for its value: the registration key and the resolution
/// path that led to it, outermost first.
#[derive(Debug, Clone)]
pub struct InitRequest {
    key: Key,
    path: Vec<Key>,
}

impl InitRequest {
    pub fn new(key: Key, path: &[Key]) -> Self {
        Self {
            key,
            path: path.to_vec(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn path(&self) -> &[Key] {
        &self.path
    }
}

/// A cell holding at most one instance per scope unit.
pub trait ObjectReference: Send + Sync {
    /// Current value for the calling scope unit.
    fn get(&self) -> Option<AnyArc>;

    /// Returns the current value or stores the one produced by `init`.
    ///
    /// At most one call to `init` establishes the value per scope unit; a
    /// failed `init` leaves the cell empty. `request` identifies the caller
    /// for cycle reporting.
    fn get_or_try_init(
        &self,
        request: &InitRequest,
        init: &mut dyn FnMut() -> DiResult<AnyArc>,
    ) -> DiResult<AnyArc>;

    /// Empties the cell for the calling scope unit, returning what it held.
    fn clear(&self) -> Option<AnyArc>;

    fn scope(&self) -> ReferenceScope;
}

/// Process-wide cell.
///
/// One thread builds the value while concurrent first accesses wait and then
/// observe the stored instance. The lock is not held while `init` runs. A
/// wait that would close a cycle across threads fails with
/// [`DiError::Circular`](crate::DiError::Circular) instead of blocking.
pub struct SimpleReference {
    id: u64,
    slot: Mutex<Option<AnyArc>>,
}

impl SimpleReference {
    pub fn new() -> Self {
        Self {
            id: NEXT_REFERENCE_ID.fetch_add(1, Ordering::Relaxed),
            slot: Mutex::new(None),
        }
    }
}

impl Default for SimpleReference {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectReference for SimpleReference {
    fn get(&self) -> Option<AnyArc> {
        self.slot.lock().clone()
    }

    fn get_or_try_init(
        &self,
        request: &InitRequest,
        init: &mut dyn FnMut() -> DiResult<AnyArc>,
    ) -> DiResult<AnyArc> {
        if let Some(existing) = self.get() {
            return Ok(existing);
        }
        let _claim = match init_graph::claim(self.id, request, || self.get())? {
            Turn::Ready(existing) => return Ok(existing),
            Turn::Build(claim) => claim,
        };
        let value = init()?;
        *self.slot.lock() = Some(value.clone());
        Ok(value)
    }

    fn clear(&self) -> Option<AnyArc> {
        self.slot.lock().take()
    }

    fn scope(&self) -> ReferenceScope {
        ReferenceScope::Process
    }
}

impl fmt::Debug for SimpleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleReference")
            .field("set", &self.slot.lock().is_some())
            .finish()
    }
}

static NEXT_REFERENCE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SLOTS: RefCell<HashMap<u64, AnyArc>> = RefCell::new(HashMap::new());
}

/// Per-thread cell.
///
/// Each thread owns its own slot, so no locking is involved. Values stored
/// by a thread are dropped when that thread exits or when it calls
/// [`clear`](ObjectReference::clear).
pub struct ThreadLocalReference {
    id: u64,
}

impl ThreadLocalReference {
    pub fn new() -> Self {
        Self {
            id: NEXT_REFERENCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for ThreadLocalReference {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectReference for ThreadLocalReference {
    fn get(&self) -> Option<AnyArc> {
        SLOTS.with(|slots| slots.borrow().get(&self.id).cloned())
    }

    fn get_or_try_init(
        &self,
        _request: &InitRequest,
        init: &mut dyn FnMut() -> DiResult<AnyArc>,
    ) -> DiResult<AnyArc> {
        if let Some(existing) = self.get() {
            return Ok(existing);
        }
        // No borrow held here: init may resolve other thread-local components
        let value = init()?;
        SLOTS.with(|slots| {
            slots.borrow_mut().insert(self.id, value.clone());
        });
        Ok(value)
    }

    fn clear(&self) -> Option<AnyArc> {
        SLOTS.with(|slots| slots.borrow_mut().remove(&self.id))
    }

    fn scope(&self) -> ReferenceScope {
        ReferenceScope::Thread
    }
}

impl Drop for ThreadLocalReference {
    fn drop(&mut self) {
        // Values other threads stored stay alive until those threads exit
        let _ = SLOTS.try_with(|slots| slots.borrow_mut().remove(&self.id));
    }
}

impl fmt::Debug for ThreadLocalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocalReference")
            .field("id", &self.id)
            .field("set_on_current_thread", &self.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request() -> InitRequest {
        InitRequest::new(Key::named("cell"), &[Key::named("cell")])
    }

    #[test]
    fn simple_reference_keeps_first_value() {
        let cell = SimpleReference::new();
        let first = cell.get_or_try_init(&request(), &mut || Ok(Arc::new(1u32) as AnyArc)).unwrap();
        let second = cell.get_or_try_init(&request(), &mut || Ok(Arc::new(2u32) as AnyArc)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cell.clear().is_some());
        assert!(cell.get().is_none());
    }

    #[test]
    fn failed_build_releases_the_cell() {
        let cell = SimpleReference::new();
        assert!(cell
            .get_or_try_init(&request(), &mut || Err(crate::DiError::ContainerDisposed))
            .is_err());
        assert!(cell.get().is_none());
        let value = cell.get_or_try_init(&request(), &mut || Ok(Arc::new(3u32) as AnyArc)).unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&3));
    }

    #[test]
    fn failed_init_leaves_cell_empty() {
        let cell = ThreadLocalReference::new();
        let result = cell.get_or_try_init(&request(), &mut || Err(crate::DiError::ContainerDisposed));
        assert!(result.is_err());
        assert!(cell.get().is_none());
    }

    #[test]
    fn thread_local_reference_is_per_thread() {
        let cell = Arc::new(ThreadLocalReference::new());
        let here = cell.get_or_try_init(&request(), &mut || Ok(Arc::new(1u32) as AnyArc)).unwrap();

        let remote = Arc::clone(&cell);
        let seen_empty = std::thread::spawn(move || remote.get().is_none())
            .join()
            .unwrap();

        assert!(seen_empty);
        assert!(Arc::ptr_eq(&here, &cell.get().unwrap()));
    }
}
