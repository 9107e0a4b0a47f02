//! Cross-thread coordination for process-wide cells.
//!
//! A process-wide cell is built without holding its lock, so building it may
//! resolve other cells. A thread that finds a cell being built elsewhere waits
//! for the builder. Before waiting it follows the chain of waits: if the chain
//! leads back to itself, nobody would ever finish, and the caller gets the
//! dependency cycle instead.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

use crate::adapter::AnyArc;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::reference::InitRequest;

struct Claim {
    thread: ThreadId,
    key: Key,
}

#[derive(Default)]
struct WaitGraph {
    /// Cell id to the thread building it
    builders: HashMap<u64, Claim>,
    /// Thread to the cell it waits on, with the request that led there
    waiting: HashMap<ThreadId, (u64, InitRequest)>,
}

static GRAPH: Lazy<Mutex<WaitGraph>> = Lazy::new(|| Mutex::new(WaitGraph::default()));
static BUILT: Condvar = Condvar::new();

pub(crate) enum Turn {
    /// Another thread finished building the cell
    Ready(AnyArc),
    /// The calling thread builds; the claim is released on drop
    Build(BuildClaim),
}

pub(crate) struct BuildClaim {
    cell: u64,
}

impl Drop for BuildClaim {
    fn drop(&mut self) {
        GRAPH.lock().builders.remove(&self.cell);
        BUILT.notify_all();
    }
}

/// Waits until `cell` is either built or free to be built by this thread.
///
/// `ready` reads the cell and is called with the graph locked.
pub(crate) fn claim<F>(cell: u64, request: &InitRequest, ready: F) -> DiResult<Turn>
where
    F: Fn() -> Option<AnyArc>,
{
    let me = thread::current().id();
    let mut graph = GRAPH.lock();
    loop {
        if let Some(value) = ready() {
            return Ok(Turn::Ready(value));
        }

        let builder = match graph.builders.get(&cell).map(|c| c.thread) {
            Some(thread) => thread,
            None => {
                graph.builders.insert(
                    cell,
                    Claim {
                        thread: me,
                        key: request.key().clone(),
                    },
                );
                return Ok(Turn::Build(BuildClaim { cell }));
            }
        };

        if builder == me {
            // Re-entered while this thread is still building the cell
            return Err(DiError::Circular(segment(
                request.path(),
                request.key(),
                request.key(),
                true,
            )));
        }
        if let Some(path) = graph.cycle(cell, me, request) {
            tracing::debug!(key = %request.key(), "cross-thread dependency cycle");
            return Err(DiError::Circular(path));
        }

        graph.waiting.insert(me, (cell, request.clone()));
        BUILT.wait(&mut graph);
        graph.waiting.remove(&me);
    }
}

impl WaitGraph {
    /// Path of the dependency cycle `me` would close by waiting on `cell`.
    fn cycle(&self, cell: u64, me: ThreadId, request: &InitRequest) -> Option<Vec<Key>> {
        let mut hops: Vec<&InitRequest> = Vec::new();
        let mut current = cell;
        loop {
            let claim = self.builders.get(&current)?;
            if claim.thread == me {
                return Some(assemble(request, &hops, &claim.key));
            }
            let (next, waiting) = self.waiting.get(&claim.thread)?;
            hops.push(waiting);
            // A loop among other threads is theirs to report
            if hops.len() > self.waiting.len() {
                return None;
            }
            current = *next;
        }
    }
}

/// Joins the resolution paths of every thread on the wait chain.
///
/// `own` is the cell this thread already builds and the chain ends on.
fn assemble(request: &InitRequest, hops: &[&InitRequest], own: &Key) -> Vec<Key> {
    let mut path = segment(request.path(), own, request.key(), true);
    let mut previous = request.key();
    for hop in hops {
        path.extend(segment(hop.path(), previous, hop.key(), false));
        previous = hop.key();
    }
    path
}

/// Part of `path` starting at `from` and ending with `last`.
fn segment(path: &[Key], from: &Key, last: &Key, inclusive: bool) -> Vec<Key> {
    let mut out = match path.iter().position(|k| k == from) {
        Some(pos) if inclusive => path[pos..].to_vec(),
        Some(pos) => path[pos + 1..].to_vec(),
        None if inclusive => vec![from.clone()],
        None => Vec::new(),
    };
    if out.last() != Some(last) || (inclusive && out.len() == 1 && from == last) {
        out.push(last.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<Key> {
        names.iter().map(|n| Key::named(*n)).collect()
    }

    #[test]
    fn segment_bounds() {
        let path = keys(&["root", "A", "B"]);
        assert_eq!(segment(&path, &Key::named("A"), &Key::named("B"), true), keys(&["A", "B"]));
        assert_eq!(segment(&path, &Key::named("A"), &Key::named("B"), false), keys(&["B"]));
        assert_eq!(segment(&path, &Key::named("B"), &Key::named("B"), true), keys(&["B", "B"]));
    }

    #[test]
    fn assemble_joins_two_threads() {
        // This thread builds B and wants A; the other builds A and waits on B
        let mine = InitRequest::new(Key::named("A"), &keys(&["B", "A"]));
        let theirs = InitRequest::new(Key::named("B"), &keys(&["A", "C", "B"]));
        assert_eq!(
            assemble(&mine, &[&theirs], &Key::named("B")),
            keys(&["B", "A", "C", "B"])
        );
    }

    #[test]
    fn build_claim_is_released_on_drop() {
        let request = InitRequest::new(Key::named("solo"), &keys(&["solo"]));
        let cell = u64::MAX - 7;
        match claim(cell, &request, || None).unwrap() {
            Turn::Build(held) => drop(held),
            Turn::Ready(_) => panic!("cell was never built"),
        }
        assert!(matches!(claim(cell, &request, || None).unwrap(), Turn::Build(_)));
    }
}
