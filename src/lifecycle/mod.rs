//! Lifecycle state machine and strategies.
//!
//! Every lifecycle-managed instance (and the container itself) moves through
//!
//! ```text
//! Unstarted ──start──► Started ──stop──► Stopped ──dispose──► Disposed
//!     └───────────────────────dispose───────────────────────────┘
//! ```
//!
//! `start` on `Started` and `stop` on anything but `Started` are no-ops.
//! Everything else outside the arrows is a [`DiError::LifecycleTransition`].

use std::fmt;

#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

mod strategy;

pub use strategy::{LifecycleStrategy, NullLifecycleStrategy, StartableLifecycleStrategy};

/// Lifecycle state of one instance or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum LifecycleState {
    #[default]
    Unstarted,
    Started,
    Stopped,
    Disposed,
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum LifecycleAction {
    Start,
    Stop,
    Dispose,
}

impl LifecycleState {
    /// Resolves `action` against this state.
    ///
    /// Returns `Ok(Some(next))` when the hook must run and the state change,
    /// `Ok(None)` for a no-op and an error for a forbidden transition.
    ///
    /// ```rust
    /// use ferrous_adapters::{LifecycleAction, LifecycleState};
    ///
    /// let started = LifecycleState::Unstarted.next("db", LifecycleAction::Start).unwrap();
    /// assert_eq!(started, Some(LifecycleState::Started));
    /// assert_eq!(LifecycleState::Started.next("db", LifecycleAction::Start).unwrap(), None);
    /// assert!(LifecycleState::Disposed.next("db", LifecycleAction::Dispose).is_err());
    /// ```
    pub fn next(
        self,
        subject: impl fmt::Display,
        action: LifecycleAction,
    ) -> DiResult<Option<LifecycleState>> {
        use LifecycleAction::*;
        use LifecycleState::*;

        match (self, action) {
            (Unstarted, Start) => Ok(Some(Started)),
            (Started, Start) => Ok(None),
            (Started, Stop) => Ok(Some(Stopped)),
            (Unstarted | Stopped, Stop) => Ok(None),
            (Unstarted | Stopped, Dispose) => Ok(Some(Disposed)),
            (Stopped, Start) | (Started, Dispose) | (Disposed, _) => {
                Err(DiError::LifecycleTransition {
                    subject: subject.to_string(),
                    from: self,
                    action,
                })
            }
        }
    }

    pub fn is_started(self) -> bool {
        self == LifecycleState::Started
    }

    pub fn is_disposed(self) -> bool {
        self == LifecycleState::Disposed
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unstarted => "unstarted",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Dispose => "dispose",
        };
        f.write_str(name)
    }
}
