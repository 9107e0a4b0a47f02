//! Traits implemented by components.

mod lifecycle;

pub use lifecycle::{Dispose, Startable};
