//! Internal implementation details.

pub(crate) mod guard;
pub(crate) mod init_graph;
pub(crate) mod managed;

pub(crate) use managed::ManagedInstance;
