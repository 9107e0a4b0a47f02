//! # ferrous-adapters
//!
//! Component adapters and composable behaviors for dependency injection.
//!
//! A component is registered once as a chain of adapters: a leaf
//! [`ConstructorInjector`] that knows how to build the component and which
//! dependencies it declares, wrapped by behaviors that each add one
//! cross-cutting concern without touching construction.
//!
//! ## Features
//!
//! - **Caching**: process-wide or per-thread singletons through an injected storage cell
//! - **Thread isolation**: a per-thread cache, or a proxy that redirects every access to the calling thread's instance
//! - **Lifecycle forcing**: make any component participate in start/stop/dispose
//! - **Verification**: dry-run the dependency graph without constructing anything
//! - **Cycle detection**: per-resolution cycle guard with the full path in the error
//! - **Ordered teardown**: stop then dispose in reverse construction order, collecting every error
//! - **Monitors**: observe injector creation, behavior wrapping, instantiation and deployments
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_adapters::{Automating, Caching, Container, Implementation, key_of_type};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::builder()
//!     .factory(Automating::new().wrap(Caching::new()))
//!     .build();
//!
//! container
//!     .add_component(
//!         key_of_type::<Database>(),
//!         Implementation::of(|_| Ok(Database { connection_string: "postgres://localhost".into() })),
//!         vec![],
//!     )
//!     .unwrap();
//! container
//!     .add_component(
//!         key_of_type::<UserService>(),
//!         Implementation::of(|args| Ok(UserService { db: args.take::<Database>()? }))
//!             .depends_on::<Database>(),
//!         vec![],
//!     )
//!     .unwrap();
//!
//! container.verify().unwrap();
//! container.start().unwrap();
//!
//! let users = container.get::<UserService>(&key_of_type::<UserService>()).unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//!
//! container.dispose().unwrap();
//! ```
//!
//! ## Behavior Chains
//!
//! Factories nest the same way the adapters they produce do.
//! `Automating::new().wrap(Caching::new())` builds
//! `Automated(Cached(ConstructorInjector))` for every registration. Each
//! wrap is reported to the [`ComponentMonitor`], which may substitute the
//! adapter.
//!
//! ## Thread Isolation
//!
//! [`ThreadLocalizing`] runs in one of two [`ScopeIsolation`] modes. The
//! default, `AlwaysIsolate`, resolves to a [`ThreadLocalProxy`] that is safe
//! to share; `ScopeEnsuresIsolation` caches per thread and relies on every
//! consumer resolving on its own thread.

pub mod adapter;
pub mod behaviors;
pub mod config;
pub mod container;
pub mod deployment;
pub mod error;
pub mod implementation;
pub mod key;
pub mod lifecycle;
pub mod monitor;
pub mod parameter;
pub mod reference;
#[cfg(feature = "snapshot")]
pub mod snapshot;
pub mod traits;

mod internal;

pub use adapter::{
    behavior_chain, describe_chain, AnyArc, BehaviorKind, ComponentAdapter, ComponentRegistry,
    ConstructorInjector, ResolutionContext, DEFAULT_MAX_DEPTH,
};
pub use behaviors::{
    characteristics, Automated, Automating, BehaviorFactoryBase, Cached, Caching, Characteristic,
    ComponentFactory, ConstructorInjection, InstanceSource, Properties, ScopeIsolation,
    ThreadLocalProxy, ThreadLocalized, ThreadLocalizing,
};
pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder};
pub use deployment::{deploy, DiscoveryError};
pub use error::{DiError, DiResult};
pub use implementation::{Arguments, Implementation, ImplementationType};
pub use key::{key_of_type, Key};
pub use lifecycle::{
    LifecycleAction, LifecycleState, LifecycleStrategy, NullLifecycleStrategy,
    StartableLifecycleStrategy,
};
pub use monitor::{ComponentMonitor, DeploymentMonitor, LoggingMonitor, NullMonitor};
pub use parameter::{ConstantValue, Parameter};
pub use reference::{
    InitRequest, ObjectReference, ReferenceScope, SimpleReference, ThreadLocalReference,
};
#[cfg(feature = "snapshot")]
pub use snapshot::{
    AdapterSnapshot, ContainerSnapshot, ImplementationCatalog, KeySnapshot, ParameterSnapshot,
};
pub use traits::{Dispose, Startable};
