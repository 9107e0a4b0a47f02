//! Implementation descriptors: what to construct and what it depends on.

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::adapter::AnyArc;
use crate::behaviors::{InstanceSource, ThreadLocalProxy};
use crate::error::{DiError, DiResult};
use crate::key::{key_of_type, Key};

type Constructor = Arc<dyn Fn(&mut Arguments) -> DiResult<AnyArc> + Send + Sync>;
type ProxyMaker = fn(Arc<dyn InstanceSource>) -> AnyArc;

/// Identity of a concrete implementation type.
///
/// This is what a [`LifecycleStrategy`](crate::LifecycleStrategy) inspects to
/// decide whether a component participates in start/stop/dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplementationType {
    id: TypeId,
    name: &'static str,
}

impl ImplementationType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type key for this implementation.
    pub fn key(&self) -> Key {
        Key::Type(self.id, self.name)
    }
}

/// Describes how to build one component: its concrete type, its declared
/// dependency signature (in constructor order) and the constructor itself.
///
/// # Examples
///
/// ```rust
/// use ferrous_adapters::{Implementation, key_of_type};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
///
/// let config = Implementation::of(|_| Ok(Config { port: 8080 }));
/// let server = Implementation::of(|args| Ok(Server { config: args.take::<Config>()? }))
///     .depends_on::<Config>();
///
/// assert!(config.dependencies().is_empty());
/// assert_eq!(server.dependencies(), &[key_of_type::<Config>()]);
/// ```
#[derive(Clone)]
pub struct Implementation {
    ty: ImplementationType,
    dependencies: Vec<Key>,
    ctor: Constructor,
    proxy: ProxyMaker,
}

impl Implementation {
    /// Describes an implementation of type `T` built by `ctor`.
    pub fn of<T, F>(ctor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            ty: ImplementationType::of::<T>(),
            dependencies: Vec::new(),
            ctor: Arc::new(move |args| ctor(args).map(|value| Arc::new(value) as AnyArc)),
            proxy: proxy_for::<T>,
        }
    }

    /// Appends a dependency on the component registered under `D`'s type key.
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        self.dependencies.push(key_of_type::<D>());
        self
    }

    /// Appends a dependency on an arbitrary key.
    pub fn depends_on_key(mut self, key: impl Into<Key>) -> Self {
        self.dependencies.push(key.into());
        self
    }

    pub fn implementation_type(&self) -> &ImplementationType {
        &self.ty
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name
    }

    /// Declared dependency signature, in constructor order.
    pub fn dependencies(&self) -> &[Key] {
        &self.dependencies
    }

    pub(crate) fn construct(&self, args: &mut Arguments) -> DiResult<AnyArc> {
        (self.ctor)(args)
    }

    pub(crate) fn make_proxy(&self, source: Arc<dyn InstanceSource>) -> AnyArc {
        (self.proxy)(source)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("type", &self.ty.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

fn proxy_for<T: Send + Sync + 'static>(source: Arc<dyn InstanceSource>) -> AnyArc {
    Arc::new(ThreadLocalProxy::<T>::new(source))
}

/// Resolved constructor arguments, in declaration order.
///
/// Constructors pull typed values either positionally with [`get`](Self::get)
/// or sequentially with [`take`](Self::take).
pub struct Arguments {
    owner: Key,
    values: Vec<AnyArc>,
    cursor: usize,
}

impl Arguments {
    pub(crate) fn new(owner: Key, values: Vec<AnyArc>) -> Self {
        Self {
            owner,
            values,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Key of the component these arguments are being resolved for.
    pub fn owner(&self) -> &Key {
        &self.owner
    }

    /// Typed access to the argument at `index`.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        let value = self.values.get(index).ok_or_else(|| DiError::InvalidRegistration {
            key: self.owner.clone(),
            reason: format!(
                "argument {} requested but only {} resolved",
                index,
                self.values.len()
            ),
        })?;
        value.clone().downcast::<T>().map_err(|_| DiError::TypeMismatch {
            key: self.owner.clone(),
            expected: type_name::<T>(),
        })
    }

    /// Typed access to the next unread argument.
    pub fn take<T: Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        let value = self.get::<T>(self.cursor)?;
        self.cursor += 1;
        Ok(value)
    }

    /// Untyped access to the argument at `index`.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<AnyArc> {
        self.values
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("len", &self.values.len())
            .finish()
    }
}
