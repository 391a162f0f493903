use crate::di::{Container, ContextParams};
use crate::error::{Result, ScopewireError};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased resolved value, shared across every consumer that receives it.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identity token for a kind of value the container produces or requires.
///
/// Equality and hashing only consider the `TypeId`; the type name is kept
/// for error messages and logs.
#[derive(Clone, Copy)]
pub struct DependencyType {
    id: TypeId,
    name: &'static str,
}

impl DependencyType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for DependencyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DependencyType {}

impl Hash for DependencyType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A single constructor parameter as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// Receives the live context map; never part of the graph.
    Context,
    /// Resolved through the graph.
    Dependency(DependencyType),
}

impl Parameter {
    /// Parameter requiring `ty`. The context marker type becomes `Context`.
    pub fn of(ty: DependencyType) -> Self {
        if ty == DependencyType::of::<ContextParams>() {
            Parameter::Context
        } else {
            Parameter::Dependency(ty)
        }
    }

    /// The graph dependency behind this parameter, if any.
    pub fn dependency_type(&self) -> Option<DependencyType> {
        match *self {
            Parameter::Dependency(ty) if ty != DependencyType::of::<ContextParams>() => Some(ty),
            _ => None,
        }
    }
}

/// A value resolved from the container, resolved either as a constructor
/// argument or as a top-level request.
pub enum Argument {
    Context(ContextParams),
    Instance(Instance),
}

impl Argument {
    /// Downcasts a resolved value. The context map only downcasts to
    /// `ContextParams`.
    pub fn downcast<T: Send + Sync + 'static>(self) -> Result<Arc<T>> {
        downcast_instance(self.into_instance())
    }

    /// Type-erases the argument; the context map becomes a fresh instance.
    pub fn into_instance(self) -> Instance {
        match self {
            Argument::Instance(instance) => instance,
            Argument::Context(params) => Arc::new(params),
        }
    }

    pub fn into_context(self) -> Option<ContextParams> {
        match self {
            Argument::Context(params) => Some(params),
            Argument::Instance(_) => None,
        }
    }
}

pub(crate) fn downcast_instance<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ScopewireError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })
}

/// Types that can appear as constructor parameters, `Injectable` fields, or
/// `invoke` arguments.
///
/// Implemented for `Arc<T>` (a graph dependency on `T`) and for
/// [`ContextParams`] (the context marker).
pub trait Dependency: Sized + 'static {
    fn parameter() -> Parameter;

    /// Resolves the value as an argument of another constructor: caches are
    /// consulted before the full resolution path.
    fn from_argument(container: &Container) -> Result<Self>;

    /// Resolves the value as a top-level request (`get`/`invoke`).
    fn from_request(container: &Container) -> Result<Self>;
}

impl<T: Send + Sync + 'static> Dependency for Arc<T> {
    fn parameter() -> Parameter {
        Parameter::of(DependencyType::of::<T>())
    }

    fn from_argument(container: &Container) -> Result<Self> {
        container
            .resolve_argument(Self::parameter())?
            .downcast::<T>()
    }

    fn from_request(container: &Container) -> Result<Self> {
        container.resolve(Self::parameter())?.downcast::<T>()
    }
}

impl Dependency for ContextParams {
    fn parameter() -> Parameter {
        Parameter::Context
    }

    fn from_argument(container: &Container) -> Result<Self> {
        Ok(container.context().clone())
    }

    fn from_request(container: &Container) -> Result<Self> {
        Ok(container.context().clone())
    }
}
