use crate::di::{Argument, Container, DependencyType, Instance, Lifetime, Parameter, TypeGraph};
use crate::error::{Result, ScopewireError};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds one instance, resolving its own arguments from the container it
/// is handed.
pub(crate) type ConstructorFn = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// Untyped constructor callable used by manifests.
pub type ManifestFn = Arc<dyn Fn(Vec<Argument>) -> anyhow::Result<Instance> + Send + Sync>;

/// A validated registration, ready to be inserted into the registry.
pub(crate) struct Registration {
    pub(crate) produced: DependencyType,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) lifetime: Lifetime,
    pub(crate) constructor: ConstructorFn,
}

/// Explicit description of a constructor whose signature is only known at
/// runtime.
///
/// Typed registration through [`Container::register`] is checked by the
/// compiler; a manifest is checked by [`Container::register_manifest`]
/// instead, which is where `NotAFunction` and `OnlyOneOutParam` come from.
///
/// # Example
/// ```
/// use scopewire::{ConstructorManifest, Container, DependencyType, Instance, Lifetime};
/// use std::sync::Arc;
///
/// struct Port(u16);
///
/// let manifest = ConstructorManifest::new(Lifetime::Singleton)
///     .produces(DependencyType::of::<Port>())
///     .call(|_args| Ok(Arc::new(Port(8080)) as Instance));
///
/// let container = Container::new();
/// container.register_manifest(manifest).unwrap();
/// container.build().unwrap();
/// assert_eq!(container.get::<Port>().unwrap().0, 8080);
/// ```
#[derive(Clone)]
pub struct ConstructorManifest {
    produces: Vec<DependencyType>,
    parameters: Vec<Parameter>,
    lifetime: Lifetime,
    callable: Option<ManifestFn>,
}

impl ConstructorManifest {
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            produces: Vec::new(),
            parameters: Vec::new(),
            lifetime,
            callable: None,
        }
    }

    pub fn produces(mut self, ty: DependencyType) -> Self {
        self.produces.push(ty);
        self
    }

    /// Adds a parameter resolved as `ty`. Requiring [`ContextParams`](crate::ContextParams)
    /// is the same as [`ConstructorManifest::requires_context`].
    pub fn requires(mut self, ty: DependencyType) -> Self {
        self.parameters.push(Parameter::of(ty));
        self
    }

    /// Adds a parameter that receives the container's context map.
    pub fn requires_context(mut self) -> Self {
        self.parameters.push(Parameter::Context);
        self
    }

    pub fn call<F>(mut self, callable: F) -> Self
    where
        F: Fn(Vec<Argument>) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        self.callable = Some(Arc::new(callable));
        self
    }

    pub(crate) fn into_registration(self) -> Result<Registration> {
        let callable = self.callable.ok_or(ScopewireError::NotAFunction)?;
        let produced = match self.produces.as_slice() {
            [ty] => *ty,
            other => {
                return Err(ScopewireError::OnlyOneOutParam {
                    produced: other.len(),
                });
            }
        };

        let parameters = self.parameters;
        let resolved = parameters.clone();
        let constructor: ConstructorFn = Arc::new(move |container: &Container| {
            let args = resolved
                .iter()
                .map(|parameter| container.resolve_argument(*parameter))
                .collect::<Result<Vec<_>>>()?;
            callable(args).map_err(|source| ScopewireError::ConstructorFailed {
                dependency: produced,
                source,
            })
        });

        Ok(Registration {
            produced,
            parameters,
            lifetime: self.lifetime,
            constructor,
        })
    }
}

/// Constructor table, lifetimes and dependency graph of a container family.
#[derive(Default)]
pub(crate) struct Registry {
    graph: TypeGraph,
    /// `None` marks a type that is required but has no constructor yet.
    constructors: HashMap<DependencyType, Option<ConstructorFn>>,
    lifetimes: HashMap<DependencyType, Lifetime>,
}

impl Registry {
    pub(crate) fn insert(&mut self, registration: Registration) -> Result<()> {
        let produced = registration.produced;
        if matches!(self.constructors.get(&produced), Some(Some(_))) {
            return Err(ScopewireError::AlreadyRegistered {
                dependency: produced,
            });
        }

        self.graph.add_dependency(produced, None);
        for required in registration
            .parameters
            .iter()
            .filter_map(Parameter::dependency_type)
        {
            self.graph.add_dependency(produced, Some(required));
            self.constructors.entry(required).or_insert(None);
        }

        self.lifetimes.insert(produced, registration.lifetime);
        self.constructors
            .insert(produced, Some(registration.constructor));
        Ok(())
    }

    pub(crate) fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Looks up the constructor and lifetime of `ty`.
    pub(crate) fn lookup(&self, ty: DependencyType) -> Result<(ConstructorFn, Lifetime)> {
        let constructor = self
            .constructors
            .get(&ty)
            .and_then(|constructor| constructor.clone())
            .ok_or(ScopewireError::NotRegistered { dependency: ty })?;
        let lifetime = self
            .lifetimes
            .get(&ty)
            .copied()
            .ok_or(ScopewireError::UnknownLifetime { dependency: ty })?;
        Ok((constructor, lifetime))
    }

    /// Every type that is required by some registration but never got a
    /// constructor.
    pub(crate) fn placeholders(&self) -> Vec<DependencyType> {
        self.constructors
            .iter()
            .filter(|(_, constructor)| constructor.is_none())
            .map(|(ty, _)| *ty)
            .collect()
    }

    pub(crate) fn lifetime_of(&self, ty: &DependencyType) -> Option<Lifetime> {
        self.lifetimes.get(ty).copied()
    }

    pub(crate) fn is_registered(&self, ty: &DependencyType) -> bool {
        matches!(self.constructors.get(ty), Some(Some(_)))
    }

    /// Number of types with a real constructor.
    pub(crate) fn len(&self) -> usize {
        self.lifetimes.len()
    }

    #[cfg(test)]
    pub(crate) fn forget_lifetime(&mut self, ty: &DependencyType) {
        self.lifetimes.remove(ty);
    }
}
