use crate::config::ConfigService;
use crate::di::constructor::{self, Constructor, FallibleConstructor, Invocable};
use crate::di::dependency::downcast_instance;
use crate::di::registry::{ConstructorFn, Registration, Registry};
use crate::di::{
    Argument, ConstructorManifest, ContextParams, DependencyType, Injectable, Instance, Lifetime,
    Parameter, ScopeKind,
};
use crate::error::{CyclePath, Result, ScopewireError};
use crate::module::Module;
use dashmap::DashMap;
use std::any::Any;
use std::cell::RefCell;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

type Cache = DashMap<DependencyType, Instance>;

/// State shared by a root container and every container derived from it.
#[derive(Default)]
struct Family {
    registry: RwLock<Registry>,
    singletons: Cache,
}

thread_local! {
    /// Types currently being constructed on this thread, innermost last,
    /// tagged with the address of their family.
    static CONSTRUCTING: RefCell<Vec<(usize, DependencyType)>> = const { RefCell::new(Vec::new()) };
}

/// Pops the construction stack when a constructor returns or fails.
struct ConstructionGuard;

impl ConstructionGuard {
    fn enter(family: usize, ty: DependencyType) -> Result<Self> {
        CONSTRUCTING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|entry| *entry == (family, ty)) {
                let mut path: Vec<_> = stack[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == family)
                    .map(|(_, entry)| *entry)
                    .collect();
                path.push(ty);
                return Err(ScopewireError::CyclicDependency {
                    dependency: ty,
                    cycle: CyclePath(path),
                });
            }
            stack.push((family, ty));
            Ok(ConstructionGuard)
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Lifetime-aware dependency container.
///
/// A root container is created with [`Container::new`]. Constructors are
/// registered, [`Container::build`] validates the graph and builds the
/// singletons, and values are then resolved with [`Container::get`] or
/// [`Container::invoke`].
///
/// [`Container::scoped`] and [`Container::with_context`] derive new
/// containers that share the registry and the singleton cache with their
/// source. A scoped container owns its own cache for `Scoped` values.
///
/// # Example
/// ```
/// use scopewire::{Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Database;
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let container = Container::new();
/// container.register(|| Database, Lifetime::Singleton).unwrap();
/// container
///     .register(|db: Arc<Database>| UserService { db }, Lifetime::Scoped)
///     .unwrap();
/// container.build().unwrap();
///
/// let request = container.scoped();
/// let first = request.get::<UserService>().unwrap();
/// let second = request.get::<UserService>().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct Container {
    id: Uuid,
    family: Arc<Family>,
    scoped: Option<Arc<Cache>>,
    /// Singletons of a build in progress; replaces the family cache for
    /// lookups until the build succeeds.
    staging: Option<Arc<Cache>>,
    context: ContextParams,
    scope: ScopeKind,
}

impl Container {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            family: Arc::new(Family::default()),
            scoped: None,
            staging: None,
            context: ContextParams::new(),
            scope: ScopeKind::Main,
        }
    }

    /// Identifier of this container, reported in log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scope_kind(&self) -> ScopeKind {
        self.scope
    }

    pub fn context(&self) -> &ContextParams {
        &self.context
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.family
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.family
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a constructor for its return type.
    ///
    /// Every parameter is either `Arc<T>`, a dependency on `T`, or
    /// [`ContextParams`], which receives the resolving container's context
    /// and is not part of the dependency graph.
    ///
    /// # Errors
    /// `AlreadyRegistered` if the return type already has a constructor.
    pub fn register<C, Args>(&self, constructor: C, lifetime: Lifetime) -> Result<()>
    where
        C: Constructor<Args>,
    {
        self.insert(constructor::registration(constructor, lifetime))
    }

    /// Registers a constructor returning `Result<T, E>`; the registered type
    /// is `T`.
    pub fn try_register<C, Args>(&self, constructor: C, lifetime: Lifetime) -> Result<()>
    where
        C: FallibleConstructor<Args>,
    {
        self.insert(constructor::fallible_registration(constructor, lifetime))
    }

    /// Registers a constructor described by an explicit manifest.
    ///
    /// # Errors
    /// `NotAFunction` if the manifest has no callable, `OnlyOneOutParam` if it
    /// does not produce exactly one type, `AlreadyRegistered` as for
    /// [`Container::register`].
    pub fn register_manifest(&self, manifest: ConstructorManifest) -> Result<()> {
        self.insert(manifest.into_registration()?)
    }

    /// Registers an [`Injectable`] type, usually one deriving it.
    pub fn register_injectable<T: Injectable>(&self, lifetime: Lifetime) -> Result<()> {
        let constructor: ConstructorFn = Arc::new(|container: &Container| {
            let value = T::inject(container)?;
            Ok(Arc::new(value) as Instance)
        });
        self.insert(Registration {
            produced: DependencyType::of::<T>(),
            parameters: T::parameters(),
            lifetime,
            constructor,
        })
    }

    /// Registers every provider of a module.
    pub fn import<M: Module>(&self) -> Result<()> {
        tracing::debug!(module = std::any::type_name::<M>(), "Importing module");
        M::register(self)
    }

    fn insert(&self, registration: Registration) -> Result<()> {
        let produced = registration.produced;
        let lifetime = registration.lifetime;
        let parameters = registration.parameters.len();

        self.write_registry().insert(registration).inspect_err(|e| {
            tracing::debug!(dependency = %produced, "Registration rejected: {}", e);
        })?;

        tracing::debug!(
            dependency = %produced,
            %lifetime,
            parameters,
            "Registered constructor"
        );
        Ok(())
    }

    /// Validates the registrations and builds every singleton.
    ///
    /// Fails on the first dependency cycle found. Otherwise every type that
    /// is required but was never registered is reported together in one
    /// `Multiple` error. Calling `build` again re-validates and rebuilds the
    /// singletons; the previous singletons stay in place until every new one
    /// has been constructed.
    pub fn build(&self) -> Result<()> {
        tracing::info!(container = %self.id, "Building container...");

        let singletons = {
            let registry = self.read_registry();

            if let Some(cycle) = registry.graph().detect_cycle() {
                let err = ScopewireError::CyclicDependency {
                    dependency: cycle.node(),
                    cycle: CyclePath(cycle.into_path()),
                };
                tracing::error!("Build failed: {}", err);
                return Err(err);
            }

            let missing = registry.placeholders();
            if !missing.is_empty() {
                tracing::error!(count = missing.len(), "Dependencies were not registered");
                return Err(ScopewireError::Multiple(
                    missing
                        .into_iter()
                        .map(|dependency| ScopewireError::NotRegistered { dependency })
                        .collect(),
                ));
            }

            registry
                .graph()
                .topological_order()
                .into_iter()
                .filter(|ty| registry.lifetime_of(ty) == Some(Lifetime::Singleton))
                .collect::<Vec<_>>()
        };

        let built = Arc::new(Cache::new());
        let staged = Container {
            staging: Some(Arc::clone(&built)),
            ..self.clone()
        };
        for ty in &singletons {
            let (constructor, _) = self.read_registry().lookup(*ty)?;
            let instance = staged.construct(*ty, &constructor).inspect_err(|e| {
                tracing::error!(dependency = %ty, "Build failed: {}", e);
            })?;
            built.insert(*ty, instance);
        }
        drop(staged);

        for entry in built.iter() {
            self.family
                .singletons
                .insert(*entry.key(), Arc::clone(entry.value()));
        }
        self.family
            .singletons
            .retain(|ty, _| built.contains_key(ty));

        tracing::info!(
            container = %self.id,
            singletons = singletons.len(),
            "Container built"
        );
        Ok(())
    }

    /// Returns a request-scoped container: `Scoped` values are cached in a
    /// fresh cache owned by the new container.
    pub fn scoped(&self) -> Container {
        let scoped = Container {
            id: Uuid::new_v4(),
            family: Arc::clone(&self.family),
            scoped: Some(Arc::new(DashMap::new())),
            staging: self.staging.clone(),
            context: self.context.clone(),
            scope: ScopeKind::Request,
        };
        tracing::trace!(parent = %self.id, container = %scoped.id, "Created request scope");
        scoped
    }

    /// Returns a container whose context holds `key`; this container's context
    /// is unchanged. The scoped cache, if any, stays shared.
    pub fn with_context<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) -> Container {
        Container {
            id: Uuid::new_v4(),
            family: Arc::clone(&self.family),
            scoped: self.scoped.clone(),
            staging: self.staging.clone(),
            context: self.context.with(key, value),
            scope: self.scope,
        }
    }

    /// Returns a container whose context holds every entry of `config` as a
    /// `String`.
    pub fn with_config(&self, config: &ConfigService) -> Container {
        let context = config
            .entries()
            .into_iter()
            .fold(self.context.clone(), |context, (key, value)| {
                context.with(key, value)
            });
        Container {
            id: Uuid::new_v4(),
            family: Arc::clone(&self.family),
            scoped: self.scoped.clone(),
            staging: self.staging.clone(),
            context,
            scope: self.scope,
        }
    }

    /// Calls `f` with every parameter resolved from this container.
    ///
    /// # Errors
    /// The first resolution error among the parameters; `f` is not called.
    pub fn invoke<F, Args>(&self, f: F) -> Result<F::Output>
    where
        F: Invocable<Args>,
    {
        f.invoke(self)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast_instance(self.get_by_type(DependencyType::of::<T>())?)
    }

    /// Resolves a value by its type token. The [`ContextParams`] type
    /// resolves to this container's context map.
    pub fn get_by_type(&self, ty: DependencyType) -> Result<Instance> {
        Ok(self.resolve(Parameter::of(ty))?.into_instance())
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.read_registry()
            .is_registered(&DependencyType::of::<T>())
    }

    pub fn lifetime_of(&self, ty: DependencyType) -> Option<Lifetime> {
        self.read_registry().lifetime_of(&ty)
    }

    /// Number of registered constructors in the family.
    pub fn len(&self) -> usize {
        self.read_registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a top-level request, applying the lifetime of the requested
    /// type.
    pub(crate) fn resolve(&self, parameter: Parameter) -> Result<Argument> {
        let Some(ty) = parameter.dependency_type() else {
            return Ok(Argument::Context(self.context.clone()));
        };

        let (constructor, lifetime) = self.read_registry().lookup(ty)?;
        tracing::trace!(container = %self.id, dependency = %ty, %lifetime, "Resolving");

        let instance = match lifetime {
            Lifetime::Singleton => match cached(self.singleton_cache(), &ty) {
                Some(instance) => instance,
                None => {
                    tracing::warn!(
                        dependency = %ty,
                        "Singleton missing from cache, constructing without caching"
                    );
                    self.construct(ty, &constructor)?
                }
            },
            Lifetime::Scoped => match self.scoped_cache() {
                Some(cache) => match cached(cache, &ty) {
                    Some(instance) => instance,
                    None => {
                        let instance = self.construct(ty, &constructor)?;
                        cache.insert(ty, Arc::clone(&instance));
                        instance
                    }
                },
                None => self.construct(ty, &constructor)?,
            },
            Lifetime::Transient => self.construct(ty, &constructor)?,
        };
        Ok(Argument::Instance(instance))
    }

    /// Resolves a constructor argument: the singleton cache and then the
    /// scoped cache are consulted before falling back to [`Container::resolve`].
    pub(crate) fn resolve_argument(&self, parameter: Parameter) -> Result<Argument> {
        if let Some(ty) = parameter.dependency_type() {
            let hit = cached(self.singleton_cache(), &ty)
                .or_else(|| self.scoped_cache().and_then(|cache| cached(cache, &ty)));
            if let Some(instance) = hit {
                return Ok(Argument::Instance(instance));
            }
        }
        self.resolve(parameter)
    }

    fn singleton_cache(&self) -> &Cache {
        self.staging.as_deref().unwrap_or(&self.family.singletons)
    }

    fn scoped_cache(&self) -> Option<&Cache> {
        match self.scope {
            ScopeKind::Request => self.scoped.as_deref(),
            ScopeKind::Main => None,
        }
    }

    fn construct(&self, ty: DependencyType, constructor: &ConstructorFn) -> Result<Instance> {
        let _guard = ConstructionGuard::enter(Arc::as_ptr(&self.family) as usize, ty)?;
        constructor(self)
    }
}

fn cached(cache: &Cache, ty: &DependencyType) -> Option<Instance> {
    cache.get(ty).map(|entry| Arc::clone(entry.value()))
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Example {
        text: String,
    }

    struct Example2 {
        example: Arc<Example>,
    }

    struct Example3;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_simple() {
        init_tracing();
        let container = Container::new();
        container
            .register(|ex: Arc<Example>| Example2 { example: ex }, Lifetime::Transient)
            .unwrap();
        container
            .register(
                || Example {
                    text: "I was injected".to_string(),
                },
                Lifetime::Transient,
            )
            .unwrap();
        container.build().unwrap();

        container
            .invoke(|ex: Arc<Example>, ex2: Arc<Example2>| {
                assert_eq!(ex.text, "I was injected");
                assert_eq!(ex2.example.text, "I was injected");
            })
            .unwrap();
    }

    #[test]
    fn test_invoke_returns_value() {
        let container = Container::new();
        container.register(|| 21u32, Lifetime::Transient).unwrap();
        container.build().unwrap();

        let doubled = container.invoke(|n: Arc<u32>| *n * 2).unwrap();
        assert_eq!(doubled, 42);
    }

    #[test]
    fn test_singleton_built_once_and_shared_across_family() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let counter = Arc::clone(&calls);
        container
            .register(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Example {
                        text: "singleton".to_string(),
                    }
                },
                Lifetime::Singleton,
            )
            .unwrap();
        container
            .register(|ex: Arc<Example>| Example2 { example: ex }, Lifetime::Transient)
            .unwrap();
        container.build().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let root = container.get::<Example>().unwrap();
        let scoped = container.scoped().get::<Example>().unwrap();
        let with_context = container.with_context("k", 1u8).get::<Example>().unwrap();
        let wrapped = container.get::<Example2>().unwrap();

        assert!(Arc::ptr_eq(&root, &scoped));
        assert!(Arc::ptr_eq(&root, &with_context));
        assert!(Arc::ptr_eq(&root, &wrapped.example));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_consumed_by_singleton_is_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let container = Container::new();
        container
            .register(|ex: Arc<Example>| Example2 { example: ex }, Lifetime::Singleton)
            .unwrap();
        container
            .register(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Example {
                        text: String::new(),
                    }
                },
                Lifetime::Singleton,
            )
            .unwrap();
        container.build().unwrap();

        let ex = container.get::<Example>().unwrap();
        let ex2 = container.get::<Example2>().unwrap();
        assert!(Arc::ptr_eq(&ex, &ex2.example));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rebuild_reinstantiates_singletons() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let container = Container::new();
        container
            .register(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Example3
                },
                Lifetime::Singleton,
            )
            .unwrap();

        container.build().unwrap();
        let first = container.get::<Example3>().unwrap();
        container.build().unwrap();
        let second = container.get::<Example3>().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_singletons() {
        let failing = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&failing);
        let container = Container::new();
        container.register(|| Example3, Lifetime::Singleton).unwrap();
        container
            .try_register(
                move |_: Arc<Example3>| -> anyhow::Result<u32> {
                    if flag.load(Ordering::SeqCst) {
                        anyhow::bail!("boom");
                    }
                    Ok(42)
                },
                Lifetime::Singleton,
            )
            .unwrap();
        container.build().unwrap();
        let example = container.get::<Example3>().unwrap();
        let answer = container.get::<u32>().unwrap();

        failing.store(true, Ordering::SeqCst);
        let err = container.build().unwrap_err();
        assert!(matches!(err, ScopewireError::ConstructorFailed { .. }));

        assert!(Arc::ptr_eq(&container.get::<Example3>().unwrap(), &example));
        assert!(Arc::ptr_eq(&container.get::<u32>().unwrap(), &answer));
    }

    #[test]
    fn test_singleton_before_build_is_not_cached() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Singleton).unwrap();

        let first = container.get::<Example3>().unwrap();
        let second = container.get::<Example3>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_scoped_lifetime() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Scoped).unwrap();
        container.build().unwrap();

        let request = container.scoped();
        let a = request.get::<Example3>().unwrap();
        let b = request.get::<Example3>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let sibling = container.scoped();
        let c = sibling.get::<Example3>().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));

        let root_a = container.get::<Example3>().unwrap();
        let root_b = container.get::<Example3>().unwrap();
        assert!(!Arc::ptr_eq(&root_a, &root_b));
    }

    #[test]
    fn test_scoped_dependency_shared_within_request() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Scoped).unwrap();
        container
            .register(
                |_ex: Arc<Example3>| Example {
                    text: String::new(),
                },
                Lifetime::Transient,
            )
            .unwrap();
        container
            .register(
                |ex3: Arc<Example3>, _ex: Arc<Example>| (ex3,),
                Lifetime::Transient,
            )
            .unwrap();
        container.build().unwrap();

        let request = container.scoped();
        let direct = request.get::<Example3>().unwrap();
        let holder = request.get::<(Arc<Example3>,)>().unwrap();
        assert!(Arc::ptr_eq(&direct, &holder.0));
    }

    #[test]
    fn test_transient_is_fresh_at_top_level() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Transient).unwrap();
        container.build().unwrap();

        let a = container.get::<Example3>().unwrap();
        let b = container.get::<Example3>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let request = container.scoped();
        let c = request.get::<Example3>().unwrap();
        let d = request.get::<Example3>().unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
    }

    #[test]
    fn test_transient_dependency_is_fresh_per_consumer_within_request() {
        struct Left(Arc<Example3>);
        struct Right(Arc<Example3>);

        let container = Container::new();
        container.register(|| Example3, Lifetime::Transient).unwrap();
        container.register(|e: Arc<Example3>| Left(e), Lifetime::Transient).unwrap();
        container.register(|e: Arc<Example3>| Right(e), Lifetime::Transient).unwrap();
        container.build().unwrap();

        let request = container.scoped();
        let top = request.get::<Example3>().unwrap();
        let left = request.get::<Left>().unwrap();
        let right = request.get::<Right>().unwrap();

        assert!(!Arc::ptr_eq(&top, &left.0));
        assert!(!Arc::ptr_eq(&left.0, &right.0));
    }

    #[test]
    fn test_scenario_singleton_and_transient() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Singleton).unwrap();
        container
            .register(
                |a: Arc<Example3>| (a, Uuid::new_v4()),
                Lifetime::Transient,
            )
            .unwrap();
        container.build().unwrap();

        let a1 = container.get::<Example3>().unwrap();
        let a2 = container.get::<Example3>().unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));

        let b1 = container.get::<(Arc<Example3>, Uuid)>().unwrap();
        let b2 = container.get::<(Arc<Example3>, Uuid)>().unwrap();
        assert!(!Arc::ptr_eq(&b1, &b2));
        assert!(Arc::ptr_eq(&b1.0, &a1));
        assert!(Arc::ptr_eq(&b2.0, &a1));
    }

    #[test]
    fn test_with_context() {
        let container = Container::new();
        container
            .register(
                |params: ContextParams| Example {
                    text: params.get::<String>("text").cloned().unwrap_or_default(),
                },
                Lifetime::Transient,
            )
            .unwrap();
        container.build().unwrap();

        let value = "I was injected from container's context".to_string();
        let derived = container.with_context("text", value.clone());
        derived
            .invoke(|ex: Arc<Example>| assert_eq!(ex.text, value))
            .unwrap();

        assert!(container.context().is_empty());
        assert_eq!(container.get::<Example>().unwrap().text, "");
    }

    #[test]
    fn test_with_context_accumulates_and_keeps_scope() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Scoped).unwrap();
        container.build().unwrap();

        let request = container.scoped();
        let first = request.with_context("a", 1u8);
        let second = first.with_context("b", 2u8);

        assert_eq!(second.context().len(), 2);
        assert_eq!(first.context().len(), 1);
        assert!(request.context().is_empty());
        assert_eq!(second.scope_kind(), ScopeKind::Request);

        let from_request = request.get::<Example3>().unwrap();
        let from_derived = second.get::<Example3>().unwrap();
        assert!(Arc::ptr_eq(&from_request, &from_derived));

        let params = second.invoke(|params: ContextParams| params).unwrap();
        assert_eq!(params.get::<u8>("b"), Some(&2));
    }

    #[test]
    fn test_get_context_params() {
        let container = Container::new();
        container.build().unwrap();

        let derived = container.with_context("k", 1u8);
        let params = derived.get::<ContextParams>().unwrap();
        assert_eq!(params.get::<u8>("k"), Some(&1));

        let instance = derived
            .get_by_type(DependencyType::of::<ContextParams>())
            .unwrap();
        let params = downcast_instance::<ContextParams>(instance).unwrap();
        assert!(params.contains_key("k"));
        assert!(container.get::<ContextParams>().unwrap().is_empty());
    }

    #[test]
    fn test_manifest_requiring_context_type() {
        let container = Container::new();
        container
            .register_manifest(
                ConstructorManifest::new(Lifetime::Transient)
                    .produces(DependencyType::of::<String>())
                    .requires(DependencyType::of::<ContextParams>())
                    .call(|args| {
                        let params = args.into_iter().next().and_then(Argument::into_context);
                        let name = params
                            .and_then(|params| params.get::<&str>("name").copied())
                            .unwrap_or("nobody");
                        Ok(Arc::new(name.to_string()) as Instance)
                    }),
            )
            .unwrap();
        container.build().unwrap();

        let derived = container.with_context("name", "ada");
        assert_eq!(derived.get::<String>().unwrap().as_str(), "ada");
    }

    #[test]
    fn test_double_register() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Singleton).unwrap();
        let err = container
            .register(|| Example3, Lifetime::Transient)
            .unwrap_err();

        assert!(matches!(err, ScopewireError::AlreadyRegistered { .. }));
        assert!(err.to_string().ends_with("was already registered"));
        assert_eq!(
            container.lifetime_of(DependencyType::of::<Example3>()),
            Some(Lifetime::Singleton)
        );
    }

    #[test]
    fn test_cyclic_dependency() {
        let container = Container::new();
        container
            .register(|_: Arc<Example3>| Example { text: String::new() }, Lifetime::Transient)
            .unwrap();
        container
            .register(|ex: Arc<Example>| Example2 { example: ex }, Lifetime::Transient)
            .unwrap();
        container
            .register(|_: Arc<Example2>| Example3, Lifetime::Transient)
            .unwrap();

        let err = container.build().unwrap_err();
        assert!(err.is_cyclic());
        assert!(err.to_string().starts_with("cyclic dependency detected"));
        match err {
            ScopewireError::CyclicDependency { cycle, .. } => assert_eq!(cycle.0.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_without_build_is_reported_on_resolution() {
        #[derive(Debug)]
        struct Left;
        #[derive(Debug)]
        struct Right;

        let container = Container::new();
        container.register(|_: Arc<Right>| Left, Lifetime::Transient).unwrap();
        container.register(|_: Arc<Left>| Right, Lifetime::Transient).unwrap();

        assert!(container.build().unwrap_err().is_cyclic());
        assert!(container.get::<Left>().unwrap_err().is_cyclic());
        assert!(container.get::<Right>().unwrap_err().is_cyclic());
    }

    #[test]
    fn test_constructor_resolving_from_another_family() {
        let inner = Container::new();
        inner.register(|| 1u32, Lifetime::Transient).unwrap();
        inner.build().unwrap();

        let outer = Container::new();
        outer
            .register(move || *inner.get::<u32>().unwrap() + 1, Lifetime::Transient)
            .unwrap();
        outer.build().unwrap();

        assert_eq!(*outer.get::<u32>().unwrap(), 2);
    }

    #[test]
    fn test_unregistered_dependency() {
        let container = Container::new();
        container
            .register(|ex: Arc<Example>| Example2 { example: ex }, Lifetime::Transient)
            .unwrap();

        let err = container.build().unwrap_err();
        assert!(err.to_string().ends_with("was not registered"));
        assert_eq!(
            err.missing_dependencies(),
            vec![DependencyType::of::<Example>()]
        );
    }

    #[test]
    fn test_all_missing_dependencies_are_reported() {
        let container = Container::new();
        container
            .register(
                |_: Arc<Example>, _: Arc<Example3>, _: Arc<u64>| Example2 {
                    example: Arc::new(Example { text: String::new() }),
                },
                Lifetime::Transient,
            )
            .unwrap();

        let err = container.build().unwrap_err();
        assert_eq!(err.missing_dependencies().len(), 3);
        assert_eq!(err.to_string().lines().count(), 3);
    }

    #[test]
    fn test_invoke_unregistered_dependency() {
        let container = Container::new();
        container
            .register(|| Example { text: String::new() }, Lifetime::Transient)
            .unwrap();
        container.build().unwrap();

        let mut called = false;
        let err = container
            .invoke(|_ex: Arc<Example>, _ex2: Arc<Example2>| called = true)
            .unwrap_err();
        assert!(!called);
        assert!(matches!(
            err,
            ScopewireError::NotRegistered { dependency } if dependency == DependencyType::of::<Example2>()
        ));
        assert!(err.to_string().ends_with("was not registered"));
    }

    #[test]
    fn test_get_unregistered() {
        let container = Container::new();
        container.build().unwrap();
        let err = container.get::<Example>().unwrap_err();
        assert!(err.to_string().contains("Example"));
    }

    #[test]
    fn test_unknown_lifetime() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Transient).unwrap();
        container
            .write_registry()
            .forget_lifetime(&DependencyType::of::<Example3>());

        assert!(matches!(
            container.get::<Example3>(),
            Err(ScopewireError::UnknownLifetime { .. })
        ));
    }

    #[test]
    fn test_fallible_constructor() {
        let container = Container::new();
        container
            .try_register(
                || -> anyhow::Result<Example> { anyhow::bail!("connection refused") },
                Lifetime::Transient,
            )
            .unwrap();
        container
            .try_register(|| "42".parse::<u32>(), Lifetime::Singleton)
            .unwrap();
        container.build().unwrap();

        assert_eq!(*container.get::<u32>().unwrap(), 42);
        let err = container.get::<Example>().unwrap_err();
        assert!(matches!(err, ScopewireError::ConstructorFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_failing_singleton_fails_build() {
        let container = Container::new();
        container
            .try_register(|| "nope".parse::<u32>(), Lifetime::Singleton)
            .unwrap();

        assert!(matches!(
            container.build(),
            Err(ScopewireError::ConstructorFailed { .. })
        ));
    }

    #[test]
    fn test_manifest_registration() {
        let container = Container::new();
        container.register(|| 5u32, Lifetime::Singleton).unwrap();
        container
            .register_manifest(
                ConstructorManifest::new(Lifetime::Transient)
                    .produces(DependencyType::of::<String>())
                    .requires(DependencyType::of::<u32>())
                    .requires_context()
                    .call(|args| {
                        let mut args = args.into_iter();
                        let n = args.next().unwrap().downcast::<u32>()?;
                        let params = args.next().and_then(Argument::into_context).unwrap();
                        let suffix = params.get::<&str>("suffix").copied().unwrap_or("");
                        Ok(Arc::new(format!("{n}{suffix}")) as Instance)
                    }),
            )
            .unwrap();
        container.build().unwrap();

        let derived = container.with_context("suffix", "px");
        assert_eq!(derived.get::<String>().unwrap().as_str(), "5px");

        let err = container
            .register_manifest(ConstructorManifest::new(Lifetime::Transient))
            .unwrap_err();
        assert!(matches!(err, ScopewireError::NotAFunction));
    }

    #[test]
    fn test_with_config() {
        let config = ConfigService::default();
        config.set("database_url", "postgres://localhost");

        let container = Container::new();
        container
            .register(
                |params: ContextParams| Example {
                    text: params
                        .get::<String>("database_url")
                        .cloned()
                        .unwrap_or_default(),
                },
                Lifetime::Transient,
            )
            .unwrap();
        container.build().unwrap();

        let configured = container.with_config(&config);
        assert_eq!(configured.get::<Example>().unwrap().text, "postgres://localhost");
    }

    #[test]
    fn test_concurrent_singleton_resolution() {
        let container = Container::new();
        container.register(|| Example3, Lifetime::Singleton).unwrap();
        container.build().unwrap();
        let expected = container.get::<Example3>().unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                let request = container.scoped();
                let expected = Arc::clone(&expected);
                s.spawn(move || {
                    let got = request.get::<Example3>().unwrap();
                    assert!(Arc::ptr_eq(&got, &expected));
                });
            }
        });
    }

    #[test]
    fn test_introspection() {
        let container = Container::new();
        assert!(container.is_empty());
        container.register(|| Example3, Lifetime::Scoped).unwrap();

        assert_eq!(container.len(), 1);
        assert!(container.is_registered::<Example3>());
        assert!(!container.is_registered::<Example>());
        assert_eq!(container.scope_kind(), ScopeKind::Main);
        assert_eq!(container.scoped().scope_kind(), ScopeKind::Request);
        assert_ne!(container.id(), container.scoped().id());
    }
}
