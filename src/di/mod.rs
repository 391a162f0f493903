mod builder;
mod constructor;
mod container;
mod context;
mod dependency;
mod graph;
mod injectable;
mod lifetime;
mod registry;

pub use builder::ContainerBuilder;
pub use constructor::{Constructor, FallibleConstructor, Invocable};
pub use container::Container;
pub use context::{ContextParams, ContextValue};
pub use dependency::{Argument, Dependency, DependencyType, Instance, Parameter};
pub use graph::{Cycle, TypeGraph};
pub use injectable::Injectable;
pub use lifetime::{Lifetime, ScopeKind};
pub use registry::{ConstructorManifest, ManifestFn};
