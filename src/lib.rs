//! # Scopewire
//!
//! A lifetime-aware dependency resolution engine for Rust.
//!
//! Constructors are registered with one of three lifetimes, the dependency graph is
//! validated once at startup, and values are then resolved on demand from the root
//! container or from request-scoped containers derived from it.
//!
//! ## Features
//!
//! - **Typed constructors**: any `Fn(Arc<A>, Arc<B>, ...) -> T` is a constructor for `T`
//! - **Build-time validation**: cycles and missing registrations are reported before use
//! - **Lifetimes**: `Singleton` (one per family), `Scoped` (one per request scope),
//!   `Transient` (fresh every time)
//! - **Context channel**: constructors taking `ContextParams` receive per-request values
//! - **Derive support**: `#[derive(Injectable)]` and `#[module]` for grouped registration
//!
//! ## Quick Start
//!
//! ```rust
//! use scopewire::{Container, ContextParams, Lifetime};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct RequestUser(String);
//!
//! struct UserService {
//!     db: Arc<Database>,
//!     user: Arc<RequestUser>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register(
//!         || Database {
//!             url: "postgres://localhost".to_string(),
//!         },
//!         Lifetime::Singleton,
//!     )
//!     .unwrap();
//! container
//!     .register(
//!         |params: ContextParams| {
//!             RequestUser(params.get::<String>("user").cloned().unwrap_or_default())
//!         },
//!         Lifetime::Scoped,
//!     )
//!     .unwrap();
//! container
//!     .register(
//!         |db: Arc<Database>, user: Arc<RequestUser>| UserService { db, user },
//!         Lifetime::Transient,
//!     )
//!     .unwrap();
//! container.build().unwrap();
//!
//! // One scoped container per request
//! let request = container.scoped().with_context("user", "ada".to_string());
//! let service = request.get::<UserService>().unwrap();
//! assert_eq!(service.user.0, "ada");
//! assert_eq!(service.db.url, "postgres://localhost");
//! ```

pub mod config;
pub mod di;
pub mod error;
pub mod module;

// Re-export core types
pub use config::ConfigService;
pub use di::{
    Argument, Constructor, ConstructorManifest, Container, ContainerBuilder, ContextParams,
    ContextValue, Cycle, Dependency, DependencyType, FallibleConstructor, Injectable, Instance,
    Invocable, Lifetime, ManifestFn, Parameter, ScopeKind, TypeGraph,
};
pub use error::{CyclePath, Result, ScopewireError};
pub use module::Module;

// Re-export macros
pub use scopewire_macro::{Injectable as DeriveInjectable, module};

/// Prelude module for convenient imports
///
/// ```
/// use scopewire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ConfigService;
    pub use crate::di::{
        Container, ContainerBuilder, ContextParams, DependencyType, Injectable, Lifetime,
    };
    pub use crate::error::{Result, ScopewireError};
    pub use crate::module::Module;
    pub use crate::{DeriveInjectable as Injectable, module};
    pub use std::sync::Arc;
}
