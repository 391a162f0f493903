use crate::di::Container;
use crate::error::Result;

/// Trait for groups of providers registered together
///
/// Modules are typically defined using the `#[module]` macro, which automatically
/// implements this trait and generates the registration logic.
///
/// # Example
/// ```
/// use scopewire::{module, Container, DeriveInjectable, Module};
/// use std::sync::Arc;
///
/// #[derive(DeriveInjectable)]
/// pub struct UserRepository {}
///
/// #[derive(DeriveInjectable)]
/// pub struct UserService {
///     repository: Arc<UserRepository>,
/// }
///
/// #[module(singletons = [UserRepository], scoped = [UserService])]
/// pub struct AppModule;
///
/// let container = AppModule::create_container().unwrap();
/// assert!(container.scoped().get::<UserService>().is_ok());
/// ```
pub trait Module {
    /// Register all providers of this module, including imported modules
    fn register(container: &Container) -> Result<()>;
}
