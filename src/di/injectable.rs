use crate::di::{Container, Parameter};
use crate::error::Result;

/// Trait for types that can be built from the container field by field
///
/// This trait is typically implemented automatically via the `#[derive(Injectable)]` macro,
/// and registered with [`Container::register_injectable`].
///
/// # Example
/// ```
/// use scopewire::{Container, DeriveInjectable, Lifetime};
/// use std::sync::Arc;
///
/// pub struct UserRepository;
///
/// #[derive(DeriveInjectable)]
/// pub struct UserService {
///     // This field will be resolved from the container
///     repository: Arc<UserRepository>,
/// }
///
/// let container = Container::new();
/// container.register(|| UserRepository, Lifetime::Singleton).unwrap();
/// container.register_injectable::<UserService>(Lifetime::Scoped).unwrap();
/// container.build().unwrap();
///
/// let service = container.scoped().get::<UserService>().unwrap();
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// One entry per field, in declaration order.
    fn parameters() -> Vec<Parameter>;

    /// Create an instance by resolving every field from the container
    ///
    /// # Errors
    /// Returns an error if any required dependency cannot be resolved.
    fn inject(container: &Container) -> Result<Self>;
}
