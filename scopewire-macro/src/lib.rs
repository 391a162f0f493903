use proc_macro::TokenStream;

mod injectable;
mod module;

/// Derive macro for building a struct from the container field by field
///
/// Every field must implement `scopewire::Dependency`: `Arc<T>` fields are resolved
/// from the container, `ContextParams` fields receive the container's context.
///
/// # Example
/// ```ignore
/// use scopewire::DeriveInjectable;
///
/// #[derive(DeriveInjectable)]
/// pub struct UserService {
///     repository: Arc<UserRepository>,
///     context: ContextParams,
/// }
/// ```
#[proc_macro_derive(Injectable)]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro for defining a module of injectable providers
///
/// # Example
/// ```ignore
/// use scopewire::module;
///
/// #[module(
///     imports = [StorageModule],
///     singletons = [UserRepository],
///     scoped = [UserService],
///     transients = [AuditEntry],
/// )]
/// pub struct AppModule;
/// ```
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}
