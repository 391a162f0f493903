use crate::config::ConfigService;
use crate::di::{Constructor, Container, Lifetime};
use crate::error::Result;
use crate::module::Module;

/// Builder for constructing a validated dependency injection container
///
/// Use this to register constructors fluently; the first registration error is kept and
/// returned by [`ContainerBuilder::build`], which otherwise runs [`Container::build`].
///
/// # Example
/// ```
/// use scopewire::{ContainerBuilder, ConfigService};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Session(Arc<Database>);
///
/// let config = ConfigService::default();
/// config.set("region", "eu-west-1");
///
/// let container = ContainerBuilder::new()
///     .singleton(|| Database)
///     .scoped(|db: Arc<Database>| Session(db))
///     .config(config)
///     .build()
///     .unwrap();
///
/// let request = container.scoped();
/// assert!(request.context().contains_key("region"));
/// ```
pub struct ContainerBuilder {
    container: Container,
    config: Option<ConfigService>,
    error: Option<crate::ScopewireError>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
            config: None,
            error: None,
        }
    }

    /// Register a constructor with an explicit lifetime
    pub fn register<C, Args>(mut self, constructor: C, lifetime: Lifetime) -> Self
    where
        C: Constructor<Args>,
    {
        if self.error.is_none() {
            self.error = self.container.register(constructor, lifetime).err();
        }
        self
    }

    pub fn singleton<C, Args>(self, constructor: C) -> Self
    where
        C: Constructor<Args>,
    {
        self.register(constructor, Lifetime::Singleton)
    }

    pub fn scoped<C, Args>(self, constructor: C) -> Self
    where
        C: Constructor<Args>,
    {
        self.register(constructor, Lifetime::Scoped)
    }

    pub fn transient<C, Args>(self, constructor: C) -> Self
    where
        C: Constructor<Args>,
    {
        self.register(constructor, Lifetime::Transient)
    }

    /// Register every provider of a module
    pub fn module<M: Module>(mut self) -> Self {
        if self.error.is_none() {
            self.error = self.container.import::<M>().err();
        }
        self
    }

    /// Expose configuration entries through the context of the built container
    pub fn config(mut self, config: ConfigService) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the registrations and build the singletons
    pub fn build(self) -> Result<Container> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let container = match &self.config {
            Some(config) => self.container.with_config(config),
            None => self.container,
        };
        container.build()?;
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
