use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased value stored in the context map.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// String-keyed side channel delivered to constructors that take a
/// `ContextParams` parameter.
///
/// Cloning is cheap; [`ContextParams::with`] copies the map on write, so a
/// derived container never changes the map its source holds.
///
/// # Example
/// ```
/// use scopewire::{Container, ContextParams, Lifetime};
///
/// struct Greeting(String);
///
/// let container = Container::new();
/// container
///     .register(
///         |params: ContextParams| {
///             Greeting(params.get::<String>("name").cloned().unwrap_or_default())
///         },
///         Lifetime::Transient,
///     )
///     .unwrap();
/// container.build().unwrap();
///
/// let request = container.with_context("name", "ada".to_string());
/// assert_eq!(request.get::<Greeting>().unwrap().0, "ada");
/// ```
#[derive(Clone, Default)]
pub struct ContextParams {
    values: Arc<HashMap<String, ContextValue>>,
}

impl ContextParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of these params extended with `key`.
    pub fn with<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) -> Self {
        self.with_value(key, Arc::new(value))
    }

    pub fn with_value(&self, key: impl Into<String>, value: ContextValue) -> Self {
        let mut values = HashMap::clone(&self.values);
        values.insert(key.into(), value);
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get_value(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Returns the value under `key` if it exists and has type `V`.
    pub fn get<V: Any + Send + Sync>(&self, key: &str) -> Option<&V> {
        self.values.get(key).and_then(|value| value.downcast_ref::<V>())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ContextParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("ContextParams").field("keys", &keys).finish()
    }
}
