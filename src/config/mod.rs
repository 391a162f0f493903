use dashmap::DashMap;
use std::env;
use std::sync::Arc;

/// String configuration exposed to constructors through the context channel
///
/// See [`Container::with_config`](crate::Container::with_config).
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Load every environment variable
    pub fn new() -> Self {
        Self::with_values(env::vars())
    }

    /// Load environment variables starting with `prefix`, keyed by the rest of
    /// their name in lowercase (`APP_DATABASE_URL` becomes `database_url`)
    pub fn from_env_prefixed(prefix: &str) -> Self {
        Self::with_values(prefixed(env::vars(), prefix))
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let service = Self::default();
        for (key, value) in values {
            service.config.insert(key.into(), value.into());
        }
        tracing::debug!(entries = service.len(), "Configuration loaded");
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.config
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
}

fn prefixed<'a>(
    vars: impl IntoIterator<Item = (String, String)> + 'a,
    prefix: &'a str,
) -> impl Iterator<Item = (String, String)> + 'a {
    vars.into_iter().filter_map(move |(key, value)| {
        key.strip_prefix(prefix)
            .filter(|rest| !rest.is_empty())
            .map(|rest| (rest.to_lowercase(), value))
    })
}
