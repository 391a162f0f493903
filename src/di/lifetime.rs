use strum_macros::{Display, EnumString};

/// Reuse policy of a registered constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Lifetime {
    /// One instance per container family, built eagerly by `Container::build`.
    Singleton,
    /// One instance per request-scoped container. Root containers never
    /// cache scoped values.
    Scoped,
    /// A fresh instance for every request and every consumer.
    Transient,
}

/// Whether a container caches `Scoped` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
    Main,
    Request,
}
