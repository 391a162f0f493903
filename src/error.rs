use crate::di::DependencyType;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScopewireError>;

#[derive(Debug, Error)]
pub enum ScopewireError {
    #[error("argument is not a function")]
    NotAFunction,

    #[error("only 1 out parameter is allowed, constructor produces {produced}")]
    OnlyOneOutParam { produced: usize },

    #[error("dependency {dependency} was already registered")]
    AlreadyRegistered { dependency: DependencyType },

    #[error("cyclic dependency detected at {dependency}: {cycle}")]
    CyclicDependency {
        dependency: DependencyType,
        cycle: CyclePath,
    },

    #[error("dependency {dependency} was not registered")]
    NotRegistered { dependency: DependencyType },

    #[error("unknown lifetime for dependency {dependency}")]
    UnknownLifetime { dependency: DependencyType },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("constructor for {dependency} failed: {source}")]
    ConstructorFailed {
        dependency: DependencyType,
        #[source]
        source: anyhow::Error,
    },

    #[error("{}", join_lines(.0))]
    Multiple(Vec<ScopewireError>),
}

impl ScopewireError {
    /// Every type reported as not registered, including those nested in a
    /// `Multiple` report.
    pub fn missing_dependencies(&self) -> Vec<DependencyType> {
        match self {
            Self::NotRegistered { dependency } => vec![*dependency],
            Self::Multiple(errors) => errors
                .iter()
                .flat_map(ScopewireError::missing_dependencies)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}

/// Ordered list of the types forming a dependency cycle; the first type is
/// repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub Vec<DependencyType>);

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(DependencyType::name).collect();
        f.write_str(&names.join(" -> "))
    }
}

fn join_lines(errors: &[ScopewireError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
