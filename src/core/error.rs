//! Hard failures. Anything recoverable is a [`super::types::Diagnostic`] instead.

/// Error that aborts an import before any IR is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported template format: {0}")]
    ForeignFormat(String),

    #[error("failed to parse template as YAML or JSON: {0}")]
    Parse(String),

    #[error("template root must be a mapping")]
    RootNotMapping,

    #[error("{0}")]
    Io(String),

    #[error("type catalog error: {0}")]
    Catalog(String),

    #[error("dependency cycle detected involving: {}", .0.join(", "))]
    Cycle(Vec<String>),
}
