//! Error types for the data service and its configuration loader

use std::path::PathBuf;

use propkit_core::{PropertyError, ValueKind};

/// Errors from the named-manager registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataServiceError {
    /// No manager registered under this name
    #[error("no property manager named '{0}'")]
    NotFound(String),

    /// `add` on a name that is already taken
    #[error("a property manager named '{0}' already exists")]
    AlreadyExists(String),

    /// Registry names may not be blank
    #[error("property manager names may not be empty")]
    EmptyName,
}

/// Errors while loading a registry configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Declaring or defaulting a property failed
    #[error("in manager '{manager}': {source}")]
    Property {
        /// Manager being built
        manager: String,
        /// What the property layer reported
        #[source]
        source: PropertyError,
    },

    /// Bound cannot be represented in the property's kind
    #[error("property '{property}': bound {bound} is not a valid {kind}")]
    InvalidBound {
        /// Property the bound belongs to
        property: String,
        /// Configured bound
        bound: f64,
        /// Declared kind of the property
        kind: ValueKind,
    },

    /// Constraint not meaningful for the property's kind
    #[error("property '{property}': {constraint} does not apply to {kind} values")]
    UnsupportedConstraint {
        /// Property the constraint was given for
        property: String,
        /// Config key of the constraint, e.g. `min_length`
        constraint: &'static str,
        /// Declared kind of the property
        kind: ValueKind,
    },

    /// Two managers in one file share a name
    #[error("property manager '{0}' is declared more than once")]
    DuplicateManager(String),

    /// Registering the manager failed
    #[error("registry error: {0}")]
    Registry(#[from] DataServiceError),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
