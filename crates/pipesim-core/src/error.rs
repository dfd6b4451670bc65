//! Configuration error taxonomy.
//!
//! Every way a configuration document can be rejected has its own variant,
//! so callers can pattern-match on the kind. Display messages are pure
//! functions of the variant fields; nothing here formats lazily or touches
//! I/O beyond the `#[from]` conversions.

/// Errors raised while loading or validating a pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The top-level YAML value was not a mapping.
    #[error("top-level YAML must be a mapping")]
    NotMapping,

    /// A module's trimmed `name` was empty or missing.
    #[error("all modules must have a non-empty 'name'")]
    EmptyModuleName,

    /// Two or more modules share a trimmed name. Carries the sorted,
    /// de-duplicated list of offending names.
    #[error("duplicate module names: {0:?}")]
    DuplicateModuleNames(Vec<String>),

    /// A module did not declare a `payload` key at all.
    #[error("module '{0}' missing 'payload'")]
    MissingPayload(String),

    /// A module declared a negative `seconds`.
    #[error("module '{0}' has negative 'seconds'")]
    NegativeModuleSeconds(String),

    /// A test's trimmed `name` was empty or missing.
    #[error("all tests must have a non-empty 'name'")]
    EmptyTestName,

    /// A test references a module that was never declared.
    #[error("test '{test}' references unknown module '{target}'")]
    UnknownModuleRef { test: String, target: String },

    /// A test declared a negative `seconds`.
    #[error("test '{0}' has negative 'seconds'")]
    NegativeTestSeconds(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not well-formed YAML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Result type for configuration loading and validation.
pub type Result<T> = std::result::Result<T, ConfigError>;
