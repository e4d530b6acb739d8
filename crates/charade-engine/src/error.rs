//! Error taxonomy for the engine.
//!
//! Per-request failures (unknown route, missing item, failed auth) are never
//! surfaced as errors; they become [`ApiResponse`](crate::ApiResponse) values.
//! The types here cover configuration-time mistakes only, which are fatal at
//! registration or setup time.

use thiserror::Error;

/// Configuration-time failures raised while registering routes, booting from
/// a parsed spec, or seeding fake items.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A CRUD kind string that is not one of `list`, `show`, `create`,
    /// `update`, `delete`.
    #[error("invalid crud kind: {0}")]
    InvalidKind(String),

    /// A path template that did not compile to a matcher.
    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An item was requested for a path that has no faker definition.
    #[error("no faker definition registered for path `{0}`")]
    MissingDefinition(String),
}

/// Failures while reading or parsing a spec file.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse spec file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
