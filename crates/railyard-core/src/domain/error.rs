//! Domain-level error taxonomy for Railyard.

/// Errors raised while building or validating a [`DeploymentConfig`].
///
/// [`DeploymentConfig`]: crate::domain::config::DeploymentConfig
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid branch pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Railyard domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RailyardError {
    #[error("git error: {0}")]
    GitError(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Railyard domain operations.
pub type Result<T> = std::result::Result<T, RailyardError>;
