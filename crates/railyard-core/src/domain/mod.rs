//! Domain types: configuration and the error taxonomy.

pub mod config;
pub mod error;

pub use config::{
    BranchPattern, Credentials, DeploymentConfig, EnvironmentSpec, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{ConfigError, RailyardError, Result};
