//! Railyard Core Library
//!
//! Deployment readiness for branch-per-environment CI pipelines: classify
//! branches into environments, find what is live from multibranch build
//! history, detect diverged migration histories, and trigger deployments or
//! rollbacks.
//!
//! Every call re-derives its answer from the CI system and the local git
//! clone; no state is kept between calls. Concurrent deploys to the same
//! environment are not coordinated here, so callers that need that guarantee
//! must serialize them.

pub mod ci;
pub mod classify;
pub mod deploy;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod migrations;
pub mod readiness;
pub mod resolver;
pub mod telemetry;

pub use ci::{BranchJob, BuildSummary, CiBackend, CiError, CiResult, JenkinsClient, JobTarget};
pub use classify::classify_branch;
pub use deploy::{execute_deployment, rollback_deployment, DeploymentOutcome};
pub use domain::{
    BranchPattern, ConfigError, Credentials, DeploymentConfig, EnvironmentSpec, RailyardError,
    Result,
};
pub use git::{files_changed_since_fork, is_git_repo};
pub use migrations::{detect_migration_conflicts, MigrationReport};
pub use readiness::{check_readiness, ReadinessResult};
pub use resolver::{
    resolve_deployed_branch, try_resolve_deployed_branch, try_resolve_deployed_build, BuildCandidate,
    ResolveError,
};
pub use telemetry::init_tracing;

/// Railyard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
