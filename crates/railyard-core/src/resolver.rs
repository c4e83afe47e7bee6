//! Deployed-branch resolution against a multibranch pipeline.
//!
//! "Deployed" is inferred from CI history: among the branch sub-jobs that
//! classify to the environment, the one with the most recent successful build
//! is considered live.

use tracing::{debug, info, warn};

use crate::ci::{BranchJob, CiBackend, CiError, JobTarget};
use crate::classify::classify_branch;
use crate::domain::DeploymentConfig;

/// Why a deployed branch could not be resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("environment '{0}' is not configured")]
    UnknownEnvironment(String),

    #[error("Jenkins job name could not be resolved for environment '{0}'")]
    JobNameUnresolved(String),

    #[error("Jenkins URL is not configured")]
    MissingCiUrl,

    #[error("only multibranch pipelines are supported")]
    UnsupportedTopology,

    #[error("could not fetch job information: {0}")]
    Fetch(#[from] CiError),
}

/// A branch that built successfully for the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildCandidate {
    pub branch_name: String,
    pub last_successful_build_timestamp: f64,
}

/// Resolve the branch currently live in `environment`, failing closed.
///
/// Every failure, from missing configuration to an HTTP error, is logged and
/// collapsed into `None` so callers can produce one uniform verdict.
pub async fn resolve_deployed_branch(
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> Option<String> {
    match try_resolve_deployed_branch(environment, config, ci).await {
        Ok(Some(branch)) => Some(branch),
        Ok(None) => {
            warn!(environment, "no successfully built branch found");
            None
        }
        Err(e) => {
            warn!(environment, error = %e, "deployed branch resolution failed");
            None
        }
    }
}

/// Resolve the live branch, reporting which precondition failed.
///
/// `Ok(None)` means the CI system answered but no sub-job of this environment
/// has a successful build.
pub async fn try_resolve_deployed_branch(
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> Result<Option<String>, ResolveError> {
    let build = try_resolve_deployed_build(environment, config, ci).await?;
    Ok(build.map(|c| c.branch_name))
}

/// Like [`try_resolve_deployed_branch`], keeping the winning build's
/// timestamp.
pub async fn try_resolve_deployed_build(
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> Result<Option<BuildCandidate>, ResolveError> {
    let target = resolve_listing_target(environment, config)?;
    let jobs = ci.list_branch_jobs(&target).await?;

    let candidates = build_candidates(environment, config, &jobs);
    debug!(environment, candidates = candidates.len(), "collected build candidates");

    let winner = select_most_recent(candidates);
    if let Some(build) = &winner {
        info!(environment, branch = %build.branch_name, "resolved deployed branch");
    }
    Ok(winner)
}

fn resolve_listing_target(
    environment: &str,
    config: &DeploymentConfig,
) -> Result<JobTarget, ResolveError> {
    if config.environment(environment).is_none() {
        return Err(ResolveError::UnknownEnvironment(environment.to_string()));
    }
    let job_name = config
        .job_name_for(environment)
        .ok_or_else(|| ResolveError::JobNameUnresolved(environment.to_string()))?;
    let base_url = config.base_url().ok_or(ResolveError::MissingCiUrl)?;
    if !config.multibranch_pipeline {
        return Err(ResolveError::UnsupportedTopology);
    }

    Ok(JobTarget {
        base_url: base_url.to_string(),
        job_name: job_name.to_string(),
        credentials: config.credentials(),
    })
}

/// Keep jobs that classify to `environment` and have a successful build.
pub fn build_candidates(
    environment: &str,
    config: &DeploymentConfig,
    jobs: &[BranchJob],
) -> Vec<BuildCandidate> {
    jobs.iter()
        .filter_map(|job| {
            let build = job.last_successful_build.as_ref()?;
            let branch = job.branch_name();
            if classify_branch(&branch, &config.environments) != Some(environment) {
                return None;
            }
            Some(BuildCandidate {
                branch_name: branch,
                last_successful_build_timestamp: build.timestamp,
            })
        })
        .collect()
}

/// Pick the candidate with the strictly greatest timestamp; the earliest
/// listed candidate wins a tie.
pub fn select_most_recent(candidates: Vec<BuildCandidate>) -> Option<BuildCandidate> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if candidate.last_successful_build_timestamp <= b.last_successful_build_timestamp => {
            Some(b)
        }
        _ => Some(candidate),
    })
}
