//! Deployment and rollback triggers.
//!
//! A deployment is a build of the branch's sub-job under the environment's
//! multibranch pipeline. A rollback is the same trigger aimed at the branch to
//! restore, so CI history stays a single linear record.
//!
//! Unlike readiness, every missing prerequisite here is an explicit failure:
//! this call has a side effect and must never silently do nothing.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ci::{branch_build_url, CiBackend, CiError, JobTarget};
use crate::domain::DeploymentConfig;
use crate::readiness::{REASON_ENV_NOT_CONFIGURED, REASON_JOB_UNRESOLVED};

pub const REASON_CI_URL_MISSING: &str = "Jenkins URL is not configured";
pub const REASON_AUTH_MISSING: &str = "Auth token is not configured";
pub const REASON_UNSUPPORTED_TOPOLOGY: &str = "Only multibranch pipelines are supported";

/// Result of a deployment or rollback trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub success: bool,
    pub message: String,
}

impl DeploymentOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Trigger a deployment of `branch` to `environment`.
pub async fn execute_deployment(
    branch: &str,
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> DeploymentOutcome {
    let target = match trigger_target(environment, config) {
        Ok(target) => target,
        Err(reason) => {
            warn!(branch, environment, reason, "deployment not triggered");
            return DeploymentOutcome::failed(reason);
        }
    };

    match ci.trigger_branch_build(&target, branch).await {
        Ok(()) => {
            info!(branch, environment, job = %target.job_name, "deployment triggered");
            DeploymentOutcome {
                success: true,
                message: format!(
                    "Deployment job '{}' triggered for branch '{}'",
                    target.job_name, branch
                ),
            }
        }
        Err(e) => {
            let message = describe_trigger_error(&target, branch, &e);
            warn!(branch, environment, error = %e, "deployment trigger failed");
            DeploymentOutcome::failed(message)
        }
    }
}

/// Restore `environment` to `target_branch` by deploying it again.
pub async fn rollback_deployment(
    target_branch: &str,
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> DeploymentOutcome {
    info!(environment, target_branch, "rolling back");
    execute_deployment(target_branch, environment, config, ci).await
}

fn trigger_target(environment: &str, config: &DeploymentConfig) -> Result<JobTarget, &'static str> {
    config
        .environment(environment)
        .ok_or(REASON_ENV_NOT_CONFIGURED)?;
    let job_name = config.job_name_for(environment).ok_or(REASON_JOB_UNRESOLVED)?;
    let base_url = config.base_url().ok_or(REASON_CI_URL_MISSING)?;
    let credentials = config.credentials().ok_or(REASON_AUTH_MISSING)?;
    if !config.multibranch_pipeline {
        return Err(REASON_UNSUPPORTED_TOPOLOGY);
    }

    Ok(JobTarget {
        base_url: base_url.to_string(),
        job_name: job_name.to_string(),
        credentials: Some(credentials),
    })
}

fn describe_trigger_error(target: &JobTarget, branch: &str, error: &CiError) -> String {
    match error {
        CiError::NotFound { .. } => format!(
            "Job or branch not found. URL: {}",
            branch_build_url(target, branch)
        ),
        CiError::Status { body, .. } => format!("Failed to trigger Jenkins job: {body}"),
        CiError::Transport(e) | CiError::Decode(e) => format!("Failed to trigger Jenkins job: {e}"),
    }
}
