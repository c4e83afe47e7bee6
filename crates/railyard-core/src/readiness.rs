//! Pre-deployment readiness gate.
//!
//! Gates run cheapest first and stop at the first failure: local
//! configuration, then one CI request, then the git diff.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ci::CiBackend;
use crate::domain::DeploymentConfig;
use crate::migrations::detect_migration_conflicts;
use crate::resolver::resolve_deployed_branch;

pub const REASON_READY: &str = "Ready for deployment";
pub const REASON_ENV_NOT_CONFIGURED: &str = "Environment is not configured";
pub const REASON_JOB_UNRESOLVED: &str = "Jenkins job name could not be resolved";
pub const REASON_DEPLOYED_UNRESOLVED: &str = "Deployed branch could not be resolved";
pub const REASON_MIGRATION_CONFLICTS: &str = "Migration conflicts detected:";

/// Verdict of the readiness gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub reason: String,
}

impl ReadinessResult {
    fn ready() -> Self {
        Self {
            ready: true,
            reason: REASON_READY.to_string(),
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: reason.into(),
        }
    }
}

/// Decide whether `candidate` can be deployed to `environment`.
pub async fn check_readiness(
    repo_dir: &Path,
    candidate: &str,
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> ReadinessResult {
    let verdict = evaluate(repo_dir, candidate, environment, config, ci).await;
    info!(
        candidate,
        environment,
        ready = verdict.ready,
        reason = %verdict.reason,
        "readiness evaluated"
    );
    verdict
}

async fn evaluate(
    repo_dir: &Path,
    candidate: &str,
    environment: &str,
    config: &DeploymentConfig,
    ci: &dyn CiBackend,
) -> ReadinessResult {
    if config.environment(environment).is_none() {
        return ReadinessResult::blocked(REASON_ENV_NOT_CONFIGURED);
    }
    if config.job_name_for(environment).is_none() {
        return ReadinessResult::blocked(REASON_JOB_UNRESOLVED);
    }

    let Some(deployed) = resolve_deployed_branch(environment, config, ci).await else {
        return ReadinessResult::blocked(REASON_DEPLOYED_UNRESOLVED);
    };

    match detect_migration_conflicts(repo_dir, candidate, &deployed, config) {
        Ok(report) if report.has_conflict => {
            ReadinessResult::blocked(format_conflicts(&report.candidate_only_files))
        }
        Ok(_) => ReadinessResult::ready(),
        Err(e) => ReadinessResult::blocked(format!("Migration conflicts could not be checked: {e}")),
    }
}

fn format_conflicts(files: &[String]) -> String {
    let mut reason = REASON_MIGRATION_CONFLICTS.to_string();
    for file in files {
        reason.push_str("\n  - ");
        reason.push_str(file);
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentSpec;
    use crate::fakes::StaticCiBackend;

    fn config_with_repo(repository: &str) -> DeploymentConfig {
        DeploymentConfig {
            ci_base_url: Some("https://ci.example.com".to_string()),
            multibranch_pipeline: true,
            repository: Some(repository.to_string()),
            migration_detection_enabled: false,
            ..Default::default()
        }
        .with_environment(
            EnvironmentSpec::new("dev", "develop")
                .with_pattern("^(?!(main|staging)).*$")
                .unwrap(),
        )
    }

    #[test]
    fn test_format_conflicts() {
        assert_eq!(
            format_conflicts(&["migration_001.py".to_string()]),
            "Migration conflicts detected:\n  - migration_001.py"
        );
    }

    #[tokio::test]
    async fn test_empty_environments_short_circuit() {
        let config = DeploymentConfig::default();
        let ci = StaticCiBackend::new().with_build("develop", 1.0);

        let verdict = check_readiness(Path::new("test-repo"), "test-branch", "dev", &config, &ci).await;
        assert!(!verdict.ready);
        assert_eq!(verdict.reason, REASON_ENV_NOT_CONFIGURED);
        assert_eq!(ci.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_job_name_unresolved() {
        let config = config_with_repo("");
        let ci = StaticCiBackend::new();

        let verdict = check_readiness(Path::new("test-repo"), "test-branch", "dev", &config, &ci).await;
        assert_eq!(verdict.reason, REASON_JOB_UNRESOLVED);
        assert_eq!(ci.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_deployed_branch_unresolved() {
        let config = config_with_repo("test");
        let ci = StaticCiBackend::new();

        let verdict = check_readiness(Path::new("test-repo"), "test-branch", "dev", &config, &ci).await;
        assert!(!verdict.ready);
        assert_eq!(verdict.reason, REASON_DEPLOYED_UNRESOLVED);
        assert_eq!(ci.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_ready_when_detection_disabled() {
        let config = config_with_repo("test");
        let ci = StaticCiBackend::new().with_build("develop", 1.0);

        let verdict = check_readiness(Path::new("test-repo"), "test-branch", "dev", &config, &ci).await;
        assert_eq!(
            verdict,
            ReadinessResult {
                ready: true,
                reason: REASON_READY.to_string(),
            }
        );
    }
}
