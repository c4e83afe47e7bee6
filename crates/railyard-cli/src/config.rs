//! Config file loading for the CLI.
//!
//! Reads the `[deployment]` table of `.railyard.toml` and fills unset CI
//! connection values from `JENKINS_URL`, `JENKINS_USER` and `JENKINS_TOKEN`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use railyard_core::{ConfigError, DeploymentConfig};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = ".railyard.toml";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    deployment: DeploymentConfig,
}

/// Where to find the config: an explicit path, else `.railyard.toml` in the
/// repository directory.
pub fn config_path(explicit: Option<&Path>, repo_dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo_dir.join(DEFAULT_CONFIG_FILE))
}

/// Load and normalise the deployment config from `path`.
pub fn load_config(path: &Path) -> Result<DeploymentConfig> {
    let mut config = read_config(path)
        .with_context(|| format!("failed to load config file {}", path.display()))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn read_config(path: &Path) -> railyard_core::Result<DeploymentConfig> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_config(&raw)?)
}

fn parse_config(raw: &str) -> std::result::Result<DeploymentConfig, ConfigError> {
    let file: ConfigFile =
        toml::from_str(raw).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let mut config = file.deployment;
    config.normalize_names();
    Ok(config)
}

/// Fill values the file left unset from the environment.
fn apply_env_overrides(config: &mut DeploymentConfig, lookup: impl Fn(&str) -> Option<String>) {
    fill(&mut config.ci_base_url, lookup("JENKINS_URL"));
    fill(&mut config.user, lookup("JENKINS_USER"));
    fill(&mut config.token, lookup("JENKINS_TOKEN"));
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    let unset = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if unset {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            *slot = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railyard_core::RailyardError;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [deployment]
        jenkins_url = "https://ci.example.com"
        multibranch_pipeline = true
        repository = "shop"
        migration_paths = ["migrations/"]

        [deployment.environments.prod]
        default_branch = "main"
        pattern = "^(main)$"

        [deployment.environments.staging]
        pattern = "^(staging)"

        [deployment.environments.dev]
        default_branch = "develop"
        pattern = "^(?!(main|staging)).*$"
        jenkins_job_name = "shop-dev"
    "#;

    #[test]
    fn parses_sample_config() {
        let config = parse_config(SAMPLE).unwrap();
        let names: Vec<&str> = config.environments.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["prod", "staging", "dev"]);
        assert_eq!(config.environments["staging"].name, "staging");
        assert_eq!(config.job_name_for("prod"), Some("shop"));
        assert_eq!(config.job_name_for("dev"), Some("shop-dev"));
        assert!(config.multibranch_pipeline);
    }

    #[test]
    fn missing_deployment_table_yields_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.environments.is_empty());
        assert!(config.migration_detection_enabled);
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let raw = r#"
            [deployment.environments.dev]
            pattern = "(unclosed"
        "#;
        let err = parse_config(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn env_fills_only_unset_values() {
        let vars: HashMap<&str, &str> = [
            ("JENKINS_URL", "https://other.example.com"),
            ("JENKINS_USER", "env-user"),
            ("JENKINS_TOKEN", "env-token"),
        ]
        .into_iter()
        .collect();

        let mut config = parse_config(SAMPLE).unwrap();
        config.user = Some(String::new());
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url(), Some("https://ci.example.com"));
        assert_eq!(config.user.as_deref(), Some("env-user"));
        assert_eq!(config.token.as_deref(), Some("env-token"));
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(None, dir.path());
        std::fs::write(&path, SAMPLE).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.environments.len(), 3);
    }

    #[test]
    fn load_config_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
        assert!(matches!(
            err.downcast_ref::<RailyardError>(),
            Some(RailyardError::Io(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(None, dir.path());
        std::fs::write(&path, "[deployment\nrepository = ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains(".railyard.toml"));
        assert!(matches!(
            err.downcast_ref::<RailyardError>(),
            Some(RailyardError::Config(ConfigError::Invalid(_)))
        ));
    }
}
