//! Deployment configuration consumed by the readiness engine.
//!
//! The configuration is loaded once per invocation by the caller and passed
//! explicitly into every operation; nothing in this crate reads ambient state.

use fancy_regex::Regex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Default bound on a single CI request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A compiled, user-supplied branch pattern.
///
/// Patterns are used as-is: no anchoring is added, so `^main$` and `main`
/// behave differently. Look-around is supported.
#[derive(Debug, Clone)]
pub struct BranchPattern {
    source: String,
    regex: Regex,
}

impl BranchPattern {
    /// Compile a pattern. A malformed pattern is a hard configuration error.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Search the branch name for a match.
    ///
    /// A backtracking failure inside the engine counts as "no match".
    pub fn is_match(&self, branch: &str) -> bool {
        match self.regex.is_match(branch) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(pattern = %self.source, branch, error = %e, "pattern evaluation failed");
                false
            }
        }
    }
}

impl PartialEq for BranchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for BranchPattern {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<BranchPattern> for String {
    fn from(p: BranchPattern) -> Self {
        p.source
    }
}

impl Serialize for BranchPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for BranchPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BranchPattern::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// One deployable environment (dev, staging, prod, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Logical environment name. Defaults to the configuration key.
    #[serde(default)]
    pub name: String,
    /// Branch restored by a rollback when no explicit target is given.
    #[serde(default)]
    pub default_branch: String,
    /// Branches belonging to this environment. Without a pattern the
    /// environment never classifies any branch.
    #[serde(default)]
    pub pattern: Option<BranchPattern>,
    /// Parent multibranch job. Falls back to the repository name when unset.
    #[serde(default)]
    pub jenkins_job_name: Option<String>,
}

impl EnvironmentSpec {
    /// Create an environment with no pattern and no explicit job.
    pub fn new(name: &str, default_branch: &str) -> Self {
        Self {
            name: name.to_string(),
            default_branch: default_branch.to_string(),
            pattern: None,
            jenkins_job_name: None,
        }
    }

    /// Set the branch pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.pattern = Some(BranchPattern::new(pattern)?);
        Ok(self)
    }

    /// Set the parent Jenkins job.
    pub fn with_job(mut self, job_name: &str) -> Self {
        self.jenkins_job_name = Some(job_name.to_string());
        self
    }
}

/// HTTP basic-auth credentials for the CI system.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Fully-resolved deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Jenkins base URL, e.g. `https://ci.example.com`.
    #[serde(default, alias = "jenkins_url")]
    pub ci_base_url: Option<String>,
    #[serde(default, alias = "jenkins_user")]
    pub user: Option<String>,
    #[serde(default, alias = "jenkins_token")]
    pub token: Option<String>,
    /// Only multibranch pipelines are supported; must be opted in.
    #[serde(default)]
    pub multibranch_pipeline: bool,
    /// Repository-relative paths (or git pathspec globs) holding migrations.
    #[serde(default)]
    pub migration_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub migration_detection_enabled: bool,
    /// Repository name, used as the job name when an environment has none.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Environments in configuration order.
    #[serde(default)]
    pub environments: IndexMap<String, EnvironmentSpec>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            ci_base_url: None,
            user: None,
            token: None,
            multibranch_pipeline: false,
            migration_paths: Vec::new(),
            migration_detection_enabled: true,
            repository: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            environments: IndexMap::new(),
        }
    }
}

impl DeploymentConfig {
    /// Append an environment, keyed by its name. Order of insertion is the
    /// classification order.
    pub fn with_environment(mut self, env: EnvironmentSpec) -> Self {
        self.environments.insert(env.name.clone(), env);
        self
    }

    /// Look up an environment by name.
    pub fn environment(&self, name: &str) -> Option<&EnvironmentSpec> {
        self.environments.get(name)
    }

    /// Parent job for an environment: its explicit job name, else the
    /// repository name. Empty strings count as unset.
    pub fn job_name_for(&self, environment: &str) -> Option<&str> {
        let env = self.environment(environment)?;
        non_empty(env.jenkins_job_name.as_deref()).or_else(|| non_empty(self.repository.as_deref()))
    }

    /// Base URL without a trailing slash, if configured.
    pub fn base_url(&self) -> Option<&str> {
        non_empty(self.ci_base_url.as_deref()).map(|url| url.trim_end_matches('/'))
    }

    /// Credentials, present only when both user and token are set.
    pub fn credentials(&self) -> Option<Credentials> {
        let user = non_empty(self.user.as_deref())?;
        let token = non_empty(self.token.as_deref())?;
        Some(Credentials {
            user: user.to_string(),
            token: token.to_string(),
        })
    }

    /// Fill each environment's `name` from its key when left empty.
    pub fn normalize_names(&mut self) {
        for (key, env) in self.environments.iter_mut() {
            if env.name.trim().is_empty() {
                env.name = key.clone();
            }
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
