//! CI system port.
//!
//! The readiness engine only needs two things from a CI backend: the child
//! jobs of a multibranch pipeline with their last successful build, and a way
//! to trigger one child job. [`CiBackend`] is that port; [`JenkinsClient`]
//! implements it over HTTP and [`crate::fakes::StaticCiBackend`] in memory.

pub mod jenkins;

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::domain::Credentials;

pub use jenkins::JenkinsClient;

/// Result type for CI port operations.
pub type CiResult<T> = std::result::Result<T, CiError>;

/// Failures talking to the CI system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CiError {
    /// 404: the job, or the branch's sub-job, does not exist (yet).
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON shape.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// A parent multibranch job on a specific CI server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    /// Base URL without trailing slash.
    pub base_url: String,
    pub job_name: String,
    pub credentials: Option<Credentials>,
}

/// Last successful build of a branch sub-job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub result: Option<String>,
    /// Build start time as reported by the CI system.
    #[serde(default)]
    pub timestamp: f64,
}

/// One child job of a multibranch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchJob {
    /// Job name as listed by the CI system (percent-encoded branch name).
    pub name: String,
    #[serde(default)]
    pub last_successful_build: Option<BuildSummary>,
}

impl BranchJob {
    /// The literal branch name this job builds.
    pub fn branch_name(&self) -> String {
        decode_branch(&self.name)
    }
}

#[async_trait]
pub trait CiBackend: Send + Sync {
    /// List the child jobs of `target`'s multibranch pipeline.
    async fn list_branch_jobs(&self, target: &JobTarget) -> CiResult<Vec<BranchJob>>;

    /// Trigger a build of `branch`'s sub-job under `target`.
    async fn trigger_branch_build(&self, target: &JobTarget, branch: &str) -> CiResult<()>;
}

/// Characters left as-is when a name becomes a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a job or branch name as a single path segment (`/` → `%2F`).
pub fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// Recover a branch name from a CI job name.
pub fn decode_branch(job_name: &str) -> String {
    percent_decode_str(job_name).decode_utf8_lossy().into_owned()
}

/// URL of the multibranch job's JSON API.
pub fn job_listing_url(target: &JobTarget) -> String {
    format!(
        "{}/job/{}/api/json",
        target.base_url,
        encode_segment(&target.job_name)
    )
}

/// URL of a branch sub-job's build trigger.
pub fn branch_build_url(target: &JobTarget, branch: &str) -> String {
    format!(
        "{}/job/{}/job/{}/build",
        target.base_url,
        encode_segment(&target.job_name),
        encode_segment(branch)
    )
}
