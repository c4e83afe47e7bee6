//! Jenkins HTTP adapter for the [`CiBackend`] port.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    branch_build_url, job_listing_url, BranchJob, CiBackend, CiError, CiResult, JobTarget,
};

/// `tree` filter asking Jenkins for each child job's last successful build.
pub const JOB_LISTING_TREE: &str = "jobs[name,lastSuccessfulBuild[number,result,timestamp]]";

#[derive(Debug, Deserialize)]
struct JobListing {
    #[serde(default)]
    jobs: Vec<BranchJob>,
}

/// Jenkins client. Requests are bounded by the configured timeout and never
/// retried.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http_client: reqwest::Client,
}

impl JenkinsClient {
    pub fn new(timeout: Duration) -> CiResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("railyard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CiError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http_client })
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        target: &JobTarget,
    ) -> reqwest::RequestBuilder {
        match &target.credentials {
            Some(creds) => request.basic_auth(&creds.user, Some(&creds.token)),
            None => request,
        }
    }
}

#[async_trait]
impl CiBackend for JenkinsClient {
    async fn list_branch_jobs(&self, target: &JobTarget) -> CiResult<Vec<BranchJob>> {
        let url = job_listing_url(target);
        debug!(%url, "fetching multibranch job listing");

        let request = self
            .http_client
            .get(&url)
            .query(&[("tree", JOB_LISTING_TREE)]);
        let response = self
            .authorize(request, target)
            .send()
            .await
            .map_err(transport_err)?;

        let response = check_status(response, &url).await?;
        let listing: JobListing = response
            .json()
            .await
            .map_err(|e| CiError::Decode(e.to_string()))?;

        debug!(jobs = listing.jobs.len(), "job listing received");
        Ok(listing.jobs)
    }

    async fn trigger_branch_build(&self, target: &JobTarget, branch: &str) -> CiResult<()> {
        let url = branch_build_url(target, branch);
        info!(%url, branch, "triggering branch build");

        let request = self.http_client.post(&url);
        let response = self
            .authorize(request, target)
            .send()
            .await
            .map_err(transport_err)?;

        check_status(response, &url).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response, url: &str) -> CiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(CiError::NotFound {
            url: url.to_string(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(CiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn transport_err(e: reqwest::Error) -> CiError {
    if e.is_timeout() {
        CiError::Transport(format!("request timed out: {e}"))
    } else {
        CiError::Transport(e.to_string())
    }
}
