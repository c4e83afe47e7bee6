//! In-memory CI backend (testing only)
//!
//! [`StaticCiBackend`] serves a fixed job listing and records every call so
//! tests can assert on what reached the "network".

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ci::{BranchJob, BuildSummary, CiBackend, CiError, CiResult, JobTarget};

#[derive(Debug, Default)]
struct Calls {
    listed: Vec<JobTarget>,
    triggered: Vec<(JobTarget, String)>,
}

/// CI backend answering from memory.
#[derive(Debug, Default)]
pub struct StaticCiBackend {
    jobs: Vec<BranchJob>,
    list_error: Option<CiError>,
    trigger_error: Option<CiError>,
    calls: Mutex<Calls>,
}

impl StaticCiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch job whose last successful build happened at `timestamp`.
    pub fn with_build(mut self, branch: &str, timestamp: f64) -> Self {
        self.jobs.push(BranchJob {
            name: crate::ci::encode_segment(branch),
            last_successful_build: Some(BuildSummary {
                number: Some(1),
                result: Some("SUCCESS".to_string()),
                timestamp,
            }),
        });
        self
    }

    /// Add a branch job that has never built successfully.
    pub fn with_unbuilt(mut self, branch: &str) -> Self {
        self.jobs.push(BranchJob {
            name: crate::ci::encode_segment(branch),
            last_successful_build: None,
        });
        self
    }

    /// Make job listing fail.
    pub fn failing_list(mut self, error: CiError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Make build triggers fail.
    pub fn failing_trigger(mut self, error: CiError) -> Self {
        self.trigger_error = Some(error);
        self
    }

    /// Number of listing requests received.
    pub fn list_calls(&self) -> usize {
        self.calls.lock().unwrap().listed.len()
    }

    /// Targets of listing requests, in order.
    pub fn listed_targets(&self) -> Vec<JobTarget> {
        self.calls.lock().unwrap().listed.clone()
    }

    /// `(job name, branch)` of every trigger request, in order.
    pub fn triggered(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .triggered
            .iter()
            .map(|(target, branch)| (target.job_name.clone(), branch.clone()))
            .collect()
    }

    /// Total requests of any kind.
    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.listed.len() + calls.triggered.len()
    }
}

#[async_trait]
impl CiBackend for StaticCiBackend {
    async fn list_branch_jobs(&self, target: &JobTarget) -> CiResult<Vec<BranchJob>> {
        self.calls.lock().unwrap().listed.push(target.clone());
        match &self.list_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.jobs.clone()),
        }
    }

    async fn trigger_branch_build(&self, target: &JobTarget, branch: &str) -> CiResult<()> {
        self.calls
            .lock()
            .unwrap()
            .triggered
            .push((target.clone(), branch.to_string()));
        match &self.trigger_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
