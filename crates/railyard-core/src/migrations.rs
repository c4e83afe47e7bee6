//! Migration conflict detection between a candidate and the deployed branch.
//!
//! Two branches conflict when each has introduced migration files the other
//! lacks since they forked. A candidate that only adds migrations on top of
//! the deployed branch is a linear extension and always safe.
//!
//! This flags any bidirectional divergence, including new migrations that
//! would apply cleanly in either order. Sequence-number collision detection
//! would be a stricter, different rule.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::error::Result;
use crate::domain::DeploymentConfig;
use crate::git::files_changed_since_fork;

/// Outcome of a migration conflict check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Both sides introduced migrations the other does not have.
    pub has_conflict: bool,
    /// Migration files the candidate introduces relative to the deployed
    /// branch, in path order.
    pub candidate_only_files: Vec<String>,
}

/// Compare migration files on `candidate` against `deployed`.
///
/// Returns an empty, conflict-free report immediately when detection is
/// disabled. Configured paths absent from the working tree are skipped;
/// paths containing glob characters are handed to git as pathspecs.
pub fn detect_migration_conflicts(
    repo_dir: &Path,
    candidate: &str,
    deployed: &str,
    config: &DeploymentConfig,
) -> Result<MigrationReport> {
    if !config.migration_detection_enabled {
        debug!("migration detection disabled");
        return Ok(MigrationReport::default());
    }

    let paths: Vec<&str> = config
        .migration_paths
        .iter()
        .map(String::as_str)
        .filter(|p| is_present(repo_dir, p))
        .collect();

    let candidate_only_files = collect_changes(repo_dir, deployed, candidate, &paths)?;
    if candidate_only_files.is_empty() {
        return Ok(MigrationReport::default());
    }

    let deployed_only_files = collect_changes(repo_dir, candidate, deployed, &paths)?;
    let has_conflict = !deployed_only_files.is_empty();
    if has_conflict {
        info!(
            candidate,
            deployed,
            candidate_files = ?candidate_only_files,
            deployed_files = ?deployed_only_files,
            "migration histories diverged"
        );
    }

    Ok(MigrationReport {
        has_conflict,
        candidate_only_files,
    })
}

fn collect_changes(repo_dir: &Path, base: &str, tip: &str, paths: &[&str]) -> Result<Vec<String>> {
    let mut files: Vec<String> = Vec::new();
    for path in paths {
        for file in files_changed_since_fork(repo_dir, base, tip, path)? {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    Ok(files)
}

fn is_present(repo_dir: &Path, path: &str) -> bool {
    if is_glob(path) {
        return true;
    }
    let present = repo_dir.join(path).exists();
    if !present {
        debug!(path, "migration path not in working tree, skipping");
    }
    present
}

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}
