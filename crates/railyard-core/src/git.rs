//! Read-only git queries against the caller's local clone.
//!
//! Nothing here fetches, checks out or locks; stale refs are the caller's
//! concern.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::domain::error::{RailyardError, Result};

/// List files that `tip` changed since its merge base with `base`, restricted
/// to `pathspec`.
///
/// Equivalent to `git diff --name-only base...tip -- pathspec`. Calling it
/// with the arguments swapped answers the question for the other side, which
/// is how both directions of a divergence check share one code path.
pub fn files_changed_since_fork(
    repo_dir: &Path,
    base: &str,
    tip: &str,
    pathspec: &str,
) -> Result<Vec<String>> {
    let range = format!("{base}...{tip}");
    debug!(repo = %repo_dir.display(), %range, pathspec, "git diff --name-only");

    let output = Command::new("git")
        .args(["diff", "--name-only", &range, "--", pathspec])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| RailyardError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RailyardError::GitError(format!(
            "git diff {range} failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn commit_file(repo_dir: &Path, rel: &str) {
        let path = repo_dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("-- {rel}\n")).unwrap();
        run_git(repo_dir, &["add", rel]);
        run_git(repo_dir, &["commit", "-m", &format!("add {rel}")]);
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        commit_file(dir.path(), "README.md");
        dir
    }

    #[test]
    fn files_changed_since_fork_ignores_changes_on_base() {
        let repo = make_git_repo();
        run_git(repo.path(), &["branch", "feature"]);
        commit_file(repo.path(), "db/0002_main_only.sql");
        run_git(repo.path(), &["checkout", "feature"]);
        commit_file(repo.path(), "db/0002_feature.sql");

        let forward = files_changed_since_fork(repo.path(), "main", "feature", "db").unwrap();
        assert_eq!(forward, vec!["db/0002_feature.sql".to_string()]);

        let reverse = files_changed_since_fork(repo.path(), "feature", "main", "db").unwrap();
        assert_eq!(reverse, vec!["db/0002_main_only.sql".to_string()]);
    }

    #[test]
    fn files_changed_since_fork_respects_pathspec() {
        let repo = make_git_repo();
        run_git(repo.path(), &["checkout", "-b", "feature"]);
        commit_file(repo.path(), "src/app.py");

        let files = files_changed_since_fork(repo.path(), "main", "feature", "db").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn files_changed_since_fork_fails_on_unknown_ref() {
        let repo = make_git_repo();
        let result = files_changed_since_fork(repo.path(), "main", "no-such-branch", "db");
        assert!(matches!(result, Err(RailyardError::GitError(_))));
    }

    #[test]
    fn is_git_repo_true_for_repo() {
        let repo = make_git_repo();
        assert!(is_git_repo(repo.path()));
    }

    #[test]
    fn is_git_repo_false_for_non_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(dir.path()));
    }
}
