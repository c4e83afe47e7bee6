//! Railyard - deployment readiness for branch-per-environment pipelines
//!
//! The `railyard` command answers "what is live in this environment?" and
//! "is it safe to deploy this branch there?", then triggers the deployment
//! (or a rollback) on the multibranch Jenkins pipeline.
//!
//! ## Commands
//!
//! - `check`: readiness verdict for a branch and environment
//! - `deploy`: readiness check followed by a build trigger
//! - `rollback`: redeploy an earlier branch
//! - `status`: currently deployed branch per environment
//! - `classify`: environment a branch belongs to

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use railyard_core::{
    check_readiness, classify_branch, execute_deployment, is_git_repo, rollback_deployment,
    try_resolve_deployed_build, DeploymentConfig, DeploymentOutcome, JenkinsClient,
};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "railyard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deployment readiness for branch-per-environment CI pipelines", long_about = None)]
struct Cli {
    /// Config file (default: <repo>/.railyard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local clone of the repository
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a branch can be deployed to an environment
    Check {
        /// Branch to deploy
        branch: String,

        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Print the verdict as JSON
        #[arg(long)]
        output_json: bool,
    },

    /// Deploy a branch to an environment
    Deploy {
        /// Branch to deploy
        branch: String,

        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Skip the readiness check
        #[arg(long)]
        force: bool,
    },

    /// Roll an environment back to an earlier branch
    Rollback {
        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Branch to restore (default: the environment's default branch)
        branch: Option<String>,
    },

    /// Show the deployed branch of each environment
    Status {
        /// Only this environment
        #[arg(short, long)]
        env: Option<String>,
    },

    /// Show which environment a branch maps to
    Classify {
        /// Branch name
        branch: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    railyard_core::init_tracing(cli.json, level);

    let path = config::config_path(cli.config.as_deref(), &cli.repo);
    let deployment = config::load_config(&path)?;
    debug!(config = %path.display(), environments = deployment.environments.len(), "config loaded");

    match cli.command {
        Commands::Check {
            branch,
            env,
            output_json,
        } => cmd_check(&deployment, &cli.repo, &branch, &env, output_json).await,
        Commands::Deploy { branch, env, force } => {
            cmd_deploy(&deployment, &cli.repo, &branch, &env, force).await
        }
        Commands::Rollback { env, branch } => {
            cmd_rollback(&deployment, &env, branch.as_deref()).await
        }
        Commands::Status { env } => cmd_status(&deployment, env.as_deref()).await,
        Commands::Classify { branch } => cmd_classify(&deployment, &branch),
    }
}

fn jenkins(config: &DeploymentConfig) -> Result<JenkinsClient> {
    JenkinsClient::new(config.request_timeout()).context("failed to create Jenkins client")
}

fn ensure_repo(repo: &Path) -> Result<()> {
    if !is_git_repo(repo) {
        anyhow::bail!("{} is not a git repository", repo.display());
    }
    Ok(())
}

async fn cmd_check(
    config: &DeploymentConfig,
    repo: &Path,
    branch: &str,
    env: &str,
    output_json: bool,
) -> Result<()> {
    ensure_repo(repo)?;
    let ci = jenkins(config)?;
    let verdict = check_readiness(repo, branch, env, config, &ci).await;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        let mark = if verdict.ready { "✓" } else { "✗" };
        println!("{} {} -> {}: {}", mark, branch, env, verdict.reason);
    }

    if !verdict.ready {
        anyhow::bail!("'{}' is not ready for {}", branch, env);
    }
    Ok(())
}

async fn cmd_deploy(
    config: &DeploymentConfig,
    repo: &Path,
    branch: &str,
    env: &str,
    force: bool,
) -> Result<()> {
    let ci = jenkins(config)?;

    if force {
        println!("Skipping readiness check (--force)");
    } else {
        ensure_repo(repo)?;
        let verdict = check_readiness(repo, branch, env, config, &ci).await;
        if !verdict.ready {
            println!("✗ {}", verdict.reason);
            anyhow::bail!("deployment of '{}' to {} blocked", branch, env);
        }
        println!("✓ {}", verdict.reason);
    }

    report_outcome(execute_deployment(branch, env, config, &ci).await)
}

async fn cmd_rollback(config: &DeploymentConfig, env: &str, branch: Option<&str>) -> Result<()> {
    let target = match branch {
        Some(b) => b.to_string(),
        None => config
            .environment(env)
            .map(|e| e.default_branch.clone())
            .filter(|b| !b.is_empty())
            .with_context(|| format!("no branch given and '{}' has no default branch", env))?,
    };

    println!("Rolling back {} to branch '{}'...", env, target);
    let ci = jenkins(config)?;
    report_outcome(rollback_deployment(&target, env, config, &ci).await)
}

fn report_outcome(outcome: DeploymentOutcome) -> Result<()> {
    if outcome.success {
        println!("✓ {}", outcome.message);
        Ok(())
    } else {
        println!("✗ {}", outcome.message);
        anyhow::bail!("deployment trigger failed")
    }
}

async fn cmd_status(config: &DeploymentConfig, env: Option<&str>) -> Result<()> {
    let names: Vec<&str> = match env {
        Some(name) => vec![name],
        None => config.environments.keys().map(String::as_str).collect(),
    };
    if names.is_empty() {
        println!("No environments configured");
        return Ok(());
    }

    let ci = jenkins(config)?;
    for name in names {
        match try_resolve_deployed_build(name, config, &ci).await {
            Ok(Some(build)) => println!(
                "{:<12} {} (built {})",
                name,
                build.branch_name,
                format_build_time(build.last_successful_build_timestamp)
            ),
            Ok(None) => println!("{:<12} (no successful build)", name),
            Err(e) => println!("{:<12} unresolved: {}", name, e),
        }
    }
    Ok(())
}

fn cmd_classify(config: &DeploymentConfig, branch: &str) -> Result<()> {
    match classify_branch(branch, &config.environments) {
        Some(env) => println!("{} -> {}", branch, env),
        None => println!("{} does not match any environment", branch),
    }
    Ok(())
}

/// Jenkins reports milliseconds since the epoch; tolerate seconds too.
fn format_build_time(timestamp: f64) -> String {
    let millis = if timestamp > 1e11 {
        timestamp as i64
    } else {
        (timestamp * 1000.0) as i64
    };
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn format_build_time_accepts_millis_and_seconds() {
        assert_eq!(format_build_time(1_700_000_000_000.0), "2023-11-14T22:13:20+00:00");
        assert_eq!(format_build_time(1_700_000_000.0), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn parses_rollback_without_branch() {
        let cli = Cli::try_parse_from(["railyard", "rollback", "--env", "prod"]).unwrap();
        match cli.command {
            Commands::Rollback { env, branch } => {
                assert_eq!(env, "prod");
                assert!(branch.is_none());
            }
            _ => panic!("expected rollback"),
        }
    }
}
