//! Command line interface for release_bundler.
//!
//! Parses flags, captures the environment once, wires Ctrl-C to cancellation
//! and runs the pipeline against the real GitHub API.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::config::{EnvConfig, ProjectConfig};
use crate::error::{ReleaseError, Result};
use crate::github::GitHubApi;
use crate::pipeline;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    let config = RuntimeConfig::new();

    if let Err(reason) = args.validate() {
        config.error_println(&format!("Invalid arguments: {reason}"));
        return Ok(1);
    }

    let env = EnvConfig::from_env();
    let project = project_config(&args, &env)?;

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let api_url = env.api_url();
    let timeout = project.http_timeout;
    let result = pipeline::run(
        &project,
        &env,
        &args.run_options(),
        &config,
        &cancel,
        |token: &str| GitHubApi::new(token, &api_url, timeout),
    )
    .await;
    ctrl_c.abort();

    match result {
        Ok(_) => Ok(0),
        Err(e) => {
            report_error(&config, &e);
            Ok(1)
        }
    }
}

/// Print an error with its recovery suggestions
pub fn report_error(config: &RuntimeConfig, error: &ReleaseError) {
    config.error_println(&error.to_string());
    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.indent(&format!("• {suggestion}"));
        }
    }
}

fn project_config(args: &Args, env: &EnvConfig) -> Result<ProjectConfig> {
    let root = absolute(&args.root)?;
    let mut project = ProjectConfig::new(root).with_env(env);
    if let Some(dist) = &args.dist {
        project.dist_dir = absolute(dist)?;
    }
    project.http_timeout = args.http_timeout();
    Ok(project)
}

// The build tool runs with the project root as working directory, so every
// path handed to it must not depend on ours.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| ReleaseError::Cli {
        reason: format!("cannot resolve {}: {e}", path.display()),
    })
}
