//! Version-control queries via the system `git` binary.
//!
//! Both lookups are best-effort: a missing git, a directory that is not a
//! repository or a missing remote all yield the fallback value.

use std::path::Path;
use tokio::process::Command;

/// Branch used as release target when HEAD cannot be read
pub const DEFAULT_TARGET_REF: &str = "main";

/// URL of the `origin` remote, if one is configured
pub async fn origin_url(repo_path: &Path) -> Option<String> {
    run_git(repo_path, &["config", "--get", "remote.origin.url"]).await
}

/// Current branch name, falling back to [`DEFAULT_TARGET_REF`]
pub async fn head_ref(repo_path: &Path) -> String {
    match run_git(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]).await {
        // Detached HEAD reports the literal "HEAD", which is not a valid target
        Some(head) if head != "HEAD" => head,
        _ => DEFAULT_TARGET_REF.to_string(),
    }
}

async fn run_git(repo_path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .await
        .map_err(|e| log::debug!("git {} could not run: {e}", args.join(" ")))
        .ok()?;

    if !output.status.success() {
        log::debug!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}
