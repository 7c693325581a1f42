//! Error types for release_bundler operations.
//!
//! Every stage of the pipeline has its own variant so the driver can report
//! what failed and suggest how to recover. All of them end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release_bundler operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release_bundler operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The package manifest could not be read or lacks name/version
    #[error("Manifest error in {}: {reason}", path.display())]
    ManifestParse {
        /// Manifest path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// No repository identifier could be determined
    #[error("Repository detection failed: {reason}")]
    RepoDetection {
        /// Reason for the error
        reason: String,
    },

    /// The external build tool failed
    #[error("Build failed{}: {}", exit_code_suffix(*code), summarize(output))]
    BuildFailure {
        /// Exit code of the build process, if it ran at all
        code: Option<i32>,
        /// Captured stdout and stderr
        output: String,
    },

    /// A required binary is absent from the build output
    #[error("Required artifact '{name}' not found in {}", dir.display())]
    ArtifactMissing {
        /// Logical artifact name
        name: String,
        /// Directory that was searched
        dir: PathBuf,
    },

    /// Staging or compression failed
    #[error("Packaging failed: {reason}")]
    Packaging {
        /// Reason for the error
        reason: String,
    },

    /// The release API returned an error or could not be reached
    #[error("Release API error: {0}")]
    ReleaseApi(#[from] ReleaseApiError),

    /// Publishing was requested without a token
    #[error("GITHUB_TOKEN not set. Export a GitHub token to publish a release.")]
    MissingCredential,

    /// The run was interrupted
    #[error("Operation cancelled during {stage}")]
    Cancelled {
        /// Stage that was running
        stage: String,
    },

    /// CLI argument errors
    #[error("Invalid arguments: {reason}")]
    Cli {
        /// Reason for the error
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by the GitHub release API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed{}: {message}", status_suffix(*status))]
pub struct ReleaseApiError {
    /// API operation, e.g. `create_release`
    pub operation: String,
    /// HTTP status, `None` for transport failures
    pub status: Option<u16>,
    /// Response body or transport error text
    pub message: String,
}

impl ReleaseApiError {
    /// Create an error for an HTTP response
    pub fn http(operation: &str, status: u16, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an error for a failure that never produced a response
    pub fn transport(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// True for 404 responses
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// True for a 422 rejecting a resource that is already present
    pub fn is_already_exists(&self) -> bool {
        self.status == Some(422) && self.message.contains("already_exists")
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, rate limits and server errors are
    /// transient. Every other status is a definitive answer.
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(408 | 429) => true,
            Some(code) => (500..600).contains(&code),
        }
    }
}

impl ReleaseError {
    /// Shorthand for packaging failures
    pub fn packaging(reason: impl Into<String>) -> Self {
        ReleaseError::Packaging {
            reason: reason.into(),
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::ManifestParse { .. } => vec![
                "Ensure Cargo.toml has a [package] section with name and version".to_string(),
                "Point --root at the project directory".to_string(),
            ],
            ReleaseError::RepoDetection { .. } => vec![
                "Pass --repo owner/name".to_string(),
                "Set GITHUB_REPOSITORY=owner/name".to_string(),
                "Verify git remote URL: git remote -v".to_string(),
            ],
            ReleaseError::BuildFailure { .. } => vec![
                "Run the build manually: cargo build --release --locked".to_string(),
                "Retry with --jobs 1 if the build tool reported lock contention".to_string(),
            ],
            ReleaseError::ArtifactMissing { .. } => vec![
                "Check the binary names in [package.metadata.release]".to_string(),
                "Drop --skip-build or point --target-dir at a finished build".to_string(),
            ],
            ReleaseError::MissingCredential => vec![
                "Export a token with repo scope: export GITHUB_TOKEN=<token>".to_string(),
                "Use --dry-run to preview the release without a token".to_string(),
            ],
            ReleaseError::ReleaseApi(err) if err.status == Some(401) => vec![
                "Verify GITHUB_TOKEN is valid and not expired".to_string(),
            ],
            ReleaseError::ReleaseApi(err) if err.status == Some(403) => vec![
                "Verify the token has write access to the repository".to_string(),
                "Wait for the API rate limit to reset".to_string(),
            ],
            ReleaseError::ReleaseApi(_) if self.is_transient() => vec![
                "GitHub did not answer in time; wait a moment and re-run".to_string(),
                "Raise RELEASE_RETRY_GITHUB or --timeout on a slow network".to_string(),
            ],
            ReleaseError::ReleaseApi(_) => vec![
                "Re-run the release: existing releases are reused, not duplicated".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check whether retrying the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ReleaseError::ReleaseApi(err) => err.is_transient(),
            _ => false,
        }
    }
}

fn exit_code_suffix(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

fn status_suffix(status: Option<u16>) -> String {
    match status {
        Some(status) => format!(" (HTTP {status})"),
        None => String::new(),
    }
}

/// Keep the tail of long build logs; the last lines carry the compiler error.
fn summarize(output: &str) -> String {
    const MAX_LINES: usize = 40;
    let lines: Vec<&str> = output.trim_end().lines().collect();
    if lines.len() <= MAX_LINES {
        return lines.join("\n");
    }
    format!(
        "... ({} lines omitted)\n{}",
        lines.len() - MAX_LINES,
        lines[lines.len() - MAX_LINES..].join("\n")
    )
}
