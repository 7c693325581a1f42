//! Command line argument parsing and validation.
//!
//! Without flags the tool builds and zips; `--publish` adds the GitHub release.

use crate::pipeline::{RunMode, RunOptions};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Build, zip and publish a release of a native Rust application
#[derive(Parser, Debug)]
#[command(
    name = "release_bundler",
    version,
    about = "Build, zip and publish a release of a native Rust application",
    long_about = "Build the release binaries, bundle them into a ZIP and optionally publish a GitHub release.

Usage:
  release_bundler                       # build + zip into dist/
  release_bundler --zip-only            # same, never touches the network
  release_bundler --dry-run             # show what would be published
  release_bundler --publish             # create/reuse the release and upload assets
  release_bundler --publish --skip-build --tag v1.2.3-rc1 --prerelease"
)]
pub struct Args {
    /// Create or reuse the GitHub release and upload assets
    #[arg(long)]
    pub publish: bool,

    /// Only build and zip, no GitHub calls
    #[arg(long, conflicts_with = "publish")]
    pub zip_only: bool,

    /// GitHub repository as owner/name (overrides auto-detection)
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Tag to release (default: v<version> from Cargo.toml)
    #[arg(long)]
    pub tag: Option<String>,

    /// Create the release as draft
    #[arg(long)]
    pub draft: bool,

    /// Mark the release as prerelease
    #[arg(long)]
    pub prerelease: bool,

    /// Skip the build and reuse the last build output
    #[arg(long)]
    pub skip_build: bool,

    /// Parallel jobs for the build tool
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: u32,

    /// Print what would be published, no network calls
    #[arg(long)]
    pub dry_run: bool,

    /// Project root containing Cargo.toml
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Output directory for the archive (default: <root>/dist)
    #[arg(long, value_name = "DIR")]
    pub dist: Option<PathBuf>,

    /// Build output to reuse with --skip-build
    #[arg(long, value_name = "DIR", requires = "skip_build")]
    pub target_dir: Option<PathBuf>,

    /// File whose contents become the release notes
    #[arg(long, value_name = "FILE")]
    pub notes: Option<PathBuf>,

    /// Timeout per GitHub API request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Some(tag) = &self.tag
            && tag.trim().is_empty()
        {
            return Err("--tag must not be empty".to_string());
        }

        if let Some(repo) = &self.repo
            && crate::source::RepositoryIdentifier::parse(repo).is_none()
        {
            return Err(format!("--repo '{repo}' is not of the form owner/name"));
        }

        Ok(())
    }

    /// Mode selected by the flags; dry-run wins over everything else
    pub fn mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else if self.zip_only {
            RunMode::ZipOnly
        } else if self.publish {
            RunMode::Publish
        } else {
            RunMode::BuildOnly
        }
    }

    /// Per-run options handed to the pipeline
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: self.mode(),
            repo: self.repo.clone(),
            tag: self.tag.clone(),
            draft: self.draft,
            prerelease: self.prerelease,
            skip_build: self.skip_build,
            jobs: self.jobs,
            target_dir: self.target_dir.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Per-request API timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new() -> Self {
        Self {
            output: super::OutputManager::new(false),
        }
    }

    /// Runtime configuration that prints nothing but errors
    pub fn quiet() -> Self {
        Self {
            output: super::OutputManager::new(true),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

// Terminal write failures are not worth aborting a release over.
impl RuntimeConfig {
    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print a stage header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print a progress line
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}
