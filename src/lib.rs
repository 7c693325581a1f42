//! # release_bundler
//!
//! Build, bundle and publish a native Rust application as a GitHub release.
//!
//! One run resolves the package name and version from `Cargo.toml`, builds the
//! release binaries into a fresh output directory, zips them together with a
//! launcher script and the project's README/LICENSE/icon, and optionally
//! publishes the archive and binaries to a GitHub release for the version tag.
//!
//! ## Features
//!
//! - **Idempotent publishing**: an existing release for the tag is reused, never duplicated
//! - **Safe packaging**: staging directories are always removed, archives are written atomically
//! - **Offline modes**: `--zip-only` and `--dry-run` never touch the network
//! - **Bounded retries**: transient API failures back off and retry, definitive ones stop the run
//! - **Cancellation**: Ctrl-C kills the build and aborts pending API calls
//!
//! ## Usage
//!
//! ```bash
//! release_bundler                 # build + zip into dist/
//! release_bundler --dry-run       # show the release that would be published
//! release_bundler --publish       # create or reuse the release and upload assets
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod metadata;
pub mod pipeline;
pub mod source;

// Re-export main types for public API
pub use bundler::{BuildArtifactSet, PackageRequest, package_zip};
pub use cli::Args;
pub use config::{EnvConfig, ProjectConfig, RetryConfig};
pub use error::{ReleaseApiError, ReleaseError, Result};
pub use github::{GitHubApi, ReleaseClient, ReleaseTransport};
pub use metadata::{PackageMetadata, ReleaseSettings, ReleaseTag};
pub use pipeline::{PipelineOutcome, RunMode, RunOptions};
pub use source::RepositoryIdentifier;
