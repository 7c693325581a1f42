//! GitHub integration for release operations
//!
//! [`ReleaseTransport`] is the seam between release logic and HTTP:
//! [`GitHubApi`] talks to the real API, tests substitute a recording fake.

mod release_manager;
mod retry;
mod transport;
mod types;

pub use release_manager::{ReleaseClient, upload_endpoint};
pub use retry::retry_with_backoff;
pub use transport::{GitHubApi, ReleaseTransport};
pub use types::{NewRelease, Release, UploadedAsset};

/// Content type for the release archive
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Content type for raw executables
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
