//! Publish phase: release lookup-or-create followed by asset uploads.

use crate::bundler::BuildArtifactSet;
use crate::cli::RuntimeConfig;
use crate::error::{ReleaseApiError, ReleaseError, Result};
use crate::github::{
    BINARY_CONTENT_TYPE, NewRelease, Release, ReleaseClient, ReleaseTransport, ZIP_CONTENT_TYPE,
};
use crate::metadata::ReleaseTag;
use std::path::Path;

/// Everything the publish phase talks to
pub(super) struct PublishContext<'a, T> {
    /// Release API client for the target repository
    pub client: &'a ReleaseClient<T>,
    /// Terminal output
    pub output: &'a RuntimeConfig,
}

/// Title of the release: `<name> <tag>`
pub fn release_name(package: &str, tag: &ReleaseTag) -> String {
    format!("{package} {tag}")
}

/// Generated release notes used when no notes file was given
pub fn release_body(package: &str, tag: &ReleaseTag, binaries: &[&str], launcher: &str) -> String {
    let mut body = format!(
        "Automated release for {package} {tag}.\n\nIncludes {} executables plus a launcher:\n\n",
        binaries.len()
    );
    for file in binaries.iter().copied().chain(std::iter::once(launcher)) {
        body.push_str(&format!("- {file}\n"));
    }
    body.push_str("\nSee README.md for usage and notes.");
    body
}

/// Get or create the release, then upload the archive followed by every binary.
///
/// Each upload is attempted even if an earlier one failed. Failures are
/// reported together once all uploads ran. Cancellation stops immediately.
pub(super) async fn publish<T: ReleaseTransport>(
    ctx: &PublishContext<'_, T>,
    request: &NewRelease,
    archive: &Path,
    artifacts: &BuildArtifactSet,
) -> Result<(Release, Vec<String>)> {
    ctx.output.progress(&format!(
        "Looking up release {} in {}",
        request.tag_name,
        ctx.client.repo()
    ));
    let release = ctx.client.get_or_create_release(request).await?;
    ctx.output
        .success_println(&format!("Using release id={} tag={}", release.id, release.tag_name));

    let assets = std::iter::once((archive, ZIP_CONTENT_TYPE))
        .chain(artifacts.iter().map(|(_, path)| (path, BINARY_CONTENT_TYPE)));

    let mut uploaded = Vec::new();
    let mut failures: Vec<(String, ReleaseError)> = Vec::new();

    for (path, content_type) in assets {
        let display = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        ctx.output.progress(&format!("Uploading {display}"));

        match ctx.client.upload_asset(&release, path, content_type).await {
            Ok(asset) => {
                ctx.output
                    .success_println(&format!("Uploaded asset id={} name={}", asset.id, asset.name));
                uploaded.push(asset.name);
            }
            Err(err @ ReleaseError::Cancelled { .. }) => return Err(err),
            Err(err) => {
                ctx.output.error_println(&format!("Upload of {display} failed: {err}"));
                failures.push((display, err));
            }
        }
    }

    if failures.is_empty() {
        return Ok((release, uploaded));
    }

    let status = failures.iter().find_map(|(_, err)| match err {
        ReleaseError::ReleaseApi(api) => api.status,
        _ => None,
    });
    let detail = failures
        .iter()
        .map(|(name, err)| format!("{name} ({err})"))
        .collect::<Vec<_>>()
        .join("; ");

    Err(ReleaseError::ReleaseApi(ReleaseApiError {
        operation: "upload_asset".to_string(),
        status,
        message: format!(
            "{} of {} asset upload(s) failed: {detail}",
            failures.len(),
            failures.len() + uploaded.len()
        ),
    }))
}
