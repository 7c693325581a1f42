//! Idempotent release lookup-or-create and asset upload

use super::retry::retry_with_backoff;
use super::transport::ReleaseTransport;
use super::types::{NewRelease, Release, UploadedAsset};
use crate::config::RetryConfig;
use crate::error::{ReleaseApiError, ReleaseError, Result};
use crate::source::RepositoryIdentifier;
use bytes::Bytes;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Release operations for one repository
pub struct ReleaseClient<T> {
    transport: T,
    repo: RepositoryIdentifier,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl<T: ReleaseTransport> ReleaseClient<T> {
    /// Create a client for `repo`
    pub fn new(
        transport: T,
        repo: RepositoryIdentifier,
        retry: RetryConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            repo,
            retry,
            cancel,
        }
    }

    /// Target repository
    pub fn repo(&self) -> &RepositoryIdentifier {
        &self.repo
    }

    /// Return the release for `request.tag_name`, creating it only if the
    /// lookup answers 404.
    ///
    /// An existing release is returned as-is. Differences in draft,
    /// prerelease, title or notes are logged, never written back.
    ///
    /// The lookup is repeated before every retried create, so a create that
    /// succeeded server-side but failed in transit is found instead of
    /// duplicated.
    pub async fn get_or_create_release(&self, request: &NewRelease) -> Result<Release> {
        let (release, created) = retry_with_backoff(
            || self.lookup_or_create(request),
            &self.retry,
            "get_or_create_release",
            &self.cancel,
        )
        .await?;

        if created {
            log::info!("Created release id={} tag={}", release.id, release.tag_name);
        } else {
            log::info!(
                "Release for tag {} already exists (id={})",
                release.tag_name,
                release.id
            );
            warn_on_mismatch(&release, request);
        }

        Ok(release)
    }

    async fn lookup_or_create(
        &self,
        request: &NewRelease,
    ) -> std::result::Result<(Release, bool), ReleaseApiError> {
        match self
            .transport
            .get_release_by_tag(&self.repo, &request.tag_name)
            .await
        {
            Ok(existing) => Ok((existing, false)),
            Err(err) if err.is_not_found() => self
                .transport
                .create_release(&self.repo, request)
                .await
                .map(|created| (created, true)),
            Err(err) => Err(err),
        }
    }

    /// Upload one file as an asset of `release`.
    ///
    /// Every call stands alone: a failure here leaves other uploads of the
    /// same release untouched.
    ///
    /// When a retried POST is rejected as `already_exists`, an earlier attempt
    /// landed without its reply. The stored asset is looked up and returned.
    pub async fn upload_asset(
        &self,
        release: &Release,
        file_path: &Path,
        content_type: &str,
    ) -> Result<UploadedAsset> {
        let asset_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ReleaseApiError::transport(
                    "upload_asset",
                    format!("invalid asset file name: {}", file_path.display()),
                )
            })?;

        let template = release.upload_url.as_deref().ok_or_else(|| {
            ReleaseApiError::transport(
                "upload_asset",
                format!("release {} has no upload_url", release.id),
            )
        })?;
        let endpoint = upload_endpoint(template, asset_name)?;

        let body = Bytes::from(tokio::fs::read(file_path).await?);
        log::info!("Uploading asset {asset_name} ({} bytes)", body.len());

        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.transport
                    .upload_asset(&endpoint, content_type, body.clone())
            },
            &self.retry,
            "upload_asset",
            &self.cancel,
        )
        .await;

        let asset = match result {
            Ok(asset) => asset,
            Err(ReleaseError::ReleaseApi(err)) if attempts.load(Ordering::Relaxed) > 1 && err.is_already_exists() => {
                log::warn!(
                    "Asset {asset_name} already present after retry; assuming an earlier attempt stored it"
                );
                self.find_asset(release, asset_name)
                    .await?
                    .ok_or(ReleaseError::ReleaseApi(err))?
            }
            Err(err) => return Err(err),
        };

        log::info!("Uploaded asset id={} name={}", asset.id, asset.name);
        Ok(asset)
    }

    async fn find_asset(&self, release: &Release, asset_name: &str) -> Result<Option<UploadedAsset>> {
        let assets = retry_with_backoff(
            || self.transport.list_release_assets(&self.repo, release.id),
            &self.retry,
            "list_release_assets",
            &self.cancel,
        )
        .await?;
        Ok(assets.into_iter().find(|asset| asset.name == asset_name))
    }
}

/// Resolve an upload URL template such as
/// `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`
/// into the concrete endpoint for `asset_name`.
pub fn upload_endpoint(
    template: &str,
    asset_name: &str,
) -> std::result::Result<String, ReleaseApiError> {
    let base = template.split_once('{').map_or(template, |(base, _)| base);
    let mut url = Url::parse(base).map_err(|e| {
        ReleaseApiError::transport("upload_asset", format!("invalid upload_url '{template}': {e}"))
    })?;
    url.query_pairs_mut().append_pair("name", asset_name);
    Ok(url.into())
}

fn warn_on_mismatch(existing: &Release, requested: &NewRelease) {
    if existing.draft != requested.draft {
        log::warn!(
            "Existing release {} has draft={}, requested draft={}; keeping existing",
            existing.tag_name,
            existing.draft,
            requested.draft
        );
    }
    if existing.prerelease != requested.prerelease {
        log::warn!(
            "Existing release {} has prerelease={}, requested prerelease={}; keeping existing",
            existing.tag_name,
            existing.prerelease,
            requested.prerelease
        );
    }
    if existing.body.as_deref().is_some_and(|body| body != requested.body) {
        log::warn!(
            "Existing release {} has different notes; keeping existing",
            existing.tag_name
        );
    }
}
