//! HTTP transport for the GitHub release API.

use super::types::{NewRelease, Release, UploadedAsset};
use crate::error::{ReleaseApiError, ReleaseError, Result};
use crate::source::RepositoryIdentifier;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// The calls a release needs.
///
/// A lookup for a tag without a release must fail with a 404
/// [`ReleaseApiError`]; the client turns that into a create.
#[allow(async_fn_in_trait)]
pub trait ReleaseTransport {
    /// GET the release for `tag`
    async fn get_release_by_tag(
        &self,
        repo: &RepositoryIdentifier,
        tag: &str,
    ) -> std::result::Result<Release, ReleaseApiError>;

    /// POST a new release
    async fn create_release(
        &self,
        repo: &RepositoryIdentifier,
        release: &NewRelease,
    ) -> std::result::Result<Release, ReleaseApiError>;

    /// POST raw bytes to a resolved upload endpoint
    async fn upload_asset(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
    ) -> std::result::Result<UploadedAsset, ReleaseApiError>;

    /// GET the assets already attached to release `release_id`
    async fn list_release_assets(
        &self,
        repo: &RepositoryIdentifier,
        release_id: u64,
    ) -> std::result::Result<Vec<UploadedAsset>, ReleaseApiError>;
}

/// `reqwest` implementation against api.github.com (or `GITHUB_API_URL`)
#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: reqwest::Client,
    api_url: Url,
}

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

impl GitHubApi {
    /// Create a client that sends `token` as bearer credential on every call.
    ///
    /// `timeout` bounds each request from connect to last body byte.
    pub fn new(token: &str, api_url: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ReleaseError::Cli {
                reason: "GITHUB_TOKEN contains characters not allowed in an HTTP header"
                    .to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| ReleaseApiError::transport("client_init", e.to_string()))?;

        let api_url = Url::parse(api_url).map_err(|e| ReleaseError::Cli {
            reason: format!("invalid GITHUB_API_URL '{api_url}': {e}"),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ReleaseError::Cli {
                reason: format!("GITHUB_API_URL '{api_url}' cannot be used as a base URL"),
            });
        }

        Ok(Self { client, api_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl ReleaseTransport for GitHubApi {
    async fn get_release_by_tag(
        &self,
        repo: &RepositoryIdentifier,
        tag: &str,
    ) -> std::result::Result<Release, ReleaseApiError> {
        const OP: &str = "get_release_by_tag";
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "releases", "tags", tag]);
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(|e| send_error(OP, e))?;
        decode(OP, response).await
    }

    async fn create_release(
        &self,
        repo: &RepositoryIdentifier,
        release: &NewRelease,
    ) -> std::result::Result<Release, ReleaseApiError> {
        const OP: &str = "create_release";
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "releases"]);
        log::debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(release)
            .send()
            .await
            .map_err(|e| send_error(OP, e))?;
        decode(OP, response).await
    }

    async fn upload_asset(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
    ) -> std::result::Result<UploadedAsset, ReleaseApiError> {
        const OP: &str = "upload_asset";
        log::debug!("POST {upload_url} ({} bytes, {content_type})", body.len());
        let response = self
            .client
            .post(upload_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| send_error(OP, e))?;
        decode(OP, response).await
    }

    async fn list_release_assets(
        &self,
        repo: &RepositoryIdentifier,
        release_id: u64,
    ) -> std::result::Result<Vec<UploadedAsset>, ReleaseApiError> {
        const OP: &str = "list_release_assets";
        let id = release_id.to_string();
        let mut url = self.endpoint(&["repos", &repo.owner, &repo.name, "releases", &id, "assets"]);
        url.query_pairs_mut().append_pair("per_page", "100");
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(|e| send_error(OP, e))?;
        decode(OP, response).await
    }
}

fn send_error(operation: &str, err: reqwest::Error) -> ReleaseApiError {
    if err.is_timeout() {
        ReleaseApiError::transport(operation, format!("request timed out: {err}"))
    } else {
        ReleaseApiError::transport(operation, err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> std::result::Result<T, ReleaseApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| send_error(operation, e))?;

    if !status.is_success() {
        return Err(ReleaseApiError::http(
            operation,
            status.as_u16(),
            error_message(&text),
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        ReleaseApiError::http(
            operation,
            status.as_u16(),
            format!("unexpected response body: {e}"),
        )
    })
}

/// GitHub error bodies look like `{"message": "...", "errors": [{"code": "..."}]}`.
/// Error codes are appended to the message; anything else falls back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        code: Option<String>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
        #[serde(default)]
        errors: Vec<ErrorDetail>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let codes: Vec<String> = parsed.errors.into_iter().filter_map(|e| e.code).collect();
            if codes.is_empty() {
                parsed.message
            } else {
                format!("{}: {}", parsed.message, codes.join(", "))
            }
        }
        Err(_) => body.chars().take(500).collect(),
    }
}
