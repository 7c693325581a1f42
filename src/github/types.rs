//! GitHub release API payloads.
//!
//! Only the fields the client relies on are modelled; everything GitHub may
//! omit is optional.

use serde::{Deserialize, Serialize};

/// A release as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Release id
    pub id: u64,
    /// Tag the release points at
    pub tag_name: String,
    /// Templated asset upload URL, e.g. `https://uploads.github.com/.../assets{?name,label}`
    #[serde(default)]
    pub upload_url: Option<String>,
    /// Release page
    #[serde(default)]
    pub html_url: Option<String>,
    /// Release title
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes
    #[serde(default)]
    pub body: Option<String>,
    /// Draft flag
    #[serde(default)]
    pub draft: bool,
    /// Prerelease flag
    #[serde(default)]
    pub prerelease: bool,
}

/// Request body for creating a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    /// Tag to create the release for
    pub tag_name: String,
    /// Release title
    pub name: String,
    /// Release notes
    pub body: String,
    /// Create as draft
    pub draft: bool,
    /// Mark as prerelease
    pub prerelease: bool,
    /// Branch or commit the tag is created from when it does not exist yet
    pub target_commitish: String,
}

/// An uploaded release asset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    /// Asset id
    pub id: u64,
    /// Asset file name
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Public download link
    #[serde(default)]
    pub browser_download_url: Option<String>,
}
