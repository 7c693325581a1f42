//! Package metadata and release tag resolution from a single Cargo.toml

use crate::error::{ReleaseError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Package metadata extracted from Cargo.toml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Package name from Cargo.toml
    pub name: String,

    /// Package version from Cargo.toml (e.g., "0.1.0")
    pub version: String,
}

/// Packaging layout from `[package.metadata.release]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    /// The two executables every release ships, without platform suffix
    pub binaries: Vec<String>,
    /// Binary started (elevated) by the launcher script
    pub launch: String,
    /// File stem of the launcher script
    pub launcher_name: String,
    /// Cargo features enabled for the release build
    pub features: Vec<String>,
    /// Optional project files copied into the archive when present
    pub extra_files: Vec<String>,
}

/// Everything read from the manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Name and version
    pub metadata: PackageMetadata,
    /// Packaging layout
    pub settings: ReleaseSettings,
}

/// Number of executables in the packaging shape
pub const REQUIRED_BINARY_COUNT: usize = 2;

/// Optional files shipped next to the binaries when the project has them
pub const DEFAULT_EXTRA_FILES: [&str; 3] = ["README.md", "LICENSE", "Icon.png"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawReleaseSettings {
    binaries: Option<Vec<String>>,
    launch: Option<String>,
    launcher_name: Option<String>,
    features: Option<Vec<String>>,
    extra_files: Option<Vec<String>>,
}

/// Load name, version and packaging layout from a Cargo.toml file
pub fn load_manifest(cargo_toml_path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(cargo_toml_path).map_err(|e| {
        manifest_error(cargo_toml_path, format!("failed to read file: {e}"))
    })?;
    parse_manifest(&content, cargo_toml_path)
}

/// Extract metadata from Cargo.toml [package] section
pub fn resolve(cargo_toml_path: &Path) -> Result<PackageMetadata> {
    load_manifest(cargo_toml_path).map(|manifest| manifest.metadata)
}

/// Parse manifest text. `origin` is only used in error messages.
pub fn parse_manifest(content: &str, origin: &Path) -> Result<Manifest> {
    let toml_value: toml::Value = toml::from_str(content)
        .map_err(|e| manifest_error(origin, format!("invalid TOML: {e}")))?;

    let package = toml_value
        .get("package")
        .ok_or_else(|| manifest_error(origin, "no [package] section"))?;

    let string_field = |key: &str| -> Result<String> {
        package
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| manifest_error(origin, format!("missing '{key}' in [package]")))
    };

    let metadata = PackageMetadata {
        name: string_field("name")?,
        version: string_field("version")?,
    };

    let raw = match package.get("metadata").and_then(|m| m.get("release")) {
        Some(table) => table.clone().try_into::<RawReleaseSettings>().map_err(|e| {
            manifest_error(origin, format!("invalid [package.metadata.release]: {e}"))
        })?,
        None => RawReleaseSettings::default(),
    };

    let settings = raw.into_settings(&metadata.name, origin)?;
    Ok(Manifest { metadata, settings })
}

impl RawReleaseSettings {
    fn into_settings(self, package_name: &str, origin: &Path) -> Result<ReleaseSettings> {
        let binaries = self
            .binaries
            .unwrap_or_else(|| vec![package_name.to_string(), format!("{package_name}-web")]);

        if binaries.len() != REQUIRED_BINARY_COUNT
            || binaries[0] == binaries[1]
            || binaries.iter().any(|b| b.trim().is_empty())
        {
            return Err(manifest_error(
                origin,
                format!(
                    "[package.metadata.release] binaries must list exactly {REQUIRED_BINARY_COUNT} distinct names, got {binaries:?}"
                ),
            ));
        }

        let launch = match self.launch {
            Some(launch) if binaries.contains(&launch) => launch,
            Some(launch) => {
                return Err(manifest_error(
                    origin,
                    format!("launch binary '{launch}' is not one of {binaries:?}"),
                ));
            }
            None => binaries[REQUIRED_BINARY_COUNT - 1].clone(),
        };

        Ok(ReleaseSettings {
            launcher_name: self
                .launcher_name
                .unwrap_or_else(|| format!("{package_name} launcher")),
            features: self.features.unwrap_or_default(),
            extra_files: self
                .extra_files
                .unwrap_or_else(|| DEFAULT_EXTRA_FILES.iter().map(|s| s.to_string()).collect()),
            binaries,
            launch,
        })
    }
}

fn manifest_error(path: &Path, reason: impl Into<String>) -> ReleaseError {
    ReleaseError::ManifestParse {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Immutable version label identifying a release
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// `override_tag` if given, otherwise `v<version>`
    pub fn resolve(override_tag: Option<&str>, metadata: &PackageMetadata) -> Result<Self> {
        match override_tag {
            Some(tag) if tag.trim().is_empty() => Err(ReleaseError::Cli {
                reason: "--tag must not be empty".to_string(),
            }),
            Some(tag) => Ok(Self(tag.trim().to_string())),
            None => Ok(Self(format!("v{}", metadata.version))),
        }
    }

    /// The tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
