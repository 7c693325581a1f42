//! ZIP packaging of the release bundle.
//!
//! Binaries, the optional project files and the launcher are gathered in a
//! staging directory whose *contents* become the archive root.

use super::builder::BuildArtifactSet;
use super::launcher;
use super::platform;
use super::staging::StagingDir;
use crate::error::{ReleaseError, Result};
use crate::metadata::ReleaseSettings;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Owned inputs for one archive, so packaging can run on a blocking thread
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Binaries to ship
    pub artifacts: BuildArtifactSet,
    /// Directory receiving the archive (and the staging directory)
    pub out_dir: PathBuf,
    /// Root the optional files are looked up in
    pub project_root: PathBuf,
    /// Launcher and optional-file layout
    pub settings: ReleaseSettings,
}

/// Build `<name>-<version>-<platform>.zip` in `out_dir` and return its path.
///
/// Optional files missing from the project root are skipped. The staging
/// directory is gone when this returns, whatever the outcome.
pub fn package_zip(request: &PackageRequest) -> Result<PathBuf> {
    fs::create_dir_all(&request.out_dir).map_err(|e| {
        packaging_io("create output directory", &request.out_dir, e)
    })?;

    let archive_path = request
        .out_dir
        .join(platform::archive_file_name(&request.name, &request.version));

    let staging = StagingDir::create_in(&request.out_dir)
        .map_err(|e| packaging_io("create staging directory", &request.out_dir, e))?;

    stage_contents(request, staging.path())?;
    compress_dir(staging.path(), &archive_path)?;

    log::info!("Created {}", archive_path.display());
    Ok(archive_path)
}

fn stage_contents(request: &PackageRequest, staging: &Path) -> Result<()> {
    for (file_name, source) in request.artifacts.iter() {
        fs::copy(source, staging.join(file_name))
            .map_err(|e| packaging_io("copy artifact", source, e))?;
    }

    for relative in &request.settings.extra_files {
        let source = request.project_root.join(relative);
        if !source.is_file() {
            log::debug!("Optional file {} not present, skipping", source.display());
            continue;
        }
        let Some(file_name) = source.file_name() else {
            continue;
        };
        fs::copy(&source, staging.join(file_name))
            .map_err(|e| packaging_io("copy optional file", &source, e))?;
    }

    let launch = super::builder::executable_name(&request.settings.launch);
    launcher::write_launcher(staging, &request.settings.launcher_name, &launch)
        .map_err(|e| packaging_io("write launcher", staging, e))?;

    Ok(())
}

/// Deflate every file directly inside `dir` into `archive_path`.
///
/// Writes to a temporary sibling first so a failed run never leaves a
/// truncated archive under the final name.
fn compress_dir(dir: &Path, archive_path: &Path) -> Result<()> {
    let partial = archive_path.with_extension("zip.partial");
    let result = write_zip(dir, &partial).and_then(|()| {
        fs::rename(&partial, archive_path)
            .map_err(|e| packaging_io("finalize archive", archive_path, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_zip(dir: &Path, target: &Path) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| packaging_io("read staging directory", dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let file = fs::File::create(target).map_err(|e| packaging_io("create archive", target, e))?;
    let mut zip = ZipWriter::new(file);
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ReleaseError::packaging(format!("unnamed file {}", path.display())))?;

        zip.start_file(name.clone(), base.unix_permissions(file_mode(path)))
            .map_err(|e| ReleaseError::packaging(format!("add {name} to archive: {e}")))?;
        let mut source =
            fs::File::open(path).map_err(|e| packaging_io("open staged file", path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| packaging_io("compress", path, e))?;
    }

    zip.finish()
        .map_err(|e| ReleaseError::packaging(format!("finish archive {}: {e}", target.display())))?;
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(path: &Path) -> u32 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("exe" | "cmd") => 0o755,
        _ => 0o644,
    }
}

fn packaging_io(action: &str, path: &Path, err: io::Error) -> ReleaseError {
    ReleaseError::packaging(format!("{action} {}: {err}", path.display()))
}
