//! RAII guard for the packaging staging directory.
//!
//! Ensures the directory is removed even when copying or compression fails
//! part way, or the packaging task panics.

use std::path::{Path, PathBuf};

/// Uniquely named directory that is deleted on drop
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create `bundle_<timestamp>_<random>` under `parent`
    pub fn create_in(parent: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = parent.join(format!("bundle_{stamp}_{}", &suffix[..8]));
        // create_dir (not _all) so a name collision is an error, never a reuse
        std::fs::create_dir(&path)?;
        log::debug!("Created staging directory {}", path.display());
        Ok(Self { path })
    }

    /// Staging directory path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        // Drop must never panic; a leftover directory is only reported.
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("Removed staging directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove staging directory {}: {e}",
                self.path.display()
            ),
        }
    }
}
