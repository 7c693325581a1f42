//! Launcher script that starts one bundled binary with elevated privileges.

use std::path::{Path, PathBuf};

/// Launcher file name for the current platform
pub fn launcher_file_name(launcher_name: &str) -> String {
    if cfg!(windows) {
        format!("{launcher_name}.cmd")
    } else {
        format!("{launcher_name}.sh")
    }
}

/// Script text for the current platform.
///
/// The body is a fixed two-line pattern: a shell preamble, then a single
/// command that re-launches `executable` (next to the script) elevated.
pub fn launcher_script(executable: &str) -> String {
    if cfg!(windows) {
        format!(
            "@echo off\r\n\
             powershell -NoProfile -ExecutionPolicy Bypass -Command \"Start-Process -Verb RunAs -FilePath '%~dp0{executable}'\"\r\n"
        )
    } else {
        format!("#!/bin/sh\nexec sudo \"$(dirname \"$0\")/{executable}\" \"$@\"\n")
    }
}

/// Write the launcher into `dir`, returning its path
pub fn write_launcher(dir: &Path, launcher_name: &str, executable: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(launcher_file_name(launcher_name));
    std::fs::write(&path, launcher_script(executable))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_two_lines_and_elevates() {
        let script = launcher_script("app-web");
        assert_eq!(script.lines().count(), 2);
        assert!(script.contains("app-web"));
        if cfg!(windows) {
            assert!(script.contains("-Verb RunAs"));
        } else {
            assert!(script.starts_with("#!/bin/sh"));
            assert!(script.contains("exec sudo"));
        }
    }

    #[test]
    fn test_write_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_launcher(dir.path(), "App Web UI", "app-web").unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            launcher_file_name("App Web UI")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), launcher_script("app-web"));
    }
}
