//! Release build invocation and artifact discovery.
//!
//! Every build goes to its own `target_build_<timestamp>` directory so a
//! restarted or concurrent cargo never fights over a shared target lock.

use crate::config::ProjectConfig;
use crate::error::{ReleaseError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Prefix of per-run build output directories under the project root
pub const BUILD_DIR_PREFIX: &str = "target_build_";

/// Cargo's profile subdirectory holding release binaries
pub const RELEASE_SUBDIR: &str = "release";

/// Default `-j` value: cargo's shared cache locks do not tolerate more
pub const DEFAULT_JOBS: u32 = 1;

/// Inputs for one build
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Fresh output directory passed as `--target-dir`
    pub output_dir: &'a Path,
    /// Parallel job cap for the build tool
    pub jobs: u32,
    /// Cargo features to enable
    pub features: &'a [String],
    /// Trust existing output instead of building
    pub skip: bool,
}

/// Binaries found in a build output, in configured order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifactSet {
    entries: Vec<(String, PathBuf)>,
}

impl BuildArtifactSet {
    /// Iterate `(file name, path)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Path of the artifact with the given file name
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    /// Artifact file names
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(name, _)| name).collect()
    }

    /// Number of artifacts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no artifacts were found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File name of a binary on the current platform (`app` or `app.exe`)
pub fn executable_name(binary: &str) -> String {
    format!("{binary}{}", std::env::consts::EXE_SUFFIX)
}

/// A `target_build_<timestamp>` path under `root` that does not exist yet
pub fn fresh_output_dir(root: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut candidate = root.join(format!("{BUILD_DIR_PREFIX}{stamp}"));
    let mut n = 1;
    while candidate.exists() {
        n += 1;
        candidate = root.join(format!("{BUILD_DIR_PREFIX}{stamp}_{n}"));
    }
    candidate
}

/// Most recent existing `target_build_*` directory, for `--skip-build`
pub fn latest_output_dir(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(BUILD_DIR_PREFIX))
        })
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

/// Arguments passed to the build tool
pub fn cargo_args(request: &BuildRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["build", "--release", "--locked", "-j"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(request.jobs.to_string().into());
    args.push("--target-dir".into());
    args.push(request.output_dir.as_os_str().to_owned());
    if !request.features.is_empty() {
        args.push("--features".into());
        args.push(request.features.join(",").into());
    }
    args
}

/// Run the release build, unless `request.skip` is set.
///
/// A non-zero exit becomes [`ReleaseError::BuildFailure`] with the captured
/// output. Cancelling `cancel` kills the build process.
pub async fn build(
    project: &ProjectConfig,
    request: &BuildRequest<'_>,
    cancel: &CancellationToken,
) -> Result<()> {
    if request.skip {
        log::info!(
            "Skipping build, reusing {}",
            request.output_dir.display()
        );
        return Ok(());
    }

    let program = which::which(&project.build_program).map_err(|e| ReleaseError::BuildFailure {
        code: None,
        output: format!("{} not found on PATH: {e}", project.build_program),
    })?;

    let args = cargo_args(request);
    log::info!(
        "$ {} {}",
        project.build_program,
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .current_dir(&project.root)
        .envs(project.build_env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| ReleaseError::BuildFailure {
        code: None,
        output: format!("failed to start {}: {e}", program.display()),
    })?;

    // Dropping the wait future drops the child, and kill_on_drop ends it.
    let output = tokio::select! {
        output = child.wait_with_output() => output?,
        _ = cancel.cancelled() => {
            return Err(ReleaseError::Cancelled { stage: "build".to_string() });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    log::debug!("build stdout:\n{stdout}");
    log::debug!("build stderr:\n{stderr}");

    if !output.status.success() {
        return Err(ReleaseError::BuildFailure {
            code: output.status.code(),
            output: format!("{stdout}{stderr}"),
        });
    }

    Ok(())
}

/// Verify every required binary exists under `<output_dir>/release`.
///
/// Stops at the first missing binary.
pub fn find_artifacts(output_dir: &Path, binaries: &[String]) -> Result<BuildArtifactSet> {
    let release_dir = output_dir.join(RELEASE_SUBDIR);
    let mut entries = Vec::with_capacity(binaries.len());

    for binary in binaries {
        let file_name = executable_name(binary);
        let path = release_dir.join(&file_name);
        if !path.is_file() {
            return Err(ReleaseError::ArtifactMissing {
                name: file_name,
                dir: release_dir,
            });
        }
        log::debug!("Found artifact {}", path.display());
        entries.push((file_name, path));
    }

    Ok(BuildArtifactSet { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn touch_binary(output_dir: &Path, binary: &str) {
        let release = output_dir.join(RELEASE_SUBDIR);
        std::fs::create_dir_all(&release).unwrap();
        std::fs::write(release.join(executable_name(binary)), b"\x7fELF").unwrap();
    }

    #[test]
    fn test_cargo_args_carry_job_cap_and_target_dir() {
        let features = names(&["web"]);
        let request = BuildRequest {
            output_dir: Path::new("/work/target_build_20250101_000000"),
            jobs: 1,
            features: &features,
            skip: false,
        };
        let args: Vec<String> = cargo_args(&request)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "build",
                "--release",
                "--locked",
                "-j",
                "1",
                "--target-dir",
                "/work/target_build_20250101_000000",
                "--features",
                "web"
            ]
        );
    }

    #[test]
    fn test_fresh_output_dir_never_reuses() {
        let root = tempfile::tempdir().unwrap();
        let first = fresh_output_dir(root.path());
        assert!(
            first
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(BUILD_DIR_PREFIX)
        );
        std::fs::create_dir_all(&first).unwrap();
        let second = fresh_output_dir(root.path());
        assert_ne!(first, second);
    }

    #[test]
    fn test_latest_output_dir() {
        let root = tempfile::tempdir().unwrap();
        assert!(latest_output_dir(root.path()).is_none());
        std::fs::create_dir_all(root.path().join("target")).unwrap();
        std::fs::create_dir_all(root.path().join("target_build_20240101_000000")).unwrap();
        let latest = latest_output_dir(root.path()).unwrap();
        assert!(latest.ends_with("target_build_20240101_000000"));
    }

    #[test]
    fn test_find_artifacts_all_present() {
        let out = tempfile::tempdir().unwrap();
        touch_binary(out.path(), "app");
        touch_binary(out.path(), "app-web");
        let set = find_artifacts(out.path(), &names(&["app", "app-web"])).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec![executable_name("app"), executable_name("app-web")]);
        assert!(set.get(&executable_name("app-web")).is_some());
    }

    #[test]
    fn test_find_artifacts_missing_one() {
        let out = tempfile::tempdir().unwrap();
        touch_binary(out.path(), "app");
        let err = find_artifacts(out.path(), &names(&["app", "app-web"])).unwrap_err();
        match err {
            ReleaseError::ArtifactMissing { name, .. } => {
                assert_eq!(name, executable_name("app-web"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_skip_runs_nothing() {
        let mut project = ProjectConfig::new("/nonexistent");
        project.build_program = "definitely-not-a-build-tool".to_string();
        let request = BuildRequest {
            output_dir: Path::new("/nonexistent/target_build_x"),
            jobs: DEFAULT_JOBS,
            features: &[],
            skip: true,
        };
        build(&project, &request, &CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_build_tool_is_build_failure() {
        let root = tempfile::tempdir().unwrap();
        let mut project = ProjectConfig::new(root.path());
        project.build_program = "definitely-not-a-build-tool".to_string();
        let out = root.path().join("target_build_x");
        let request = BuildRequest {
            output_dir: &out,
            jobs: DEFAULT_JOBS,
            features: &[],
            skip: false,
        };
        let err = build(&project, &request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ReleaseError::BuildFailure { code: None, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_code() {
        let root = tempfile::tempdir().unwrap();
        let mut project = ProjectConfig::new(root.path());
        project.build_program = "false".to_string();
        let out = root.path().join("target_build_x");
        let request = BuildRequest {
            output_dir: &out,
            jobs: DEFAULT_JOBS,
            features: &[],
            skip: false,
        };
        let err = build(&project, &request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ReleaseError::BuildFailure { code: Some(1), .. }));
    }
}
