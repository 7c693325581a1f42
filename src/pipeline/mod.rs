//! Release pipeline.
//!
//! Stages run strictly in order and any failure ends the run:
//!
//! 1. Resolve manifest, tag and (when a release is involved) repository
//! 2. Build into a fresh output directory, or reuse one with `--skip-build`
//! 3. Verify the required binaries and package the ZIP
//! 4. Stop here for zip-only and build-only runs; print the plan for dry-runs
//! 5. Require a credential, get or create the release, upload assets

mod phases;

pub use phases::{release_body, release_name};

use crate::bundler::builder::{self, BuildArtifactSet, BuildRequest};
use crate::bundler::{PackageRequest, package_zip};
use crate::cli::RuntimeConfig;
use crate::config::{EnvConfig, ProjectConfig};
use crate::error::{ReleaseError, Result};
use crate::github::{NewRelease, Release, ReleaseClient, ReleaseTransport};
use crate::metadata::{self, Manifest, ReleaseTag};
use crate::source::{self, RepositoryIdentifier};
use crate::{bundler::launcher, git};
use phases::PublishContext;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// What a run does after packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Build and zip, never touch the network
    ZipOnly,
    /// Build and zip; publishing was not requested
    BuildOnly,
    /// Build and zip, then print the release that would be published
    DryRun,
    /// Build, zip, create or reuse the release and upload assets
    Publish,
}

impl RunMode {
    /// Modes that talk about a release need a target repository
    pub fn needs_repository(self) -> bool {
        matches!(self, RunMode::DryRun | RunMode::Publish)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::ZipOnly => "zip-only",
            RunMode::BuildOnly => "build-only",
            RunMode::DryRun => "dry-run",
            RunMode::Publish => "publish",
        })
    }
}

/// Per-run choices, usually taken from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Selected mode
    pub mode: RunMode,
    /// `owner/name` override
    pub repo: Option<String>,
    /// Tag override
    pub tag: Option<String>,
    /// Create the release as draft
    pub draft: bool,
    /// Mark the release as prerelease
    pub prerelease: bool,
    /// Reuse existing build output
    pub skip_build: bool,
    /// Build tool job limit
    pub jobs: u32,
    /// Build output to reuse with `skip_build`
    pub target_dir: Option<PathBuf>,
    /// Release notes file
    pub notes: Option<PathBuf>,
}

impl RunOptions {
    /// Options for `mode` with every flag at its default
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            repo: None,
            tag: None,
            draft: false,
            prerelease: false,
            skip_build: false,
            jobs: builder::DEFAULT_JOBS,
            target_dir: None,
            notes: None,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Mode that ran
    pub mode: RunMode,
    /// Resolved tag
    pub tag: ReleaseTag,
    /// Target repository, resolved only for dry-run and publish
    pub repo: Option<RepositoryIdentifier>,
    /// Path of the ZIP bundle
    pub archive: PathBuf,
    /// Binaries that went into the bundle
    pub artifacts: BuildArtifactSet,
    /// Release that received the assets (publish only)
    pub release: Option<Release>,
    /// Names of uploaded assets in upload order (publish only)
    pub uploaded: Vec<String>,
}

struct Resolved {
    manifest: Manifest,
    tag: ReleaseTag,
    repo: Option<RepositoryIdentifier>,
    target_ref: String,
    notes: Option<String>,
}

/// Run the pipeline.
///
/// `connect` builds the release transport from the credential. It is only
/// called in publish mode, after packaging succeeded and a token is present.
pub async fn run<T, F>(
    project: &ProjectConfig,
    env: &EnvConfig,
    options: &RunOptions,
    output: &RuntimeConfig,
    cancel: &CancellationToken,
    connect: F,
) -> Result<PipelineOutcome>
where
    T: ReleaseTransport,
    F: FnOnce(&str) -> Result<T>,
{
    log::info!("Starting {} run in {}", options.mode, project.root.display());

    let resolved = resolve(project, env, options).await?;
    let metadata = &resolved.manifest.metadata;
    let settings = &resolved.manifest.settings;
    output.section(&format!("{} {}", metadata.name, resolved.tag));
    if let Some(repo) = &resolved.repo {
        output.indent(&format!("Repository: {repo}"));
    }

    ensure_not_cancelled(cancel, "build")?;
    let output_dir = build_output_dir(project, options);
    if options.skip_build {
        output.progress(&format!("Reusing build output in {}", output_dir.display()));
    } else {
        output.progress(&format!(
            "Building release binaries into {} (-j {})",
            output_dir.display(),
            options.jobs
        ));
    }
    let request = BuildRequest {
        output_dir: &output_dir,
        jobs: options.jobs,
        features: &settings.features,
        skip: options.skip_build,
    };
    builder::build(project, &request, cancel).await?;

    let artifacts = builder::find_artifacts(&output_dir, &settings.binaries)?;
    output.success_println(&format!("Found {}", artifacts.names().join(", ")));

    ensure_not_cancelled(cancel, "package")?;
    output.progress("Packaging ZIP bundle");
    let package = PackageRequest {
        name: metadata.name.clone(),
        version: metadata.version.clone(),
        artifacts: artifacts.clone(),
        out_dir: project.dist_dir.clone(),
        project_root: project.root.clone(),
        settings: settings.clone(),
    };
    let archive = tokio::task::spawn_blocking(move || package_zip(&package))
        .await
        .map_err(|e| ReleaseError::packaging(format!("packaging task failed: {e}")))??;
    output.success_println(&format!("Created {}", archive.display()));

    let mut outcome = PipelineOutcome {
        mode: options.mode,
        tag: resolved.tag.clone(),
        repo: resolved.repo.clone(),
        archive,
        artifacts,
        release: None,
        uploaded: Vec::new(),
    };

    match options.mode {
        RunMode::ZipOnly => {
            output.println("Zip-only mode complete.");
            print_files(output, &outcome);
            return Ok(outcome);
        }
        RunMode::BuildOnly => {
            output.println("Build + zip done. Skipping GitHub because --publish is not set.");
            print_files(output, &outcome);
            return Ok(outcome);
        }
        RunMode::DryRun => {
            print_plan(output, env, &resolved, &outcome);
            return Ok(outcome);
        }
        RunMode::Publish => {}
    }

    ensure_not_cancelled(cancel, "publish")?;
    let token = env
        .github_token
        .as_deref()
        .ok_or(ReleaseError::MissingCredential)?;
    let repo = resolved.repo.clone().ok_or_else(|| ReleaseError::RepoDetection {
        reason: "no repository resolved for publish".to_string(),
    })?;

    let client = ReleaseClient::new(connect(token)?, repo, project.retry.clone(), cancel.clone());
    let request = new_release(&resolved, options, &outcome.artifacts);
    let ctx = PublishContext {
        client: &client,
        output,
    };
    let (release, uploaded) = phases::publish(&ctx, &request, &outcome.archive, &outcome.artifacts).await?;

    output.success_println(&format!("Release {} published", release.tag_name));
    if let Some(url) = &release.html_url {
        output.indent(url);
    }
    outcome.release = Some(release);
    outcome.uploaded = uploaded;
    Ok(outcome)
}

async fn resolve(project: &ProjectConfig, env: &EnvConfig, options: &RunOptions) -> Result<Resolved> {
    let manifest = metadata::load_manifest(&project.manifest_path())?;
    let tag = ReleaseTag::resolve(options.tag.as_deref(), &manifest.metadata)?;
    log::info!(
        "Resolved {} {} as tag {tag}",
        manifest.metadata.name,
        manifest.metadata.version
    );

    if !options.mode.needs_repository() {
        return Ok(Resolved {
            manifest,
            tag,
            repo: None,
            target_ref: git::DEFAULT_TARGET_REF.to_string(),
            notes: None,
        });
    }

    // The remote is only consulted when neither override nor environment names a repo
    let remote = if options.repo.is_none() && env.github_repository.is_none() {
        git::origin_url(&project.root).await
    } else {
        None
    };
    let repo = source::resolve(
        options.repo.as_deref(),
        env.github_repository.as_deref(),
        remote.as_deref(),
    )?;
    let target_ref = git::head_ref(&project.root).await;

    let notes = match &options.notes {
        Some(path) => Some(read_notes(path).await?),
        None => None,
    };

    Ok(Resolved {
        manifest,
        tag,
        repo: Some(repo),
        target_ref,
        notes,
    })
}

async fn read_notes(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReleaseError::Cli {
            reason: format!("cannot read release notes {}: {e}", path.display()),
        })
}

fn build_output_dir(project: &ProjectConfig, options: &RunOptions) -> PathBuf {
    if !options.skip_build {
        return builder::fresh_output_dir(&project.root);
    }
    match &options.target_dir {
        Some(dir) => dir.clone(),
        None => builder::latest_output_dir(&project.root)
            .unwrap_or_else(|| builder::fresh_output_dir(&project.root)),
    }
}

fn new_release(resolved: &Resolved, options: &RunOptions, artifacts: &BuildArtifactSet) -> NewRelease {
    let name = &resolved.manifest.metadata.name;
    let launcher = launcher::launcher_file_name(&resolved.manifest.settings.launcher_name);
    NewRelease {
        tag_name: resolved.tag.to_string(),
        name: release_name(name, &resolved.tag),
        body: resolved
            .notes
            .clone()
            .unwrap_or_else(|| release_body(name, &resolved.tag, &artifacts.names(), &launcher)),
        draft: options.draft,
        prerelease: options.prerelease,
        target_commitish: resolved.target_ref.clone(),
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken, stage: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ReleaseError::Cancelled {
            stage: stage.to_string(),
        });
    }
    Ok(())
}

fn print_files(output: &RuntimeConfig, outcome: &PipelineOutcome) {
    output.println("Artifacts:");
    for (_, path) in outcome.artifacts.iter() {
        output.indent(&path.display().to_string());
    }
    output.indent(&outcome.archive.display().to_string());
}

fn print_plan(output: &RuntimeConfig, env: &EnvConfig, resolved: &Resolved, outcome: &PipelineOutcome) {
    let name = &resolved.manifest.metadata.name;
    let mut files = vec![file_name(&outcome.archive)];
    files.extend(outcome.artifacts.iter().map(|(_, path)| file_name(path)));

    output.println("[dry-run] Would create or fetch release and upload assets:");
    if let Some(repo) = &resolved.repo {
        output.indent(&format!("Repo:   {repo}"));
    }
    output.indent(&format!("Tag:    {}", resolved.tag));
    output.indent(&format!("Name:   {}", release_name(name, &resolved.tag)));
    output.indent(&format!("Target: {}", resolved.target_ref));
    output.indent(&format!("Files:  {}", files.join(", ")));

    if env.github_token.is_none() {
        output.warning_println("GITHUB_TOKEN is not set; --publish would fail");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
