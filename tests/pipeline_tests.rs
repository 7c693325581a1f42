//! End-to-end pipeline runs against a prebuilt project and a recording
//! release transport. No test here touches the network or runs cargo.

use release_bundler::bundler::builder::{RELEASE_SUBDIR, executable_name};
use release_bundler::bundler::launcher::launcher_file_name;
use release_bundler::bundler::platform::archive_file_name;
use release_bundler::cli::RuntimeConfig;
use release_bundler::github::{
    BINARY_CONTENT_TYPE, NewRelease, Release, ReleaseTransport, UploadedAsset, ZIP_CONTENT_TYPE,
};
use release_bundler::{
    EnvConfig, PipelineOutcome, ProjectConfig, ReleaseApiError, ReleaseError,
    RepositoryIdentifier, RetryConfig, RunMode, RunOptions, pipeline,
};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    GetByTag(String),
    Create(String),
    Upload { name: String, content_type: String },
}

#[derive(Clone, Default)]
struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    releases: Arc<Mutex<Vec<Release>>>,
    failing_uploads: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }
}

impl ReleaseTransport for RecordingTransport {
    async fn get_release_by_tag(
        &self,
        _repo: &RepositoryIdentifier,
        tag: &str,
    ) -> Result<Release, ReleaseApiError> {
        self.calls.lock().unwrap().push(Call::GetByTag(tag.to_string()));
        self.releases
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned()
            .ok_or_else(|| ReleaseApiError::http("get_release_by_tag", 404, "Not Found"))
    }

    async fn create_release(
        &self,
        repo: &RepositoryIdentifier,
        release: &NewRelease,
    ) -> Result<Release, ReleaseApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Create(release.tag_name.clone()));
        let mut releases = self.releases.lock().unwrap();
        let id = releases.len() as u64 + 100;
        let created = Release {
            id,
            tag_name: release.tag_name.clone(),
            upload_url: Some(format!(
                "https://uploads.example.test/repos/{repo}/releases/{id}/assets{{?name,label}}"
            )),
            html_url: Some(format!("https://github.example.test/{repo}/releases/{id}")),
            name: Some(release.name.clone()),
            body: Some(release.body.clone()),
            draft: release.draft,
            prerelease: release.prerelease,
        };
        releases.push(created.clone());
        Ok(created)
    }

    async fn upload_asset(
        &self,
        upload_url: &str,
        content_type: &str,
        body: bytes::Bytes,
    ) -> Result<UploadedAsset, ReleaseApiError> {
        let url = url::Url::parse(upload_url).unwrap();
        let name = url
            .query_pairs()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        self.calls.lock().unwrap().push(Call::Upload {
            name: name.clone(),
            content_type: content_type.to_string(),
        });
        if self.failing_uploads.lock().unwrap().contains(&name) {
            return Err(ReleaseApiError::http("upload_asset", 422, "already_exists"));
        }
        Ok(UploadedAsset {
            id: 1,
            name,
            size: body.len() as u64,
            browser_download_url: None,
        })
    }

    async fn list_release_assets(
        &self,
        _repo: &RepositoryIdentifier,
        _release_id: u64,
    ) -> Result<Vec<UploadedAsset>, ReleaseApiError> {
        Ok(Vec::new())
    }
}

struct Project {
    dir: tempfile::TempDir,
    prebuilt: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            r#"[package]
name = "widget"
version = "1.2.3"
edition = "2021"

[package.metadata.release]
binaries = ["widget", "widget-web"]
launcher-name = "Widget Web UI"
"#,
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "# widget\n").unwrap();

        let prebuilt = dir.path().join("prebuilt");
        let release_dir = prebuilt.join(RELEASE_SUBDIR);
        fs::create_dir_all(&release_dir).unwrap();
        for bin in ["widget", "widget-web"] {
            fs::write(release_dir.join(executable_name(bin)), format!("bin {bin}")).unwrap();
        }

        Self { dir, prebuilt }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> ProjectConfig {
        let mut config = ProjectConfig::new(self.root());
        config.retry = RetryConfig::none();
        config
    }

    fn options(&self, mode: RunMode) -> RunOptions {
        let mut options = RunOptions::new(mode);
        options.skip_build = true;
        options.target_dir = Some(self.prebuilt.clone());
        options.repo = Some("acme/widget".to_string());
        options
    }

    fn archive(&self) -> PathBuf {
        self.root()
            .join("dist")
            .join(archive_file_name("widget", "1.2.3"))
    }
}

fn with_token() -> EnvConfig {
    EnvConfig {
        github_token: Some("t0ken".to_string()),
        ..EnvConfig::default()
    }
}

async fn run(
    project: &Project,
    env: &EnvConfig,
    options: &RunOptions,
    transport: &RecordingTransport,
    connected: &Cell<bool>,
) -> Result<PipelineOutcome, ReleaseError> {
    pipeline::run(
        &project.config(),
        env,
        options,
        &RuntimeConfig::quiet(),
        &CancellationToken::new(),
        |_token: &str| {
            connected.set(true);
            Ok(transport.clone())
        },
    )
    .await
}

fn zip_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[tokio::test]
async fn zip_only_makes_no_network_calls() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);

    let outcome = run(
        &project,
        &with_token(),
        &project.options(RunMode::ZipOnly),
        &transport,
        &connected,
    )
    .await
    .unwrap();

    assert!(transport.calls().is_empty());
    assert!(!connected.get());
    assert!(outcome.repo.is_none());
    assert!(outcome.release.is_none());
    assert_eq!(outcome.archive, project.archive());

    let mut expected = vec![
        executable_name("widget"),
        executable_name("widget-web"),
        "README.md".to_string(),
        launcher_file_name("Widget Web UI"),
    ];
    expected.sort();
    assert_eq!(zip_entries(&outcome.archive), expected);
}

#[tokio::test]
async fn build_only_is_offline_and_needs_no_repository() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);
    let mut options = project.options(RunMode::BuildOnly);
    options.repo = None;

    let outcome = run(&project, &EnvConfig::default(), &options, &transport, &connected)
        .await
        .unwrap();

    assert!(transport.calls().is_empty());
    assert!(!connected.get());
    assert!(outcome.archive.is_file());
}

#[tokio::test]
async fn dry_run_packages_but_stays_offline() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);

    let outcome = run(
        &project,
        &EnvConfig::default(),
        &project.options(RunMode::DryRun),
        &transport,
        &connected,
    )
    .await
    .unwrap();

    assert!(transport.calls().is_empty());
    assert!(!connected.get());
    assert!(outcome.archive.is_file());
    assert_eq!(outcome.tag.as_str(), "v1.2.3");
    assert_eq!(outcome.repo.unwrap().to_string(), "acme/widget");
}

#[tokio::test]
async fn missing_binary_stops_before_packaging() {
    let project = Project::new();
    fs::remove_file(
        project
            .prebuilt
            .join(RELEASE_SUBDIR)
            .join(executable_name("widget-web")),
    )
    .unwrap();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);

    let err = run(
        &project,
        &with_token(),
        &project.options(RunMode::Publish),
        &transport,
        &connected,
    )
    .await
    .unwrap_err();

    match err {
        ReleaseError::ArtifactMissing { name, .. } => assert_eq!(name, executable_name("widget-web")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!project.archive().exists());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn publish_without_token_fails_before_connecting() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);

    let err = run(
        &project,
        &EnvConfig::default(),
        &project.options(RunMode::Publish),
        &transport,
        &connected,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReleaseError::MissingCredential));
    assert!(!connected.get());
    assert!(transport.calls().is_empty());
    // Packaging precedes the credential check
    assert!(project.archive().is_file());
}

#[tokio::test]
async fn publish_creates_release_and_uploads_archive_then_binaries() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);

    let outcome = run(
        &project,
        &with_token(),
        &project.options(RunMode::Publish),
        &transport,
        &connected,
    )
    .await
    .unwrap();

    let archive_name = archive_file_name("widget", "1.2.3");
    assert_eq!(
        transport.calls(),
        vec![
            Call::GetByTag("v1.2.3".to_string()),
            Call::Create("v1.2.3".to_string()),
            Call::Upload {
                name: archive_name.clone(),
                content_type: ZIP_CONTENT_TYPE.to_string()
            },
            Call::Upload {
                name: executable_name("widget"),
                content_type: BINARY_CONTENT_TYPE.to_string()
            },
            Call::Upload {
                name: executable_name("widget-web"),
                content_type: BINARY_CONTENT_TYPE.to_string()
            },
        ]
    );

    let release = outcome.release.unwrap();
    assert_eq!(release.tag_name, "v1.2.3");
    assert_eq!(release.name.as_deref(), Some("widget v1.2.3"));
    assert_eq!(
        outcome.uploaded,
        vec![archive_name, executable_name("widget"), executable_name("widget-web")]
    );
}

#[tokio::test]
async fn second_publish_reuses_release() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);
    let options = project.options(RunMode::Publish);

    let first = run(&project, &with_token(), &options, &transport, &connected)
        .await
        .unwrap();
    let second = run(&project, &with_token(), &options, &transport, &connected)
        .await
        .unwrap();

    assert_eq!(first.release.unwrap().id, second.release.unwrap().id);
    assert_eq!(transport.creates(), 1);
}

#[tokio::test]
async fn failed_upload_does_not_stop_the_others() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    transport
        .failing_uploads
        .lock()
        .unwrap()
        .push(archive_file_name("widget", "1.2.3"));
    let connected = Cell::new(false);

    let err = run(
        &project,
        &with_token(),
        &project.options(RunMode::Publish),
        &transport,
        &connected,
    )
    .await
    .unwrap_err();

    let uploads = transport
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Upload { .. }))
        .count();
    assert_eq!(uploads, 3);
    match err {
        ReleaseError::ReleaseApi(api) => {
            assert_eq!(api.status, Some(422));
            assert!(api.message.contains(&archive_file_name("widget", "1.2.3")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn notes_file_becomes_release_body() {
    let project = Project::new();
    let notes = project.root().join("NOTES.md");
    fs::write(&notes, "Hand-written notes").unwrap();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);
    let mut options = project.options(RunMode::Publish);
    options.notes = Some(notes);
    options.draft = true;

    let outcome = run(&project, &with_token(), &options, &transport, &connected)
        .await
        .unwrap();

    let release = outcome.release.unwrap();
    assert_eq!(release.body.as_deref(), Some("Hand-written notes"));
    assert!(release.draft);
}

#[tokio::test]
async fn tag_override_is_used_verbatim() {
    let project = Project::new();
    let transport = RecordingTransport::default();
    let connected = Cell::new(false);
    let mut options = project.options(RunMode::Publish);
    options.tag = Some("v1.2.3-rc1".to_string());

    run(&project, &with_token(), &options, &transport, &connected)
        .await
        .unwrap();

    assert_eq!(transport.calls()[0], Call::GetByTag("v1.2.3-rc1".to_string()));
}

#[tokio::test]
async fn cancelled_run_stops_before_build() {
    let project = Project::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline::run(
        &project.config(),
        &with_token(),
        &project.options(RunMode::Publish),
        &RuntimeConfig::quiet(),
        &cancel,
        |_token: &str| Ok(RecordingTransport::default()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReleaseError::Cancelled { .. }));
    assert!(!project.archive().exists());
}
