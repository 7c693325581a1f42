//! Run configuration.
//!
//! Everything the pipeline needs to know about its surroundings is captured
//! once at startup and passed down explicitly. No component reads the process
//! environment on its own.

use std::path::PathBuf;
use std::time::Duration;

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Snapshot of the environment variables the tool understands
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// Bearer token, `GITHUB_TOKEN`
    pub github_token: Option<String>,
    /// Fallback `owner/name`, `GITHUB_REPOSITORY`
    pub github_repository: Option<String>,
    /// API base URL, `GITHUB_API_URL`
    pub github_api_url: Option<String>,
    /// Retry budget override, `RELEASE_RETRY_GITHUB`
    pub retry_github: Option<String>,
    /// Caller's `CARGO_INCREMENTAL`, kept when set
    pub cargo_incremental: Option<String>,
}

impl EnvConfig {
    /// Capture the relevant variables from the process environment
    pub fn from_env() -> Self {
        Self {
            github_token: non_empty_var("GITHUB_TOKEN"),
            github_repository: non_empty_var("GITHUB_REPOSITORY"),
            github_api_url: non_empty_var("GITHUB_API_URL"),
            retry_github: non_empty_var("RELEASE_RETRY_GITHUB"),
            cargo_incremental: non_empty_var("CARGO_INCREMENTAL"),
        }
    }

    /// API base URL without a trailing slash
    pub fn api_url(&self) -> String {
        self.github_api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Locations and limits for one pipeline run
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Project root containing Cargo.toml
    pub root: PathBuf,
    /// Where archives are written
    pub dist_dir: PathBuf,
    /// Build tool executable
    pub build_program: String,
    /// Extra environment for the build process
    pub build_env: Vec<(String, String)>,
    /// Per-request timeout for API calls
    pub http_timeout: Duration,
    /// Retry behaviour for API calls
    pub retry: RetryConfig,
}

impl ProjectConfig {
    /// Configuration rooted at `root` with defaults for everything else
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            dist_dir: root.join("dist"),
            root,
            build_program: "cargo".to_string(),
            build_env: vec![("CARGO_INCREMENTAL".to_string(), "0".to_string())],
            http_timeout: Duration::from_secs(300),
            retry: RetryConfig::default(),
        }
    }

    /// Apply the captured environment: the caller's `CARGO_INCREMENTAL` wins
    /// over the default and the retry budget follows `RELEASE_RETRY_GITHUB`.
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if let Some(value) = &env.cargo_incremental {
            self.build_env
                .retain(|(key, _)| key != "CARGO_INCREMENTAL");
            self.build_env
                .push(("CARGO_INCREMENTAL".to_string(), value.clone()));
        }
        self.retry = RetryConfig::from_env(env);
        self
    }

    /// Path of the package manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("Cargo.toml")
    }
}

/// Retry behaviour for transient release API failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Max retries per API call (0 = try once)
    pub github_api: u32,
    /// Delay before the first retry; doubles on every attempt
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            github_api: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Highest accepted retry budget
    pub const MAX_GITHUB_RETRIES: u32 = 10;

    /// Build from the captured environment, clamping to the maximum
    pub fn from_env(env: &EnvConfig) -> Self {
        let github_api = env
            .retry_github
            .as_deref()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|v| v.min(Self::MAX_GITHUB_RETRIES))
            .unwrap_or(Self::default().github_api);

        Self {
            github_api,
            ..Self::default()
        }
    }

    /// No retries and no waiting
    pub fn none() -> Self {
        Self {
            github_api: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
