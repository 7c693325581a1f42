//! Target repository resolution (explicit override, environment, git remote)

use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// GitHub repository the release is published to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryIdentifier {
    /// Account or organisation
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// One pattern for both remote shapes: the owner follows either the `:` of an
// scp-like address or the `/` after the host.
static REMOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z][a-z0-9+.-]*://(?:[^@/]+@)?[^/:]+(?::\d+)?/|[^@/\s]+@[^:/\s]+:)(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+?)(?:\.git)?/?$")
        .expect("remote URL regex is valid")
});

impl RepositoryIdentifier {
    /// Parse `owner/name` notation
    pub fn parse(input: &str) -> Option<Self> {
        let (owner, name) = input.trim().split_once('/')?;
        let name = name.trim_end_matches('/').trim_end_matches(".git");
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Extract owner and repo from a git remote URL.
    ///
    /// Supports:
    /// - URL style: `https://github.com/owner/repo.git`, `ssh://git@host/owner/repo`
    /// - SCP style: `git@github.com:owner/repo.git`
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let caps = REMOTE_URL_RE.captures(url.trim())?;
        Some(Self {
            owner: caps["owner"].to_string(),
            name: caps["repo"].to_string(),
        })
    }
}

/// Pick the repository by priority: override, environment value, remote URL.
///
/// A malformed override or environment value is reported rather than skipped,
/// so a typo never silently publishes elsewhere.
pub fn resolve(
    override_arg: Option<&str>,
    env_value: Option<&str>,
    vcs_remote_url: Option<&str>,
) -> Result<RepositoryIdentifier> {
    if let Some(repo) = override_arg {
        return RepositoryIdentifier::parse(repo).ok_or_else(|| ReleaseError::RepoDetection {
            reason: format!("invalid --repo '{repo}'. Expected: owner/name"),
        });
    }

    if let Some(repo) = env_value {
        return RepositoryIdentifier::parse(repo).ok_or_else(|| ReleaseError::RepoDetection {
            reason: format!("invalid GITHUB_REPOSITORY '{repo}'. Expected: owner/name"),
        });
    }

    match vcs_remote_url {
        Some(url) => RepositoryIdentifier::from_remote_url(url).ok_or_else(|| {
            ReleaseError::RepoDetection {
                reason: format!("could not parse owner/repo from remote URL '{url}'"),
            }
        }),
        None => Err(ReleaseError::RepoDetection {
            reason: "no --repo, no GITHUB_REPOSITORY and no git remote 'origin'".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme_widget() -> RepositoryIdentifier {
        RepositoryIdentifier {
            owner: "acme".to_string(),
            name: "widget".to_string(),
        }
    }

    #[test]
    fn test_https_and_scp_remotes_agree() {
        let https = resolve(None, None, Some("https://github.com/acme/widget.git")).unwrap();
        let scp = resolve(None, None, Some("git@github.com:acme/widget.git")).unwrap();
        assert_eq!(https, acme_widget());
        assert_eq!(scp, acme_widget());
        assert_eq!(https.to_string(), "acme/widget");
    }

    #[test]
    fn test_remote_variants() {
        for url in [
            "https://github.com/acme/widget",
            "https://github.com/acme/widget/",
            "https://token@github.com/acme/widget.git",
            "ssh://git@github.com/acme/widget.git",
            "ssh://git@github.com:22/acme/widget.git",
            "git@github.com:acme/widget",
        ] {
            assert_eq!(RepositoryIdentifier::from_remote_url(url), Some(acme_widget()), "{url}");
        }
    }

    #[test]
    fn test_dotted_repo_names_survive() {
        let repo = RepositoryIdentifier::from_remote_url("https://github.com/acme/widget.rs.git")
            .unwrap();
        assert_eq!(repo.name, "widget.rs");
    }

    #[test]
    fn test_priority_order() {
        let remote = Some("git@github.com:remote/repo.git");
        let repo = resolve(Some("cli/repo"), Some("env/repo"), remote).unwrap();
        assert_eq!(repo.owner, "cli");
        let repo = resolve(None, Some("env/repo"), remote).unwrap();
        assert_eq!(repo.owner, "env");
        let repo = resolve(None, None, remote).unwrap();
        assert_eq!(repo.owner, "remote");
    }

    #[test]
    fn test_nothing_matches() {
        assert!(matches!(
            resolve(None, None, None),
            Err(ReleaseError::RepoDetection { .. })
        ));
        assert!(resolve(None, None, Some("/srv/git/widget")).is_err());
        assert!(resolve(Some("widget"), None, None).is_err());
    }
}
