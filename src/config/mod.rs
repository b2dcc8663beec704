// ABOUTME: Configuration types and parsing for pagepush.yml.
// ABOUTME: Handles YAML parsing, token interpolation, and load-time env overrides.

mod ci;
mod deserialize;
mod env_value;
mod init;

pub use ci::CiContext;
pub use env_value::EnvValue;
pub use init::init_config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::cleanup::{CleanupEngine, default_cleanup_patterns, default_preserve_patterns};
use crate::deploy::{DEFAULT_LOCK_TIMEOUT, DEFAULT_PROBE_INTERVAL, MainBranches};
use crate::error::{Error, Result};
use crate::lock::{AdvisoryFileLocker, ExclusiveFileLocker, LockError, Locker};
use crate::retry::RetryPolicy;
use crate::types::RepoSlug;
use crate::vcs::{Committer, RollbackMode};

use deserialize::{deserialize_main_branches, deserialize_repository};

pub const CONFIG_FILENAME: &str = "pagepush.yml";
pub const CONFIG_FILENAME_ALT: &str = "pagepush.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".pagepush/config.yml";

/// Comma-separated main branch list that replaces `main_branches`.
pub const ENV_MAIN_BRANCHES: &str = "PAGEPUSH_MAIN_BRANCHES";

/// Literal token that replaces `token`.
pub const ENV_TOKEN: &str = "PAGEPUSH_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_repository")]
    pub repository: Option<RepoSlug>,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Remote URL; defaults to the GitHub HTTPS remote of `repository`.
    #[serde(default)]
    pub remote: Option<String>,

    #[serde(default)]
    pub token: Option<EnvValue>,

    /// Site root; defaults to the repository's GitHub Pages URL.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(
        default = "default_main_branches",
        deserialize_with = "deserialize_main_branches"
    )]
    pub main_branches: NonEmpty<String>,

    #[serde(default)]
    pub committer: Committer,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub push: PushConfig,

    #[serde(default)]
    pub verify: Option<VerifyConfig>,

    #[serde(default)]
    pub rollback: RollbackMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Removal patterns applied on every publish.
    #[serde(default = "default_cleanup_patterns")]
    pub patterns: Vec<String>,

    /// Paths never removed, in addition to the built-in protected names.
    #[serde(default = "default_preserve_patterns")]
    pub preserve: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            patterns: default_cleanup_patterns(),
            preserve: default_preserve_patterns(),
        }
    }
}

/// Which file locker guards the target branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStrategy {
    #[default]
    Exclusive,
    Advisory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Directory holding lock files; the system temp dir when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub strategy: LockStrategy,

    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            dir: None,
            timeout: default_lock_timeout(),
            strategy: LockStrategy::default(),
            stale_after: default_stale_after(),
        }
    }
}

impl LockConfig {
    pub fn lock_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_attempts")]
    pub attempts: u32,

    #[serde(default = "default_push_backoff", with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            attempts: default_push_attempts(),
            backoff: default_push_backoff(),
        }
    }
}

impl PushConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.attempts, self.backoff)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_probe_interval", with = "humantime_serde")]
    pub interval: Duration,
}

/// A file locker chosen by [`LockStrategy`].
#[derive(Debug, Clone)]
pub enum FileLocker {
    Exclusive(ExclusiveFileLocker),
    Advisory(AdvisoryFileLocker),
}

#[async_trait::async_trait]
impl Locker for FileLocker {
    async fn try_acquire(&self, name: &str) -> std::result::Result<bool, LockError> {
        match self {
            FileLocker::Exclusive(l) => l.try_acquire(name).await,
            FileLocker::Advisory(l) => l.try_acquire(name).await,
        }
    }

    async fn release(&self, name: &str) -> std::result::Result<(), LockError> {
        match self {
            FileLocker::Exclusive(l) => l.release(name).await,
            FileLocker::Advisory(l) => l.release(name).await,
        }
    }

    fn poll_interval(&self) -> Duration {
        match self {
            FileLocker::Exclusive(l) => l.poll_interval(),
            FileLocker::Advisory(l) => l.poll_interval(),
        }
    }

    fn take_stale_notices(&self) -> Vec<String> {
        match self {
            FileLocker::Exclusive(l) => l.take_stale_notices(),
            FileLocker::Advisory(l) => l.take_stale_notices(),
        }
    }
}

fn default_branch() -> String {
    "gh-pages".to_string()
}

fn default_main_branches() -> NonEmpty<String> {
    NonEmpty::from(("main".to_string(), vec!["master".to_string()]))
}

fn default_lock_timeout() -> Duration {
    DEFAULT_LOCK_TIMEOUT
}

fn default_stale_after() -> Duration {
    Duration::from_secs(3600)
}

fn default_push_attempts() -> u32 {
    3
}

fn default_push_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_probe_interval() -> Duration {
    DEFAULT_PROBE_INTERVAL
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: None,
            branch: default_branch(),
            remote: None,
            token: None,
            base_url: None,
            main_branches: default_main_branches(),
            committer: Committer::default(),
            cleanup: CleanupConfig::default(),
            lock: LockConfig::default(),
            push: PushConfig::default(),
            verify: None,
            rollback: RollbackMode::default(),
        }
    }
}

impl Config {
    /// Parse YAML without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        Self::find(dir)
            .map(|path| Self::load(&path))
            .unwrap_or_else(|| Err(Error::ConfigNotFound(dir.to_path_buf())))
    }

    /// Like [`discover`](Self::discover), but falls back to defaults plus
    /// environment overrides when no file exists.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => {
                tracing::debug!("no config file in {}, using defaults", dir.display());
                let mut config = Self::default();
                config.apply_env_overrides()?;
                Ok(config)
            }
        }
    }

    fn find(dir: &Path) -> Option<PathBuf> {
        [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() {
            return Err(Error::InvalidConfig("branch cannot be empty".to_string()));
        }
        if self.push.attempts == 0 {
            return Err(Error::InvalidConfig(
                "push.attempts must be at least 1".to_string(),
            ));
        }
        crate::cleanup::validate_patterns(&self.cleanup.patterns)
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Apply `PAGEPUSH_MAIN_BRANCHES` and `PAGEPUSH_TOKEN`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(list) = std::env::var(ENV_MAIN_BRANCHES) {
            let parsed = MainBranches::parse(&list).ok_or_else(|| {
                Error::InvalidConfig(format!("{ENV_MAIN_BRANCHES} lists no branch names"))
            })?;
            self.main_branches = parsed.into_inner();
        }
        if let Ok(token) = std::env::var(ENV_TOKEN)
            && !token.is_empty()
        {
            self.token = Some(EnvValue::Literal(token));
        }
        Ok(())
    }

    /// The configured repository, or `fallback` (typically from CI).
    pub fn repository_or(&self, fallback: Option<&str>) -> Result<RepoSlug> {
        match (&self.repository, fallback) {
            (Some(repo), _) => Ok(repo.clone()),
            (None, Some(value)) => {
                RepoSlug::new(value).map_err(|e| Error::InvalidConfig(e.to_string()))
            }
            (None, None) => Err(Error::MissingRepository),
        }
    }

    pub fn resolve_token(&self) -> Result<Option<String>> {
        self.token.as_ref().map(EnvValue::resolve).transpose()
    }

    pub fn remote_url(&self, repository: &RepoSlug, token: Option<&str>) -> String {
        match &self.remote {
            Some(remote) => remote.clone(),
            None => repository.remote_url(token),
        }
    }

    pub fn base_url(&self, repository: &RepoSlug) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => repository.pages_url(),
        }
    }

    pub fn main_branches(&self) -> MainBranches {
        MainBranches::from(self.main_branches.clone())
    }

    pub fn verify_timeout(&self) -> Option<Duration> {
        self.verify.as_ref().map(|v| v.timeout)
    }

    pub fn cleaner(&self) -> CleanupEngine {
        CleanupEngine::new(self.cleanup.preserve.clone())
    }

    pub fn locker(&self) -> FileLocker {
        let dir = self.lock.lock_dir();
        match self.lock.strategy {
            LockStrategy::Exclusive => FileLocker::Exclusive(
                ExclusiveFileLocker::new(dir).stale_after(self.lock.stale_after),
            ),
            LockStrategy::Advisory => FileLocker::Advisory(
                AdvisoryFileLocker::new(dir).stale_after(self.lock.stale_after),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.repository.is_none());
        assert_eq!(config.branch, "gh-pages");
        assert_eq!(config.main_branches.len(), 2);
        assert_eq!(config.lock.timeout, Duration::from_secs(300));
        assert_eq!(config.lock.strategy, LockStrategy::Exclusive);
        assert_eq!(config.push.attempts, 3);
        assert_eq!(config.rollback, RollbackMode::Lease);
        assert!(config.verify_timeout().is_none());
    }

    #[test]
    fn parses_full_document() {
        let config = Config::from_yaml(
            r#"
repository: acme/site
branch: pages
token:
  env: SITE_TOKEN
  default: fallback
main_branches: "main, trunk"
committer:
  name: bot
lock:
  strategy: advisory
  timeout: 2m
  stale_after: 30m
push:
  attempts: 5
  backoff: 500ms
verify:
  timeout: 1m
rollback: force
"#,
        )
        .unwrap();

        assert_eq!(config.repository.as_ref().unwrap().to_string(), "acme/site");
        assert_eq!(config.branch, "pages");
        assert_eq!(config.main_branches.tail, vec!["trunk".to_string()]);
        assert_eq!(config.committer.name, "bot");
        assert_eq!(config.committer.email, Committer::default().email);
        assert_eq!(config.lock.strategy, LockStrategy::Advisory);
        assert_eq!(config.lock.timeout, Duration::from_secs(120));
        assert_eq!(config.push.backoff, Duration::from_millis(500));
        assert_eq!(config.verify_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.rollback, RollbackMode::Force);
    }

    #[test]
    fn rejects_invalid_repository() {
        assert!(Config::from_yaml("repository: no-slash").is_err());
    }

    #[test]
    fn rejects_critical_cleanup_pattern() {
        let err = Config::from_yaml("cleanup:\n  patterns: ['*.html']").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_push_attempts() {
        assert!(Config::from_yaml("push:\n  attempts: 0").is_err());
    }

    #[test]
    fn derived_urls_follow_repository() {
        let config = Config::from_yaml("repository: acme/site").unwrap();
        let repo = config.repository_or(None).unwrap();
        assert_eq!(config.base_url(&repo), "https://acme.github.io/site");
        assert_eq!(
            config.remote_url(&repo, None),
            "https://github.com/acme/site.git"
        );
    }

    #[test]
    fn explicit_remote_and_base_url_win() {
        let config = Config::from_yaml(
            "remote: /srv/site.git\nbase_url: https://docs.example.com/\nrepository: acme/site",
        )
        .unwrap();
        let repo = config.repository_or(None).unwrap();
        assert_eq!(config.remote_url(&repo, Some("t")), "/srv/site.git");
        assert_eq!(config.base_url(&repo), "https://docs.example.com");
    }

    #[test]
    fn repository_falls_back_to_ci_value() {
        let config = Config::default();
        assert_eq!(
            config.repository_or(Some("o/r")).unwrap().to_string(),
            "o/r"
        );
        assert!(matches!(
            config.repository_or(None),
            Err(Error::MissingRepository)
        ));
    }
}
