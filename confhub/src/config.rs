//! Environment-derived service configuration.
//!
//! Secrets accept a `*_FILE` indirection: the plain variable wins, then the
//! file named by `{VAR}_FILE` is read and trimmed, then the value falls back
//! to empty. The remote URL is normalized (scheme, `.git` suffix, embedded
//! token) before anything else sees it.

use resolver::repo_url;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub repo_path: PathBuf,
    /// Normalized remote URL, credential already embedded.
    pub repo_url: String,
    pub default_branch: String,
    pub auth_token: String,
    pub webhook_secret: String,
    pub rate_limit: usize,
    pub rate_limit_window: Duration,
    pub queue_size: usize,
    pub statsd: Option<StatsdConfig>,
}

#[derive(Debug, Clone)]
pub struct StatsdConfig {
    pub host: String,
    pub port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("REPO_URL is not set")]
    MissingRepoUrl,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok())
    }

    fn load(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url =
            read_secret(&get, "REPO_URL", "REPO_URL_FILE").ok_or(ConfigError::MissingRepoUrl)?;
        let token = read_secret(&get, "GIT_AUTH_TOKEN", "GIT_AUTH_TOKEN_FILE").unwrap_or_default();

        let statsd = match plain(&get, "STATSD_HOST") {
            Some(host) => Some(StatsdConfig {
                host,
                port: parse(&get, "STATSD_PORT", 8125)?,
            }),
            None => None,
        };

        Ok(Config {
            port: parse(&get, "APP_PORT", 8080)?,
            repo_path: plain(&get, "REPO_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_repo_path),
            repo_url: repo_url::normalize(&raw_url, &token),
            default_branch: plain(&get, "DEFAULT_BRANCH").unwrap_or_else(|| "main".to_string()),
            auth_token: read_secret(&get, "APP_AUTH_SECRET", "APP_AUTH_SECRET_FILE")
                .unwrap_or_default(),
            webhook_secret: read_secret(&get, "WEBHOOK_SECRET", "WEBHOOK_SECRET_FILE")
                .unwrap_or_default(),
            rate_limit: parse(&get, "RATE_LIMIT", 10)?,
            rate_limit_window: Duration::from_secs(parse(&get, "RATE_LIMIT_WINDOW_SECS", 60)?),
            queue_size: parse(&get, "UPDATE_QUEUE_SIZE", 100)?,
            statsd,
        })
    }
}

fn default_repo_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("etc/confhub/repo")
}

/// A set-but-empty variable counts as unset.
fn plain(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).filter(|value| !value.is_empty())
}

fn read_secret(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    file_key: &str,
) -> Option<String> {
    if let Some(value) = plain(get, key) {
        return Some(value.trim().to_string());
    }
    if let Some(path) = plain(get, file_key) {
        match std::fs::read_to_string(&path) {
            Ok(contents) => return Some(contents.trim().to_string()),
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "could not read secret file");
            }
        }
    }
    None
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match plain(get, key) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value,
        }),
        None => Ok(default),
    }
}
