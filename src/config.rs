use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Config file read when `FOLLOW_SYNC_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "follow-sync.json";

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

// ------------------------------------------------------------
// Resolved configuration
// ------------------------------------------------------------
//
// Built once in `main` and handed down by reference. Nothing in
// the crate reads the environment after this point.
//
// Sources, lowest precedence first:
// - built-in defaults
// - optional JSON file (tunables only)
// - environment variables / `.env`
//
// The account and token are mandatory; a missing one is fatal
// before any request is made.
//
#[derive(Clone)]
pub struct Config {
    /// Account whose follow graph is reconciled
    pub account: String,

    /// Personal access token (needs the `user:follow` scope)
    pub token: String,

    /// REST API root, e.g. https://api.github.com
    pub api_base: Url,

    /// Page size requested from listing endpoints (1..=100)
    pub per_page: u32,

    /// Quota level below which the gate waits for the reset
    pub low_water_mark: u32,

    /// Log planned follow/unfollow calls without issuing them
    pub dry_run: bool,

    /// Transient-failure retry policy of the HTTP session
    pub retry: RetryPolicy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account", &self.account)
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("per_page", &self.per_page)
            .field("low_water_mark", &self.low_water_mark)
            .field("dry_run", &self.dry_run)
            .field("retry", &self.retry)
            .finish()
    }
}

// ------------------------------------------------------------
// File configuration
// ------------------------------------------------------------
//
// Shape of `follow-sync.json`. Every field is optional; credentials
// are deliberately not accepted here.
//
// Example:
//   {
//     "api_base": "https://github.example.com/api/v3",
//     "low_water_mark": 50,
//     "retry": { "max_retries": 5 }
//   }
//
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_base: String,
    pub per_page: u32,
    pub low_water_mark: u32,
    pub dry_run: bool,
    pub retry: RetryPolicy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            per_page: 100,
            low_water_mark: 10,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }
}

// ------------------------------------------------------------
// Retry policy
// ------------------------------------------------------------
//
// Applied by the session to every request. Delay before retry n
// (1-based) is zero for the first retry, then
// `backoff_factor * 2^(n-1)`, capped at `max_backoff`.
//
// With the defaults: 0s, 2s, 4s.
//
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,

    pub backoff_factor_ms: u64,

    pub max_backoff_ms: u64,

    /// HTTP statuses treated as transient
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor_ms: 1_000,
            max_backoff_ms: 120_000,
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Delay before the given retry (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }

        let factor = 2u64.saturating_pow(retry - 1);
        let ms = self
            .backoff_factor_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);

        Duration::from_millis(ms)
    }
}

impl Config {
    /// Loads `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;

        let file = match env::var("FOLLOW_SYNC_CONFIG") {
            Ok(path) => load_file(Path::new(&path))?,
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    load_file(path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Merges file settings with environment lookups and validates the result.
    ///
    /// `lookup` abstracts the environment so resolution stays testable.
    ///
    /// VARIABLES:
    /// - `GITHUB_USERNAME`, falling back to `USERNAME`
    /// - `GITHUB_TOKEN`, falling back to `TOKEN`
    /// - `GITHUB_API_URL` overrides `api_base`
    /// - `FOLLOW_SYNC_DRY_RUN` overrides `dry_run`
    ///
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let account = non_empty("GITHUB_USERNAME")
            .or_else(|| non_empty("USERNAME"))
            .ok_or_else(|| {
                SyncError::Config("GITHUB_USERNAME (or USERNAME) is required".into())
            })?;

        let token = non_empty("GITHUB_TOKEN")
            .or_else(|| non_empty("TOKEN"))
            .ok_or_else(|| SyncError::Config("GITHUB_TOKEN (or TOKEN) is required".into()))?;

        let api_base = non_empty("GITHUB_API_URL").unwrap_or(file.api_base);
        let api_base = parse_api_base(&api_base)?;

        let dry_run = match non_empty("FOLLOW_SYNC_DRY_RUN") {
            Some(raw) => parse_flag("FOLLOW_SYNC_DRY_RUN", &raw)?,
            None => file.dry_run,
        };

        if !(1..=100).contains(&file.per_page) {
            return Err(SyncError::Config(format!(
                "per_page must be between 1 and 100, got {}",
                file.per_page
            )));
        }

        Ok(Self {
            account: account.trim().to_string(),
            token: token.trim().to_string(),
            api_base,
            per_page: file.per_page,
            low_water_mark: file.low_water_mark,
            dry_run,
            retry: file.retry,
        })
    }
}

/// A missing `.env` is normal outside development; anything else is fatal.
fn check_dotenv<T>(outcome: std::result::Result<T, dotenvy::Error>) -> Result<()> {
    match outcome {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(SyncError::Config(format!("invalid .env file: {e}"))),
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&data)
        .map_err(|e| SyncError::Config(format!("invalid {}: {}", path.display(), e)))
}

fn parse_api_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SyncError::Config(format!("invalid API base URL {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(SyncError::Config(format!(
            "API base URL must be http(s), got {raw:?}"
        )));
    }

    Ok(url)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SyncError::Config(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

/// Config pointing at a mock server, with retries that do not sleep long.
#[cfg(test)]
pub(crate) fn test_config(api_base: &str) -> Config {
    // Same provider `main` installs; later calls are no-ops
    let _ = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::ring::default_provider(),
    );

    Config {
        account: "octocat".into(),
        token: "test-token".into(),
        api_base: parse_api_base(api_base).expect("mock server uri"),
        per_page: 100,
        low_water_mark: 10,
        dry_run: false,
        retry: RetryPolicy {
            backoff_factor_ms: 1,
            ..RetryPolicy::default()
        },
    }
}
