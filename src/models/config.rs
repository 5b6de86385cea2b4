//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Monitored site and link filters
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Persistent state backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Telegram delivery settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Loop cadence and change policy
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = get("MONGO_URI") {
            self.store.mongo_uri = Some(v);
        }
        if let Some(v) = get("MONGO_DB") {
            self.store.database = v;
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(v);
        }
        if let Some(v) = get("BOUNTY_WATCH_STORE") {
            self.store.backend = v.parse()?;
        }
        if let Some(v) = get("BOUNTY_WATCH_INTERVAL_SECS") {
            self.monitor.interval_secs = v.trim().parse().map_err(|_| {
                AppError::config(format!("BOUNTY_WATCH_INTERVAL_SECS is not a number: {v}"))
            })?;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url is invalid: {e}")))?;
        if self.site.link_hosts.is_empty() {
            return Err(AppError::validation("site.link_hosts is empty"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.http.jitter_ratio) {
            return Err(AppError::validation("http.jitter_ratio must be within 0..=1"));
        }
        if self.monitor.interval_secs == 0 {
            return Err(AppError::validation("monitor.interval_secs must be > 0"));
        }
        if self.store.backend == StoreBackend::Mongo
            && self.store.mongo_uri.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err(AppError::validation(
                "store.mongo_uri (MONGO_URI) is required for the mongo backend",
            ));
        }
        if self.telegram.bot_token.is_some() != self.telegram.chat_id.is_some() {
            return Err(AppError::validation(
                "telegram.bot_token and telegram.chat_id must be set together",
            ));
        }
        Ok(())
    }
}

/// Monitored site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root, without trailing path
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Host fragments identifying asset links, in output priority order
    #[serde(default = "defaults::link_hosts")]
    pub link_hosts: Vec<String>,
}

impl SiteConfig {
    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Listing page URL.
    pub fn explore_url(&self) -> String {
        format!("{}/explore/", self.root())
    }

    /// Data endpoint URL for a build token.
    pub fn data_url(&self, token: &str) -> String {
        format!("{}/_next/data/{}/explore.json", self.root(), token)
    }

    /// Detail page URL for a bounty, also used as the permalink.
    pub fn bounty_url(&self, id: &str) -> String {
        format!("{}/bounty/{}/", self.root(), id)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            link_hosts: defaults::link_hosts(),
        }
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::retry_base")]
    pub retry_base_ms: u64,

    #[serde(default = "defaults::retry_max")]
    pub retry_max_ms: u64,

    /// Fraction of each delay added as random jitter
    #[serde(default = "defaults::jitter_ratio")]
    pub jitter_ratio: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_base_ms: defaults::retry_base(),
            retry_max_ms: defaults::retry_max(),
            jitter_ratio: defaults::jitter_ratio(),
        }
    }
}

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Local,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "local" | "file" => Ok(Self::Local),
            other => Err(AppError::config(format!("Unknown store backend: {other}"))),
        }
    }
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// MongoDB connection string
    #[serde(default)]
    pub mongo_uri: Option<String>,

    #[serde(default = "defaults::database")]
    pub database: String,

    /// Directory for the local JSON backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,

    /// Accept invalid TLS certificates from the database server
    #[serde(default = "defaults::allow_invalid_certs")]
    pub allow_invalid_certs: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            mongo_uri: None,
            database: defaults::database(),
            local_dir: defaults::local_dir(),
            allow_invalid_certs: defaults::allow_invalid_certs(),
        }
    }
}

/// Telegram bot settings. Delivery is disabled when unset.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "defaults::telegram_api")]
    pub api_base: String,

    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::telegram_api(),
            bot_token: None,
            chat_id: None,
        }
    }
}

// Keeps the bot token out of logs.
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// How projects absent from the stored state are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewProjectPolicy {
    /// Skip them: no difference, nothing persisted
    #[default]
    Ignore,
    /// Persist them without notifying
    Track,
    /// Persist them and report them as a difference
    Notify,
}

/// Loop controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between successful cycles
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    #[serde(default)]
    pub new_projects: NewProjectPolicy,

    /// Send a message when a cycle finds nothing
    #[serde(default = "defaults::notify_when_unchanged")]
    pub notify_when_unchanged: bool,

    #[serde(default = "defaults::failure_backoff_base")]
    pub failure_backoff_base_secs: u64,

    #[serde(default = "defaults::failure_backoff_max")]
    pub failure_backoff_max_secs: u64,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Wait before retrying after `consecutive` failed cycles.
    pub fn failure_delay(&self, consecutive: u32) -> Duration {
        let exp = consecutive.saturating_sub(1).min(16);
        let secs = self
            .failure_backoff_base_secs
            .saturating_mul(1u64 << exp)
            .min(self.failure_backoff_max_secs);
        Duration::from_secs(secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            new_projects: NewProjectPolicy::default(),
            notify_when_unchanged: defaults::notify_when_unchanged(),
            failure_backoff_base_secs: defaults::failure_backoff_base(),
            failure_backoff_max_secs: defaults::failure_backoff_max(),
        }
    }
}

mod defaults {
    // Site defaults
    pub fn base_url() -> String {
        "https://immunefi.com".into()
    }
    pub fn link_hosts() -> Vec<String> {
        vec![
            "github.com".into(),
            "etherscan.io".into(),
            "bscscan.com".into(),
        ]
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bounty-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_base() -> u64 {
        500
    }
    pub fn retry_max() -> u64 {
        10_000
    }
    pub fn jitter_ratio() -> f64 {
        0.25
    }

    // Store defaults
    pub fn database() -> String {
        "immunefi".into()
    }
    pub fn local_dir() -> String {
        "storage".into()
    }
    pub fn allow_invalid_certs() -> bool {
        true
    }

    pub fn telegram_api() -> String {
        "https://api.telegram.org".into()
    }

    // Monitor defaults
    pub fn interval() -> u64 {
        600
    }
    pub fn notify_when_unchanged() -> bool {
        true
    }
    pub fn failure_backoff_base() -> u64 {
        30
    }
    pub fn failure_backoff_max() -> u64 {
        600
    }
}
