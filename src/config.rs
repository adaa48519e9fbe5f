//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::error::ScrapeError;
use crate::retry::RetryPolicy;
use crate::ticketera::Ticketera;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between requests in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient failures (network, 5xx, rate limiting)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Root of the JSON output tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// PostgreSQL connection string
    #[serde(default)]
    pub database_url: Option<String>,

    /// WebDriver endpoint for browser-driven portals
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// CAPTCHA solver settings
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Per-ticketera settings keyed by code (`[ticketeras.puntoticket]`)
    #[serde(default)]
    pub ticketeras: BTreeMap<String, VendorConfig>,
}

/// Settings for one ticketera.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Overrides the built-in back-office URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Events scraped when no `--event-id` is given
    #[serde(default)]
    pub event_ids: Vec<String>,
}

impl fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("base_url", &self.base_url)
            .field("event_ids", &self.event_ids)
            .finish()
    }
}

/// Login credentials for a back-office.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// 2Captcha settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_captcha_base_url")]
    pub base_url: String,
    #[serde(default = "default_captcha_poll_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_captcha_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_captcha_base_url(),
            poll_interval_ms: default_captcha_poll_ms(),
            timeout_secs: default_captcha_timeout_secs(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1500
}

fn default_delay_jitter_ms() -> u64 {
    1500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    1000
}

fn default_retry_max_ms() -> u64 {
    30_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("json_output")
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_captcha_base_url() -> String {
    "https://2captcha.com".to_string()
}

fn default_captcha_poll_ms() -> u64 {
    5000
}

fn default_captcha_timeout_secs() -> u64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            format: OutputFormat::Table,
            output_dir: default_output_dir(),
            database_url: None,
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            captcha: CaptchaConfig::default(),
            ticketeras: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("ticketera.toml");
        if local_config.exists() {
            debug!("Found ticketera.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("ticketera-scraper").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("TICKETERA_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("TICKETERA_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(dir) = std::env::var("TICKETERA_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = Some(url);
        }

        if let Ok(url) = std::env::var("WEBDRIVER_URL") {
            self.webdriver_url = url;
        }

        if let Ok(key) = std::env::var("TWOCAPTCHA_API_KEY") {
            self.captcha.api_key = Some(key);
        }

        for ticketera in Ticketera::all() {
            let prefix = format!("TICKETERA_{}", ticketera.code().to_uppercase());
            let username = std::env::var(format!("{}_USERNAME", prefix)).ok();
            let password = std::env::var(format!("{}_PASSWORD", prefix)).ok();
            let base_url = std::env::var(format!("{}_BASE_URL", prefix)).ok();

            if username.is_none() && password.is_none() && base_url.is_none() {
                continue;
            }

            let vendor = self.ticketeras.entry(ticketera.code().to_string()).or_default();
            if username.is_some() {
                vendor.username = username;
            }
            if password.is_some() {
                vendor.password = password;
            }
            if base_url.is_some() {
                vendor.base_url = base_url;
            }
        }

        self
    }

    /// Settings for `ticketera`, if any were configured.
    pub fn vendor(&self, ticketera: Ticketera) -> Option<&VendorConfig> {
        self.ticketeras.get(ticketera.code())
    }

    /// Login credentials for `ticketera`; both fields are required.
    pub fn credentials(&self, ticketera: Ticketera) -> Result<Credentials, ScrapeError> {
        let vendor = self.vendor(ticketera).ok_or(ScrapeError::MissingCredentials(ticketera))?;
        match (&vendor.username, &vendor.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials { username: username.clone(), password: password.clone() })
            }
            _ => Err(ScrapeError::MissingCredentials(ticketera)),
        }
    }

    /// Back-office URL for `ticketera`, honoring configured overrides.
    pub fn base_url(&self, ticketera: Ticketera) -> String {
        self.vendor(ticketera)
            .and_then(|v| v.base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| ticketera.base_url())
    }

    /// Configured default events for `ticketera`.
    pub fn event_ids(&self, ticketera: Ticketera) -> &[String] {
        self.vendor(ticketera).map(|v| v.event_ids.as_slice()).unwrap_or_default()
    }

    /// Retry policy derived from the configured bounds.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_ms, self.retry_max_ms)
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
