//! Configuration parsing and validation.
//!
//! SWAPI Search is configured via a TOML file (default:
//! `config/swapi.toml`). Every section is optional and falls back to the
//! defaults below, so an absent file yields [`Config::minimal`].
//!
//! ```toml
//! [db]
//! path = "./data/swapi.sqlite"
//!
//! [source]
//! base_url = "https://swapi.info/api"
//! timeout_secs = 20
//! max_concurrency = 20
//! max_idle_per_host = 10
//! max_attempts = 3
//! retry_base_ms = 2000
//! retry_cap_ms = 6000
//!
//! [public]
//! base_url = "http://localhost:8000"
//!
//! [retrieval]
//! default_limit = 10
//! max_limit = 100
//!
//! [logging]
//! level = "info"
//! format = "pretty"   # or "json"
//! ```
//!
//! After the file is parsed, [`apply_env`] overlays a handful of environment
//! variables. It takes the variables as a plain map, so it has no side
//! effects and tests can feed it whatever they like:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `SWAPI_BASE_URL` | `source.base_url` |
//! | `API_BASE_URL` | `public.base_url` |
//! | `SWAPI_DB_PATH` | `db.path` |
//! | `LOG_LEVEL` | `logging.level` |
//! | `LOG_FORMAT` | `logging.format` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub public: PublicConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/swapi.sqlite")
}

/// Upstream source and fetcher tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ceiling on in-flight detail requests.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
    /// Total attempts per request, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            max_idle_per_host: default_max_idle_per_host(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
        }
    }
}

fn default_source_base_url() -> String {
    "https://swapi.info/api".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_concurrency() -> usize {
    20
}
fn default_max_idle_per_host() -> usize {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    2000
}
fn default_retry_cap_ms() -> u64 {
    6000
}

/// This system's own public address, used to rewrite stored payload URLs.
#[derive(Debug, Deserialize, Clone)]
pub struct PublicConfig {
    #[serde(default = "default_public_base_url")]
    pub base_url: String,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            base_url: default_public_base_url(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> i64 {
    10
}
fn default_max_limit() -> i64 {
    100
}

impl RetrievalConfig {
    /// Resolve a requested page size against the configured bounds.
    pub fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format: '{}'. Must be pretty or json.", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// All defaults; what an absent config file resolves to.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Overlay environment variables onto a parsed config.
pub fn apply_env(mut config: Config, vars: &HashMap<String, String>) -> Result<Config> {
    let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(v) = get("SWAPI_BASE_URL") {
        config.source.base_url = v.to_string();
    }
    if let Some(v) = get("API_BASE_URL") {
        config.public.base_url = v.to_string();
    }
    if let Some(v) = get("SWAPI_DB_PATH") {
        config.db.path = PathBuf::from(v);
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.logging.level = v.to_string();
    }
    if let Some(v) = get("LOG_FORMAT") {
        config.logging.format = v.parse().context("Invalid LOG_FORMAT")?;
    }

    Ok(config)
}

/// Check cross-field constraints.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.base_url.trim().is_empty() {
        bail!("source.base_url must not be empty");
    }
    if config.public.base_url.trim().is_empty() {
        bail!("public.base_url must not be empty");
    }
    if config.source.max_concurrency == 0 {
        bail!("source.max_concurrency must be >= 1");
    }
    if config.source.max_attempts == 0 {
        bail!("source.max_attempts must be >= 1");
    }
    if config.source.retry_base_ms > config.source.retry_cap_ms {
        bail!("source.retry_base_ms must be <= source.retry_cap_ms");
    }
    if config.retrieval.max_limit < 1 {
        bail!("retrieval.max_limit must be >= 1");
    }
    if !(1..=config.retrieval.max_limit).contains(&config.retrieval.default_limit) {
        bail!("retrieval.default_limit must be in [1, retrieval.max_limit]");
    }
    Ok(())
}

/// Load, overlay, and validate the configuration.
///
/// A missing file is not an error: defaults plus the environment overlay
/// are used instead.
pub fn load_config(path: &Path, vars: &HashMap<String, String>) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::minimal()
    };

    let config = apply_env(config, vars)?;
    validate(&config)?;
    Ok(config)
}
