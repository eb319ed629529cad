//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.onceover/config.json`) and environment.
//! `timezone` and `groupDumper` are required; [`Config::validate`] turns the raw file into
//! [`Settings`] and fails fast when either is missing.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Raw config file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// IANA zone name (e.g. "Asia/Jakarta"). Used for error-log file names.
    pub timezone: Option<String>,

    /// Chat that receives relayed view-once media. Overridden by ONCEOVER_GROUP_DUMPER env.
    pub group_dumper: Option<String>,

    /// Substring that triggers the status reply (case-sensitive).
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Text sent back when the trigger matches.
    #[serde(default = "default_reply_text")]
    pub reply_text: String,

    /// Credential directory. Relative paths are resolved against the config file's parent.
    #[serde(default)]
    pub auth_dir: Option<PathBuf>,

    /// Directory for per-error log files (relative to the working directory).
    #[serde(default = "default_error_log_dir")]
    pub error_log_dir: PathBuf,

    /// Reconnect backoff.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Upper bound on remembered replied message ids.
    #[serde(default = "default_replied_capacity")]
    pub replied_capacity: usize,
}

/// Backoff between reconnect attempts: starts at `initial_delay_ms`, doubles up to `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_trigger() -> String {
    ".status".to_string()
}

fn default_reply_text() -> String {
    "I'm OK".to_string()
}

fn default_error_log_dir() -> PathBuf {
    PathBuf::from("errorlog")
}

fn default_replied_capacity() -> usize {
    4096
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: None,
            group_dumper: None,
            trigger: default_trigger(),
            reply_text: default_reply_text(),
            auth_dir: None,
            error_log_dir: default_error_log_dir(),
            reconnect: ReconnectConfig::default(),
            replied_capacity: default_replied_capacity(),
        }
    }
}

/// Why a config could not be turned into [`Settings`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required config key `{0}`")]
    Missing(&'static str),
    #[error("unknown timezone `{0}` (expected an IANA name such as \"Asia/Jakarta\")")]
    UnknownTimezone(String),
    #[error("config key `trigger` must not be empty")]
    EmptyTrigger,
}

/// Validated settings used at runtime. Static for the life of the process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: Tz,
    pub group_dumper: String,
    pub trigger: String,
    pub reply_text: String,
    pub auth_dir: PathBuf,
    pub error_log_dir: PathBuf,
    pub reconnect: ReconnectConfig,
    pub replied_capacity: usize,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolve the dump chat: env ONCEOVER_GROUP_DUMPER overrides config.
pub fn resolve_group_dumper(config: &Config) -> Option<String> {
    non_blank(std::env::var("ONCEOVER_GROUP_DUMPER").ok().as_deref())
        .or_else(|| non_blank(config.group_dumper.as_deref()))
}

impl Config {
    /// Check required keys and resolve paths. `config_path` anchors a relative `authDir`.
    pub fn validate(&self, config_path: &Path) -> Result<Settings, ConfigError> {
        let tz_name = non_blank(self.timezone.as_deref()).ok_or(ConfigError::Missing("timezone"))?;
        let timezone: Tz = tz_name
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(tz_name.clone()))?;
        let group_dumper = resolve_group_dumper(self).ok_or(ConfigError::Missing("groupDumper"))?;
        if self.trigger.is_empty() {
            return Err(ConfigError::EmptyTrigger);
        }
        Ok(Settings {
            timezone,
            group_dumper,
            trigger: self.trigger.clone(),
            reply_text: self.reply_text.clone(),
            auth_dir: resolve_auth_dir(self, config_path),
            error_log_dir: self.error_log_dir.clone(),
            reconnect: self.reconnect,
            replied_capacity: self.replied_capacity.max(1),
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ONCEOVER_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".onceover").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve the credential directory: `authDir` if set (relative paths resolved against the config file's parent), otherwise `auth_info` next to the config.
pub fn resolve_auth_dir(config: &Config, config_path: &Path) -> PathBuf {
    let parent = config_parent(config_path);
    match &config.auth_dir {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                parent.join(d)
            }
        }
        _ => parent.join("auth_info"),
    }
}

/// Load config from the default path (or ONCEOVER_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
