//! Configuration for the mealpass counter tools.
//!
//! TOML file plus `MEALPASS_` environment overrides, validated and
//! translated into `mealpass_core::EngineConfig`. The core never reads
//! disk; everything it needs comes through here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mealpass_core::{EngineConfig, MealWindowConfig, SlotPolicy};

const ENV_PREFIX: &str = "MEALPASS_";
const DB_FILE: &str = "mealpass.db";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Offset of the canteen's local time from UTC, e.g. "+05:30".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default)]
    pub meals: Meals,

    #[serde(default)]
    pub codes: Codes,

    #[serde(default)]
    pub store: Store,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            meals: Meals::default(),
            codes: Codes::default(),
            store: Store::default(),
            defaults: Defaults::default(),
        }
    }
}

fn default_utc_offset() -> String {
    "+00:00".into()
}

/// Meal windows, prices and slot classification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Meals {
    pub lunch_start: String,
    pub lunch_end: String,
    pub dinner_start: String,
    pub dinner_end: String,
    pub lunch_price: u32,
    pub dinner_price: u32,

    /// "cutoff" or "windowed".
    pub policy: String,

    /// Under "cutoff", the first hour that counts as dinner.
    pub cutoff_hour: u32,
}

impl Default for Meals {
    fn default() -> Self {
        Self {
            lunch_start: "12:00".into(),
            lunch_end: "15:00".into(),
            dinner_start: "19:00".into(),
            dinner_end: "22:00".into(),
            lunch_price: 60,
            dinner_price: 60,
            policy: "cutoff".into(),
            cutoff_hour: mealpass_core::DEFAULT_CUTOFF_HOUR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Codes {
    pub ttl_minutes: u64,
    pub length: usize,
}

impl Default for Codes {
    fn default() -> Self {
        Self {
            ttl_minutes: 15,
            length: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Store {
    /// Database file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            path: None,
            timeout_ms: 5_000,
            retries: 2,
            backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "mealpass", "mealpass")
}

fn home_fallback(leaf: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mealpass");
    p.push(leaf);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the record store database.
pub fn default_database_path() -> PathBuf {
    project_dirs().map_or_else(|| home_fallback(DB_FILE), |dirs| dirs.data_dir().join(DB_FILE))
}

impl Config {
    /// Pretty TOML, as `save_config` would write it.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The configured database file, or the platform default.
    pub fn database_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_database_path)
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, file and environment.
///
/// `path` overrides the platform config location. A missing file is not
/// an error; defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path` (or the platform path).
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let toml_str = cfg.to_toml()?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Translation to the engine ───────────────────────────────────────

impl Config {
    /// Validate every field and build the engine's runtime configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let policy = match self.meals.policy.to_ascii_lowercase().as_str() {
            "cutoff" => SlotPolicy::Cutoff {
                hour: self.meals.cutoff_hour,
            },
            "windowed" => SlotPolicy::Windowed,
            other => {
                return Err(invalid(
                    "meals.policy",
                    format!("expected 'cutoff' or 'windowed', got '{other}'"),
                ));
            }
        };

        let windows = MealWindowConfig {
            lunch_start: parse_time("meals.lunch_start", &self.meals.lunch_start)?,
            lunch_end: parse_time("meals.lunch_end", &self.meals.lunch_end)?,
            dinner_start: parse_time("meals.dinner_start", &self.meals.dinner_start)?,
            dinner_end: parse_time("meals.dinner_end", &self.meals.dinner_end)?,
            lunch_price: self.meals.lunch_price,
            dinner_price: self.meals.dinner_price,
            policy,
        };
        windows.validate().map_err(|reason| invalid("meals", reason))?;

        if !(4..=10).contains(&self.codes.length) {
            return Err(invalid(
                "codes.length",
                format!("must be between 4 and 10 digits, got {}", self.codes.length),
            ));
        }
        if self.codes.ttl_minutes == 0 || self.codes.ttl_minutes > 24 * 60 {
            return Err(invalid(
                "codes.ttl_minutes",
                format!("must be between 1 and 1440, got {}", self.codes.ttl_minutes),
            ));
        }
        if self.store.timeout_ms == 0 {
            return Err(invalid("store.timeout_ms", "must be greater than zero"));
        }

        Ok(EngineConfig {
            windows,
            code_ttl: Duration::from_secs(self.codes.ttl_minutes * 60),
            code_length: self.codes.length,
            utc_offset: parse_offset(&self.utc_offset)?,
            store_timeout: Duration::from_millis(self.store.timeout_ms),
            store_retries: self.store.retries,
            retry_backoff: Duration::from_millis(self.store.backoff_ms),
        })
    }
}

fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| invalid(field, format!("expected HH:MM, got '{raw}'")))
}

/// Parse "+05:30", "-0400", "+7", "Z" or "UTC".
pub fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let bad = || invalid("utc_offset", format!("expected +HH:MM, got '{raw}'"));
    let s = raw.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(bad);
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(bad()),
    };
    // Digits and one colon only; also keeps the byte split below on a char boundary
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Err(bad());
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    if hours > 14 || minutes >= 60 {
        return Err(bad());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}
