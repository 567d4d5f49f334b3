//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer durations, long-break cadence and auto-continue
//! - Notification and sound preferences
//! - Statistics presentation (week start, chart window, history length)
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::settings::{check, Settings, SettingsProvider};
use crate::stats::{WeekStart, MAX_HISTOGRAM_DAYS};

pub const CHART_DAYS_RANGE: RangeInclusive<u32> = 1..=MAX_HISTOGRAM_DAYS;
pub const HISTORY_LIMIT_RANGE: RangeInclusive<u32> = 1..=1000;

/// Timer-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_pomodoros_until_long_break")]
    pub pomodoros_until_long_break: u32,
    /// Start the next phase automatically when the current one ends.
    #[serde(default = "default_true")]
    pub auto_continue: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_sound")]
    pub work_sound: String,
    #[serde(default = "default_sound")]
    pub break_sound: String,
}

/// Statistics presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default = "default_chart_days")]
    pub chart_days: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_pomodoros_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_sound() -> String {
    "default".into()
}
fn default_chart_days() -> u32 {
    14
}
fn default_history_limit() -> u32 {
    50
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            pomodoros_until_long_break: default_pomodoros_until_long_break(),
            auto_continue: true,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_enabled: true,
            work_sound: default_sound(),
            break_sound: default_sound(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::default(),
            chart_days: default_chart_days(),
            history_limit: default_history_limit(),
        }
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check("chart_days", self.chart_days, CHART_DAYS_RANGE)?;
        check("history_limit", self.history_limit, HISTORY_LIMIT_RANGE)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u32>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot assign to a section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default config file location inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate().map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// The change is applied only if the resulting config is still valid;
    /// nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the value is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        *self = updated;
        Ok(())
    }

    /// Restore every section to its defaults.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }

    /// Check every ranged field, returning the timer settings on success.
    pub fn validate(&self) -> Result<Settings, ValidationError> {
        self.stats.validate()?;
        self.validated_settings()
    }

    /// Timer settings, checked against their declared ranges.
    pub fn validated_settings(&self) -> Result<Settings, ValidationError> {
        Settings::new(
            self.timer.work_minutes,
            self.timer.short_break_minutes,
            self.timer.long_break_minutes,
            self.timer.pomodoros_until_long_break,
            self.timer.auto_continue,
        )
    }
}

impl SettingsProvider for Config {
    /// Falls back to defaults if the config was edited into an invalid state
    /// after loading.
    fn settings(&self) -> Settings {
        self.validated_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid timer settings; using defaults");
            Settings::default()
        })
    }
}
