// src/config.rs
//! Plugin configuration loaded from a TOML file.
//!
//! Keys use collectd's option names:
//!
//! ```toml
//! Path = "/usr/bin/iostat"
//! Interval = 10.0        # scheduling period, seconds
//! IostatInterval = 2     # passed to iostat
//! Count = 2              # passed to iostat
//! Disks = "sda,sdb"
//! DisksRegex = "^nvme"
//! NiceNames = true
//! PluginName = "iostat"
//! Verbose = false
//! Timeout = 30           # per-invocation deadline, seconds
//! ```
//!
//! Unknown keys are returned as warnings and otherwise ignored.

use crate::collector::{CollectorConfig, NamingMode};
use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PATH: &str = "/usr/bin/iostat";
pub const DEFAULT_PLUGIN_NAME: &str = "iostat";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Options as they appear in the config file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileConfig {
    #[serde(default = "default_path")]
    path: PathBuf,

    /// Scheduling period in seconds
    #[serde(default = "default_interval_secs")]
    interval: f64,

    #[serde(default = "default_iostat_interval")]
    iostat_interval: i64,

    #[serde(default = "default_count")]
    count: i64,

    /// Comma separated device allow-list
    #[serde(default)]
    disks: String,

    #[serde(default)]
    disks_regex: Option<String>,

    #[serde(default)]
    nice_names: bool,

    #[serde(default = "default_plugin_name")]
    plugin_name: String,

    #[serde(default)]
    verbose: bool,

    /// Per-invocation deadline in seconds
    #[serde(default)]
    timeout: Option<f64>,

    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_PATH)
}
fn default_interval_secs() -> f64 {
    DEFAULT_INTERVAL.as_secs_f64()
}
fn default_iostat_interval() -> i64 {
    2
}
fn default_count() -> i64 {
    2
}
fn default_plugin_name() -> String {
    DEFAULT_PLUGIN_NAME.to_string()
}

/// Everything the long-lived monitor needs between cycles.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub collector: CollectorConfig,
    /// Time between collection cycles, never zero.
    pub interval: Duration,
    /// Extra device filter applied after collection.
    pub disks_regex: Option<Regex>,
    pub plugin_name: String,
    pub verbose: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            interval: DEFAULT_INTERVAL,
            disks_regex: None,
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            verbose: false,
        }
    }
}

impl PluginConfig {
    /// Function to load configuration from a file.
    pub fn load(path: &Path) -> Result<(Self, Vec<String>), ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Function to parse configuration, returning it together with warnings
    /// for unrecognized keys.
    pub fn from_toml_str(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let file: FileConfig = toml::from_str(content)?;

        let warnings = file
            .unknown
            .keys()
            .map(|key| format!("Unknown config key: {key}"))
            .collect();

        let timeout = match file.timeout {
            Some(secs) => Some(positive_duration("Timeout", secs)?),
            None => None,
        };
        let disks_regex = match file.disks_regex.as_deref() {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        let config = Self {
            collector: CollectorConfig {
                path: file.path,
                interval: at_least_one("IostatInterval", file.iostat_interval)?,
                count: at_least_one("Count", file.count)?,
                disks: split_list(&file.disks),
                naming: if file.nice_names {
                    NamingMode::Nice
                } else {
                    NamingMode::Raw
                },
                timeout,
            },
            interval: positive_duration("Interval", file.interval)?,
            disks_regex,
            plugin_name: file.plugin_name,
            verbose: file.verbose,
        };

        Ok((config, warnings))
    }

    /// Scheduling period.
    pub fn period(&self) -> Duration {
        self.interval
    }

    /// One-line summary for verbose logging.
    pub fn describe(&self) -> String {
        format!(
            "iostat={}, interval={}, count={}, disks={:?}, disks_regex={:?}, nice_names={}",
            self.collector.path.display(),
            self.collector.interval,
            self.collector.count,
            self.collector.disks,
            self.disks_regex.as_ref().map(Regex::as_str),
            self.collector.naming == NamingMode::Nice,
        )
    }
}

/// Function to split a comma separated list, dropping empty entries.
pub fn split_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|disk| !disk.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn at_least_one(key: &str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid(key, "must be at least 1"))
}

/// Seconds to a duration that is representable and not zero.
fn positive_duration(key: &str, secs: f64) -> Result<Duration, ConfigError> {
    let duration = Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, e))?;
    if duration.is_zero() {
        return Err(invalid(key, "must be greater than zero"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (config, warnings) = PluginConfig::from_toml_str("").unwrap();

        assert!(warnings.is_empty());
        assert_eq!(config.collector, CollectorConfig::default());
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.plugin_name, DEFAULT_PLUGIN_NAME);
        assert!(config.disks_regex.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_all_keys() {
        let (config, warnings) = PluginConfig::from_toml_str(
            r#"
Path = "/opt/sysstat/iostat"
Interval = 30
IostatInterval = 5
Count = 3
Disks = "sda, sdb,,"
DisksRegex = "^sd"
NiceNames = true
PluginName = "disks"
Verbose = true
Timeout = 1.5
"#,
        )
        .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(config.collector.path, PathBuf::from("/opt/sysstat/iostat"));
        assert_eq!(config.period(), Duration::from_secs(30));
        assert_eq!(config.collector.interval, 5);
        assert_eq!(config.collector.count, 3);
        assert_eq!(
            config.collector.disks,
            BTreeSet::from(["sda".to_string(), "sdb".to_string()])
        );
        assert!(config.disks_regex.as_ref().unwrap().is_match("sdc"));
        assert_eq!(config.collector.naming, NamingMode::Nice);
        assert_eq!(config.plugin_name, "disks");
        assert!(config.verbose);
        assert_eq!(config.collector.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_unknown_key_is_warning() {
        let (config, warnings) =
            PluginConfig::from_toml_str("Count = 4\nColour = \"blue\"\n").unwrap();

        assert_eq!(config.collector.count, 4);
        assert_eq!(warnings, ["Unknown config key: Colour"]);
    }

    #[test]
    fn test_count_must_be_positive() {
        let err = PluginConfig::from_toml_str("Count = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "Count"));

        let err = PluginConfig::from_toml_str("IostatInterval = -3").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "IostatInterval"));
    }

    #[test]
    fn test_wrong_type() {
        let err = PluginConfig::from_toml_str("NiceNames = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_bad_regex() {
        let err = PluginConfig::from_toml_str("DisksRegex = \"(\"").unwrap_err();
        assert!(matches!(err, ConfigError::Regex(_)));
    }

    #[test]
    fn test_non_positive_interval() {
        assert!(PluginConfig::from_toml_str("Interval = 0").is_err());
        assert!(PluginConfig::from_toml_str("Timeout = -1").is_err());
    }

    #[test]
    fn test_timeout_out_of_range_is_error() {
        let err = PluginConfig::from_toml_str("Timeout = 1e30").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "Timeout"));
    }

    #[test]
    fn test_interval_rounding_to_zero_is_error() {
        let err = PluginConfig::from_toml_str("Interval = 1e-12").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "Interval"));
    }

    #[test]
    fn test_huge_iostat_interval_deadline_saturates() {
        let (config, _) =
            PluginConfig::from_toml_str("IostatInterval = 9223372036854775807\nCount = 2\n")
                .unwrap();

        assert_eq!(config.collector.deadline(), Duration::MAX);
    }

    #[test]
    fn test_split_list() {
        assert!(split_list("").is_empty());
        assert_eq!(split_list("sda"), BTreeSet::from(["sda".to_string()]));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iostat.toml");
        fs::write(&path, "PluginName = \"io\"\n").unwrap();

        let (config, _) = PluginConfig::load(&path).unwrap();
        assert_eq!(config.plugin_name, "io");
    }
}
