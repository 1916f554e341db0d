//! iostat collection for tinycollectd.
//!
//! Runs `iostat` in basic and extended mode, parses both tables into per-device
//! fields, merges them and turns each field into a collectd-style metric.

pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod monitor;

pub use collector::{CollectorConfig, DeviceStats, FieldMap, NamingMode, NormalizedMetric};
pub use config::PluginConfig;
pub use error::{ConfigError, IostatError};
pub use monitor::{IoMon, run_once};
