// src/collector/iostat.rs
//! Running iostat and merging its basic and extended tables.

use super::normalize::NamingMode;
use super::parser::parse_diskstats;
use super::{DeviceStats, FieldMap};
use crate::error::IostatError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Slack added on top of iostat's own runtime before an invocation is killed.
pub const DEADLINE_GRACE: Duration = Duration::from_secs(10);

/// Parameters of one collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub path: PathBuf,
    /// Seconds between iostat samples. Passed to iostat, not the scheduling period.
    pub interval: u64,
    /// Number of samples iostat takes.
    pub count: u64,
    /// Devices to report; empty means all.
    pub disks: BTreeSet<String>,
    pub naming: NamingMode,
    /// Overall deadline per invocation. `None` derives one from interval and count.
    pub timeout: Option<Duration>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/bin/iostat"),
            interval: 2,
            count: 2,
            disks: BTreeSet::new(),
            naming: NamingMode::Raw,
            timeout: None,
        }
    }
}

impl CollectorConfig {
    /// Deadline applied to each iostat invocation.
    pub fn deadline(&self) -> Duration {
        self.timeout.unwrap_or_else(|| {
            Duration::from_secs(self.interval.saturating_mul(self.count))
                .saturating_add(DEADLINE_GRACE)
        })
    }
}

/// Which iostat report to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IostatMode {
    Basic,
    Extended,
}

impl IostatMode {
    pub fn flags(self) -> &'static str {
        match self {
            IostatMode::Basic => "-kNd",
            IostatMode::Extended => "-kNdx",
        }
    }
}

/// Function to build the argument list for one invocation.
pub fn command_args(config: &CollectorConfig, mode: IostatMode) -> Vec<String> {
    let mut args = vec![
        mode.flags().to_string(),
        config.interval.to_string(),
        config.count.to_string(),
    ];
    args.extend(config.disks.iter().cloned());
    args
}

fn display_command(config: &CollectorConfig, args: &[String]) -> String {
    let mut command = config.path.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

/// Function to run iostat once and capture its standard output.
pub async fn run_iostat(config: &CollectorConfig, mode: IostatMode) -> Result<String, IostatError> {
    let args = command_args(config, mode);
    let command = display_command(config, &args);
    debug!("running {}", command);

    let child = Command::new(&config.path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| IostatError::Launch {
            command: command.clone(),
            source,
        })?;

    let deadline = config.deadline();
    // Dropping the child on timeout kills it.
    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| IostatError::Launch {
            command: command.clone(),
            source,
        })?,
        Err(_) => {
            return Err(IostatError::Timeout {
                command,
                after: deadline,
            });
        }
    };

    if !output.status.success() {
        return Err(IostatError::Cmd {
            command,
            code: output.status.code(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Function to merge extended statistics into basic statistics.
///
/// The basic snapshot decides which devices are reported; extended-only
/// devices are dropped. On a field name clash the extended value wins.
pub fn merge(mut basic: DeviceStats, mut extended: DeviceStats) -> DeviceStats {
    for (device, fields) in basic.iter_mut() {
        if let Some(extra) = extended.remove(device) {
            fields.extend(extra);
        }
    }
    basic
}

/// Function to get all available disk statistics in a single snapshot.
///
/// Basic and extended reports are requested concurrently. If either
/// invocation fails the other one is dropped and killed.
pub async fn collect(config: &CollectorConfig) -> Result<DeviceStats, IostatError> {
    let (basic_out, extended_out) = tokio::try_join!(
        run_iostat(config, IostatMode::Basic),
        run_iostat(config, IostatMode::Extended),
    )?;

    let basic = parse_diskstats(&basic_out, &config.disks)?;
    let extended = parse_diskstats(&extended_out, &config.disks)?;
    debug!(
        "parsed {} basic and {} extended device rows",
        basic.len(),
        extended.len()
    );

    Ok(merge(basic, extended))
}

/// Function to sum chosen fields across all devices.
///
/// Fields missing from every device are left out of the result.
pub fn sum_fields(stats: &DeviceStats, fields: &[String]) -> FieldMap {
    let mut totals = FieldMap::new();
    for device_fields in stats.values() {
        for (name, value) in device_fields {
            if fields.contains(name) {
                *totals.entry(name.clone()).or_insert(0.0) += value;
            }
        }
    }
    totals
}
