// src/collector/normalize.rs
//! Conversion of raw iostat fields into collectd-style metrics.

use super::DeviceStats;
use super::catalog::{self, GAUGE};

/// How raw iostat field names are turned into metric identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingMode {
    /// Every field becomes a `gauge` named after the sanitized field.
    #[default]
    Raw,
    /// Catalogued fields get semantic types and unit multipliers.
    Nice,
}

/// One value ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetric {
    pub device: String,
    pub metric_type: String,
    pub sub_type: String,
    pub value: f64,
}

impl NormalizedMetric {
    /// Single identifier for line-oriented output, e.g. `bytes_per_second_read`.
    pub fn name(&self) -> String {
        if self.metric_type == GAUGE {
            self.sub_type.clone()
        } else if self.sub_type.is_empty() {
            self.metric_type.clone()
        } else {
            format!("{}_{}", self.metric_type, self.sub_type)
        }
    }
}

/// Function to replace `/`, `-` and `%` with `_` so a field is a safe identifier.
pub fn sanitize_field(field: &str) -> String {
    field.replace(['/', '-', '%'], "_")
}

/// Function to normalize one raw field value.
pub fn normalize_field(device: &str, field: &str, value: f64, mode: NamingMode) -> NormalizedMetric {
    let descriptor = match mode {
        NamingMode::Nice => catalog::lookup(field),
        NamingMode::Raw => None,
    };

    match descriptor {
        Some(d) => NormalizedMetric {
            device: device.to_string(),
            metric_type: d.metric_type.to_string(),
            sub_type: d.sub_type.unwrap_or_default().to_string(),
            value: value * d.factor(),
        },
        None => NormalizedMetric {
            device: device.to_string(),
            metric_type: GAUGE.to_string(),
            sub_type: sanitize_field(field),
            value,
        },
    }
}

/// Function to expand a device snapshot into metrics.
///
/// The iterator borrows `stats`; call again to restart. Order is device name,
/// then field name.
pub fn normalize(
    stats: &DeviceStats,
    mode: NamingMode,
) -> impl Iterator<Item = NormalizedMetric> + '_ {
    stats.iter().flat_map(move |(device, fields)| {
        fields
            .iter()
            .map(move |(field, value)| normalize_field(device, field, *value, mode))
    })
}
