// src/collector/mod.rs
//! iostat collection: running the utility, parsing its tables and naming the results.

pub mod catalog;
pub mod iostat;
pub mod normalize;
pub mod parser;

use std::collections::BTreeMap;

/// Raw field name to value for one device.
pub type FieldMap = BTreeMap<String, f64>;

/// Device name to its fields, as reported by iostat.
pub type DeviceStats = BTreeMap<String, FieldMap>;

pub use catalog::{GAUGE, MetricDescriptor, lookup};
pub use iostat::{CollectorConfig, IostatMode, collect, command_args, merge, run_iostat, sum_fields};
pub use normalize::{NamingMode, NormalizedMetric, normalize, normalize_field, sanitize_field};
pub use parser::{HEADER_MARKER, parse_diskstats};
