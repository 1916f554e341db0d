// src/collector/parser.rs
//! Parsing of `iostat -d` / `iostat -dx` tables.

use super::{DeviceStats, FieldMap};
use crate::error::IostatError;
use std::collections::BTreeSet;

/// Token that starts every iostat device table header.
pub const HEADER_MARKER: &str = "Device:";

/// Function to parse iostat device statistics.
///
/// When iostat runs with a count above one it prints one table per sample;
/// only the last table is used. Devices are kept when `disks` is empty or
/// contains the device name.
///
/// Basic statistics:
/// `tps Blk_read/s Blk_wrtn/s Blk_read Blk_wrtn`
///
/// Extended statistics:
/// `rrqm/s wrqm/s r/s w/s rsec/s wsec/s rkB/s wkB/s avgrq-sz avgqu-sz await svctm %util`
pub fn parse_diskstats(input: &str, disks: &BTreeSet<String>) -> Result<DeviceStats, IostatError> {
    let start = input
        .rfind(HEADER_MARKER)
        .ok_or_else(|| IostatError::Parse(format!("unknown input format: {input:?}")))?;

    let mut lines = input[start..].lines();
    let header: Vec<&str> = lines
        .next()
        .map(|line| line.split_whitespace().skip(1).collect())
        .unwrap_or_default();

    let mut stats = DeviceStats::new();
    for line in lines {
        let mut tokens = line.split_whitespace();
        let Some(device) = tokens.next() else {
            continue;
        };
        if !disks.is_empty() && !disks.contains(device) {
            continue;
        }

        let mut fields = FieldMap::new();
        for (name, token) in header.iter().zip(tokens) {
            fields.insert((*name).to_string(), parse_value(device, name, token)?);
        }
        stats.insert(device.to_string(), fields);
    }

    Ok(stats)
}

fn parse_value(device: &str, field: &str, token: &str) -> Result<f64, IostatError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IostatError::Parse(format!(
            "non-numeric value {token:?} for {device}.{field}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "\
Linux 5.15.0-91-generic (host) \t01/10/2024 \t_x86_64_\t(8 CPU)

Device:            tps    kB_read/s    kB_wrtn/s    kB_read    kB_wrtn
sda               5.00        10.00        20.50      12345      67890
sdb               1.25         0.00         4.00        100        200

";

    fn no_filter() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_parse_basic_table() {
        let stats = parse_diskstats(BASIC, &no_filter()).unwrap();

        assert_eq!(stats.len(), 2);
        let sda = &stats["sda"];
        let keys: BTreeSet<&str> = sda.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            BTreeSet::from(["tps", "kB_read/s", "kB_wrtn/s", "kB_read", "kB_wrtn"])
        );
        assert_eq!(sda["tps"], 5.0);
        assert_eq!(sda["kB_wrtn/s"], 20.5);
        assert_eq!(stats["sdb"]["kB_wrtn"], 200.0);
    }

    #[test]
    fn test_uses_last_segment() {
        let earlier = "\
Device:            tps    kB_read/s
sda             999.00       999.00
sdc               1.00         1.00
";
        let combined = format!("{earlier}\n{BASIC}");

        assert_eq!(
            parse_diskstats(&combined, &no_filter()).unwrap(),
            parse_diskstats(BASIC, &no_filter()).unwrap()
        );
    }

    #[test]
    fn test_device_filter() {
        let filter = BTreeSet::from(["sdb".to_string()]);
        let stats = parse_diskstats(BASIC, &filter).unwrap();

        assert_eq!(stats.len(), 1);
        assert!(stats.contains_key("sdb"));
    }

    #[test]
    fn test_missing_marker() {
        let err = parse_diskstats("Linux 5.15.0\n\nsda 1.0 2.0\n", &no_filter()).unwrap_err();
        assert!(matches!(err, IostatError::Parse(_)));
    }

    #[test]
    fn test_non_numeric_value() {
        let err = parse_diskstats("Device: tps\nsda abc\n", &no_filter()).unwrap_err();
        assert!(matches!(err, IostatError::Parse(_)));
    }

    #[test]
    fn test_non_finite_value() {
        let err = parse_diskstats("Device: tps\nsda NaN\n", &no_filter()).unwrap_err();
        assert!(matches!(err, IostatError::Parse(_)));
    }

    #[test]
    fn test_non_numeric_value_in_filtered_out_row_is_ignored() {
        let filter = BTreeSet::from(["sda".to_string()]);
        let stats = parse_diskstats("Device: tps\nsda 1.0\nsdb abc\n", &filter).unwrap();
        assert_eq!(stats["sda"]["tps"], 1.0);
    }

    #[test]
    fn test_header_only() {
        let stats = parse_diskstats("Device:  tps  kB_read/s\n\n", &no_filter()).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn test_blank_and_whitespace_lines_skipped() {
        let stats = parse_diskstats("Device: tps\n   \nsda 2.0\n\t\n", &no_filter()).unwrap();
        assert_eq!(stats.len(), 1);
    }
}
