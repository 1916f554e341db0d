// src/collector/catalog.rs
//! Static mapping from raw iostat field names to collectd-style metric names.

/// Type used for fields that have no catalog entry, and for every field in raw mode.
pub const GAUGE: &str = "gauge";

const KB: f64 = 1024.0;
const MB: f64 = 1_048_576.0;

/// Semantic description of one iostat column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    /// Coarse metric type, e.g. `bytes_per_second`.
    pub metric_type: &'static str,
    /// Sub-type such as `read`, `write` or `util`.
    pub sub_type: Option<&'static str>,
    /// Unit multiplier applied to the raw value. `None` means identity.
    pub multiplier: Option<f64>,
}

impl MetricDescriptor {
    const fn new(
        metric_type: &'static str,
        sub_type: Option<&'static str>,
        multiplier: Option<f64>,
    ) -> Self {
        Self {
            metric_type,
            sub_type,
            multiplier,
        }
    }

    /// Multiplier with the identity default applied.
    pub fn factor(&self) -> f64 {
        self.multiplier.unwrap_or(1.0)
    }
}

const READ: Option<&str> = Some("read");
const WRITE: Option<&str> = Some("write");

static CATALOG: &[(&str, MetricDescriptor)] = &[
    ("tps", MetricDescriptor::new("transfers_per_second", None, None)),
    // basic statistics, block / kB / MB variants
    ("Blk_read/s", MetricDescriptor::new("blocks_per_second", READ, None)),
    ("Blk_wrtn/s", MetricDescriptor::new("blocks_per_second", WRITE, None)),
    ("kB_read/s", MetricDescriptor::new("bytes_per_second", READ, Some(KB))),
    ("kB_wrtn/s", MetricDescriptor::new("bytes_per_second", WRITE, Some(KB))),
    ("MB_read/s", MetricDescriptor::new("bytes_per_second", READ, Some(MB))),
    ("MB_wrtn/s", MetricDescriptor::new("bytes_per_second", WRITE, Some(MB))),
    ("Blk_read", MetricDescriptor::new("blocks", READ, None)),
    ("Blk_wrtn", MetricDescriptor::new("blocks", WRITE, None)),
    ("kB_read", MetricDescriptor::new("bytes", READ, Some(KB))),
    ("kB_wrtn", MetricDescriptor::new("bytes", WRITE, Some(KB))),
    ("MB_read", MetricDescriptor::new("bytes", READ, Some(MB))),
    ("MB_wrtn", MetricDescriptor::new("bytes", WRITE, Some(MB))),
    // extended statistics
    ("rrqm/s", MetricDescriptor::new("requests_merged_per_second", READ, None)),
    ("wrqm/s", MetricDescriptor::new("requests_merged_per_second", WRITE, None)),
    ("r/s", MetricDescriptor::new("per_second", READ, None)),
    ("w/s", MetricDescriptor::new("per_second", WRITE, None)),
    ("rsec/s", MetricDescriptor::new("sectors_per_second", READ, None)),
    ("wsec/s", MetricDescriptor::new("sectors_per_second", WRITE, None)),
    ("rkB/s", MetricDescriptor::new("bytes_per_second", READ, Some(KB))),
    ("wkB/s", MetricDescriptor::new("bytes_per_second", WRITE, Some(KB))),
    ("rMB/s", MetricDescriptor::new("bytes_per_second", READ, Some(MB))),
    ("wMB/s", MetricDescriptor::new("bytes_per_second", WRITE, Some(MB))),
    ("avgrq-sz", MetricDescriptor::new("avg_request_size", None, None)),
    ("avgqu-sz", MetricDescriptor::new("avg_request_queue", None, None)),
    ("await", MetricDescriptor::new("avg_wait_time", None, None)),
    ("r_await", MetricDescriptor::new("avg_wait_time", READ, None)),
    ("w_await", MetricDescriptor::new("avg_wait_time", WRITE, None)),
    ("svctm", MetricDescriptor::new("avg_service_time", None, None)),
    ("%util", MetricDescriptor::new("percent", Some("util"), None)),
];

/// Function to look up the descriptor for a raw iostat field name.
pub fn lookup(field: &str) -> Option<&'static MetricDescriptor> {
    CATALOG
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, descriptor)| descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilobyte_and_megabyte_variants() {
        let kb = lookup("rkB/s").unwrap();
        assert_eq!(kb.metric_type, "bytes_per_second");
        assert_eq!(kb.sub_type, Some("read"));
        assert_eq!(kb.factor(), 1024.0);

        let mb = lookup("MB_wrtn").unwrap();
        assert_eq!(mb.metric_type, "bytes");
        assert_eq!(mb.sub_type, Some("write"));
        assert_eq!(mb.factor(), 1_048_576.0);
    }

    #[test]
    fn test_identity_multiplier_and_empty_sub_type() {
        let tps = lookup("tps").unwrap();
        assert_eq!(tps.multiplier, None);
        assert_eq!(tps.factor(), 1.0);
        assert_eq!(tps.sub_type, None);
    }

    #[test]
    fn test_wait_time_variants() {
        for (field, sub) in [("await", None), ("r_await", Some("read")), ("w_await", Some("write"))] {
            let d = lookup(field).unwrap();
            assert_eq!(d.metric_type, "avg_wait_time");
            assert_eq!(d.sub_type, sub);
        }
    }

    #[test]
    fn test_unknown_field() {
        assert!(lookup("aqu-sz").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_no_duplicate_entries() {
        for (i, (name, _)) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[i + 1..].iter().all(|(other, _)| other != name),
                "duplicate catalog entry {name}"
            );
        }
    }
}
