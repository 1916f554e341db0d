// src/dispatch.rs
//! Sinks that receive normalized metrics and plugin log messages.

use crate::collector::NormalizedMetric;
use serde::Serialize;
use std::io::{self, Write};
use sysinfo::System;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Upper bound for one JSON datagram, below the 65507 byte UDP payload limit.
pub const MAX_DATAGRAM_BYTES: usize = 60_000;

/// Capability the monitor dispatches through.
///
/// `namespace` is `<plugin_name>.<device>`.
pub trait MetricSink {
    fn emit(&mut self, namespace: &str, metric: &NormalizedMetric);

    fn log_verbose(&self, message: &str) {
        info!("[verbose] {}", message);
    }

    fn log_warning(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Writes one `<device>.<name>:<value>` line per metric.
pub struct LineSink<W: Write> {
    out: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Function to write a line that is not tied to a single device.
    ///
    /// Values always carry a decimal point, e.g. `10752.0`.
    pub fn write_line(&mut self, prefix: &str, name: &str, value: f64) {
        if let Err(e) = writeln!(self.out, "{}.{}:{:?}", prefix, name, value) {
            warn!("Failed to write metric line: {}", e);
        }
    }
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> MetricSink for LineSink<W> {
    fn emit(&mut self, _namespace: &str, metric: &NormalizedMetric) {
        let name = metric.name();
        self.write_line(&metric.device, &name, metric.value);
    }
}

/// One metric as it appears on the wire.
#[derive(Debug, Clone, Serialize)]
struct WireMetric {
    namespace: String,
    #[serde(rename = "type")]
    metric_type: String,
    type_instance: String,
    value: f64,
}

/// Envelope shared by every datagram of a cycle.
#[derive(Serialize)]
struct Datagram<'a> {
    timestamp: u64,
    hostname: &'a str,
    metrics: &'a [WireMetric],
}

/// Buffers one cycle of metrics and ships them as JSON datagrams,
/// split so that none exceeds the byte budget.
pub struct UdpSink {
    metrics: Vec<WireMetric>,
    max_bytes: usize,
}

impl Default for UdpSink {
    fn default() -> Self {
        Self::with_max_bytes(MAX_DATAGRAM_BYTES)
    }
}

impl UdpSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            metrics: Vec::new(),
            max_bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Function to encode the buffered metrics as datagram bodies.
    ///
    /// Every body carries its own timestamp and hostname. A metric larger
    /// than the budget on its own still gets a datagram of its own.
    pub fn datagrams(&self) -> serde_json::Result<Vec<Vec<u8>>> {
        let timestamp = get_timestamp();
        let hostname = get_hostname();
        let encode = |metrics: &[WireMetric]| {
            serde_json::to_vec(&Datagram {
                timestamp,
                hostname: &hostname,
                metrics,
            })
        };

        let envelope = encode(&self.metrics[..0])?.len();
        let mut bodies = Vec::new();
        let mut start = 0;
        let mut size = envelope;

        for (i, metric) in self.metrics.iter().enumerate() {
            let len = serde_json::to_vec(metric)?.len();
            // separating comma
            let extra = if i > start { len + 1 } else { len };
            if i > start && size + extra > self.max_bytes {
                bodies.push(encode(&self.metrics[start..i])?);
                start = i;
                size = envelope + len;
            } else {
                size += extra;
            }
        }
        if start < self.metrics.len() {
            bodies.push(encode(&self.metrics[start..])?);
        }

        Ok(bodies)
    }

    /// Function to send buffered metrics to `target` and clear the buffer.
    /// Returns the total number of bytes sent.
    pub async fn flush(&mut self, socket: &UdpSocket, target: &str) -> io::Result<usize> {
        let bodies = self.datagrams()?;
        self.metrics.clear();

        let mut sent = 0;
        for body in &bodies {
            sent += socket.send_to(body, target).await?;
        }
        debug!("Flushed {} datagrams to {}", bodies.len(), target);
        Ok(sent)
    }
}

impl MetricSink for UdpSink {
    fn emit(&mut self, namespace: &str, metric: &NormalizedMetric) {
        self.metrics.push(WireMetric {
            namespace: namespace.to_string(),
            metric_type: metric.metric_type.clone(),
            type_instance: metric.sub_type.clone(),
            value: metric.value,
        });
    }
}

/// Function to generate a timestamp in epoch time.
pub fn get_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Function to extract hostname of the system.
pub fn get_hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}
