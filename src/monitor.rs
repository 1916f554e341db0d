// src/monitor.rs
//! Long-lived monitor driving collection cycles.

use crate::collector::{self, CollectorConfig, DeviceStats, NormalizedMetric};
use crate::config::PluginConfig;
use crate::dispatch::{MetricSink, UdpSink};
use crate::error::IostatError;
use regex::Regex;
use tokio::net::UdpSocket;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

/// Holds the active configuration; every cycle builds its own snapshot.
#[derive(Debug, Clone, Default)]
pub struct IoMon {
    config: PluginConfig,
}

impl IoMon {
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Function to replace the configuration wholesale, reporting warnings
    /// from the config loader through the sink.
    pub fn configure<S: MetricSink>(&mut self, config: PluginConfig, warnings: &[String], sink: &S) {
        for warning in warnings {
            sink.log_warning(&format!("{} plugin: {}", config.plugin_name, warning));
        }
        self.config = config;
        self.log_verbose(sink, &format!("Configured with {}", self.config.describe()));
    }

    fn log_verbose<S: MetricSink>(&self, sink: &S, message: &str) {
        if self.config.verbose {
            sink.log_verbose(&format!("{} plugin: {}", self.config.plugin_name, message));
        }
    }

    /// Function to collect a snapshot with the active configuration,
    /// applying the DisksRegex filter.
    pub async fn collect(&self) -> Result<DeviceStats, IostatError> {
        let stats = collector::collect(&self.config.collector).await?;
        Ok(filter_devices(stats, self.config.disks_regex.as_ref()))
    }

    /// Function to run one collect-and-normalize pass with the full plugin
    /// configuration, DisksRegex included.
    pub async fn run_once(&self) -> Result<Vec<NormalizedMetric>, IostatError> {
        let stats = self.collect().await?;
        Ok(collector::normalize(&stats, self.config.collector.naming).collect())
    }

    /// Function to run one cycle and emit every metric under
    /// `<plugin_name>.<device>`. Returns the number of metrics emitted.
    pub async fn read_callback<S: MetricSink>(&self, sink: &mut S) -> Result<usize, IostatError> {
        self.log_verbose(sink, "Read callback called");

        let stats = match self.collect().await {
            Ok(stats) => stats,
            Err(e) => {
                sink.log_warning(&format!("{} plugin: {}", self.config.plugin_name, e));
                return Err(e);
            }
        };

        if stats.is_empty() {
            self.log_verbose(sink, "No info received.");
            return Ok(0);
        }

        let mut emitted = 0;
        for metric in collector::normalize(&stats, self.config.collector.naming) {
            let namespace = format!("{}.{}", self.config.plugin_name, metric.device);
            self.log_verbose(
                sink,
                &format!(
                    "Sending value: {}.{}.{}={}",
                    namespace, metric.metric_type, metric.sub_type, metric.value
                ),
            );
            sink.emit(&namespace, &metric);
            emitted += 1;
        }

        Ok(emitted)
    }

    /// Function to run collection cycles forever, shipping each cycle to
    /// `target` over UDP. Cycles never overlap; late ticks are skipped.
    pub async fn run(&self, target: &str) -> std::io::Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let mut ticker = time::interval(self.config.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Sending iostat metrics to UDP {}", target);

        loop {
            ticker.tick().await;

            let mut sink = UdpSink::new();
            match self.read_callback(&mut sink).await {
                Ok(0) => continue,
                Ok(count) => debug!("Collected {} metrics", count),
                Err(e) => {
                    error!("Collection cycle failed: {}", e);
                    continue;
                }
            }

            match sink.flush(&socket, target).await {
                Ok(bytes) => debug!("Sent metrics to {} ({} bytes)", target, bytes),
                Err(e) => error!("Failed to send UDP packet: {}", e),
            }
        }
    }
}

/// Function to run one collect-and-normalize pass over a bare collector
/// configuration. No device regex applies here; use [`IoMon::run_once`] for that.
pub async fn run_once(config: &CollectorConfig) -> Result<Vec<NormalizedMetric>, IostatError> {
    let stats = collector::collect(config).await?;
    Ok(collector::normalize(&stats, config.naming).collect())
}

/// Function to keep only devices matching `pattern`.
pub fn filter_devices(mut stats: DeviceStats, pattern: Option<&Regex>) -> DeviceStats {
    if let Some(re) = pattern {
        stats.retain(|device, _| re.is_match(device));
    }
    stats
}
