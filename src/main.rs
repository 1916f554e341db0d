// src/main.rs
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tinyiostat::collector::{self, NamingMode, sum_fields};
use tinyiostat::config::{PluginConfig, split_list};
use tinyiostat::dispatch::{LineSink, MetricSink};
use tinyiostat::monitor::IoMon;
use tracing::{Level, error, info};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug)]
#[command(
    name = "tinyiostat",
    about = "Collect iostat block device metrics and ship them to tinycollectd",
    version
)]
struct Args {
    /// Plugin config file (TOML, collectd option names)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Run a single cycle, print `<device>.<metric>:<value>` lines and exit
    #[arg(long)]
    standalone: bool,

    /// Use catalog metric names instead of raw iostat field names
    #[arg(long)]
    nice_names: bool,

    /// Comma separated fields to total across devices (standalone only)
    #[arg(long)]
    sum: Option<String>,

    /// UDP target, falls back to METRICS_TARGET
    #[arg(long)]
    target: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

fn setup_logging(args: &Args, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = match args.log_level {
        LogLevel::Off => return Ok(()),
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };
    let level = if verbose { level.max(Level::DEBUG) } else { level };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(args: &Args) -> Result<(PluginConfig, Vec<String>), Box<dyn std::error::Error>> {
    let (mut config, warnings) = match &args.config {
        Some(path) => PluginConfig::load(path)?,
        None => (PluginConfig::default(), Vec::new()),
    };
    if args.nice_names {
        config.collector.naming = NamingMode::Nice;
    }
    Ok((config, warnings))
}

async fn standalone(mon: &IoMon, sum: Option<&str>) -> ExitCode {
    let stats = match mon.collect().await {
        Ok(stats) => stats,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut sink = LineSink::stdout();
    let plugin = &mon.config().plugin_name;
    for metric in collector::normalize(&stats, mon.config().collector.naming) {
        sink.emit(&format!("{}.{}", plugin, metric.device), &metric);
    }

    if let Some(fields) = sum {
        let fields: Vec<String> = split_list(fields).into_iter().collect();
        for (field, total) in sum_fields(&stats, &fields) {
            sink.write_line("total", &collector::sanitize_field(&field), total);
        }
    }

    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let (config, warnings) = load_config(&args)?;
    setup_logging(&args, config.verbose)?;

    let mut mon = IoMon::default();
    mon.configure(config, &warnings, &LineSink::stdout());

    if args.standalone {
        return Ok(standalone(&mon, args.sum.as_deref()).await);
    }

    // Get target from CLI, environment or use default
    let target = args
        .target
        .clone()
        .or_else(|| std::env::var("METRICS_TARGET").ok())
        .unwrap_or_else(|| "127.0.0.1:1555".to_string());
    info!("Collecting every {:?}", mon.config().period());

    mon.run(&target).await?;
    Ok(ExitCode::SUCCESS)
}
