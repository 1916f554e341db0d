// src/error.rs
//! Error types for iostat collection and configuration.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single collection cycle.
///
/// Errors are local to the cycle that produced them; the next scheduled cycle
/// starts from scratch.
#[derive(Error, Debug)]
pub enum IostatError {
    #[error("command `{command}` returned {}", .code.map_or_else(|| "no exit code (killed by signal)".to_string(), |c| c.to_string()))]
    Cmd { command: String, code: Option<i32> },

    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command `{command}` did not finish within {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("failed to parse iostat output: {0}")]
    Parse(String),
}

impl IostatError {
    /// Exit code carried by a command failure, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            IostatError::Cmd { code, .. } => *code,
            _ => None,
        }
    }
}

/// Errors raised while loading plugin configuration.
///
/// Unknown keys are not errors; they are reported as warnings by
/// [`crate::config::PluginConfig::from_toml_str`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid DisksRegex: {0}")]
    Regex(#[from] regex::Error),
}
