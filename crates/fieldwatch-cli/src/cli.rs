//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Fieldwatch - sensor-site monitoring and alerting job.
///
/// Reads one invocation request (JSON), runs the requested operation and
/// prints the response envelope to stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "fieldwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file (site table, site clock, email settings).
    #[arg(short, long, env = "FIELDWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding store snapshots (air.json, drip.json, errors.json).
    #[arg(short, long, env = "FIELDWATCH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Request file; `-` or omitted reads stdin.
    #[arg(short, long)]
    pub request: Option<String>,

    /// Capture notifications and print them instead of sending.
    #[arg(long)]
    pub dry_run: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Returns the request path, or `None` when the request comes from stdin.
    #[must_use]
    pub fn request_path(&self) -> Option<&str> {
        self.request.as_deref().filter(|r| *r != "-")
    }
}

/// Log output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}
