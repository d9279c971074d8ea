//! # fieldwatch-cli
//!
//! Dispatch shell for the fieldwatch monitoring job.
//!
//! Loads configuration and store snapshots, reads one invocation request,
//! runs it through [`fieldwatch_monitor::Monitor`] and returns the response
//! envelope.
//!
//! ```text
//! request.json ──► fieldwatch ──► envelope (stdout)
//!                     │
//!                     ├── config.json   (sites, clock, email)
//!                     ├── data-dir/     (air.json, drip.json, errors.json)
//!                     └── channel       (email, log, or dry-run capture)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{Execution, execute, read_request};
pub use cli::{Cli, LogFormat};
pub use config::{ClockConfig, Config};
pub use error::CliError;
