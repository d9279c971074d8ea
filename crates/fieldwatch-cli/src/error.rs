//! CLI error types.

use std::fmt;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// The request could not be read or is not JSON.
    Request(String),
    /// Store snapshots could not be loaded.
    Store(String),
    /// The notification channel could not be set up.
    Channel(String),
    /// Output could not be written.
    Output(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Request(msg) => write!(f, "request error: {msg}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Channel(msg) => write!(f, "channel error: {msg}"),
            Self::Output(msg) => write!(f, "output error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
