//! Error types for the fieldwatch-alerts crate.

use thiserror::Error;

/// Errors raised while delivering notifications.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Notification delivery failed.
    #[error("notification via {channel} failed: {reason}")]
    NotificationFailed {
        /// The channel that failed.
        channel: String,
        /// The reason the notification failed.
        reason: String,
    },

    /// A sender or recipient address could not be parsed.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Channel configuration is unusable.
    #[error("invalid channel configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },
}

impl AlertError {
    /// Shorthand for a delivery failure on a named channel.
    #[must_use]
    pub fn failed(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotificationFailed {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for alerting operations.
pub type Result<T> = std::result::Result<T, AlertError>;
