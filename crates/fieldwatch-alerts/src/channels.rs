//! Notification channels for report delivery.
//!
//! This module provides the [`NotificationChannel`] trait, the
//! [`Notification`] it carries, and the non-network channels: a
//! [`LogChannel`] that writes notifications to the log and a
//! [`RecordingChannel`] that captures them in memory.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// A rendered report addressed to a list of recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Message subject.
    pub subject: String,
    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
}

impl Notification {
    /// Creates a notification with no recipients.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        text_body: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            text_body: text_body.into(),
            html_body: html_body.into(),
            recipients: Vec::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    /// Replaces the recipient list.
    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }
}

/// What happened to one site report handed to a channel.
///
/// `success = false` means the report did not reach the field team; the
/// orchestrator treats it like a delivery error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    /// True once the report was accepted for delivery.
    pub success: bool,
    /// Name of the channel that handled the report.
    pub channel: String,
    /// Delivery note, or the reason the report was refused.
    pub message: Option<String>,
    /// SMTP reply code, for the email channel.
    pub status_code: Option<u16>,
}

impl NotificationResult {
    /// Report accepted by `channel`.
    #[must_use]
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
            status_code: None,
        }
    }

    /// Report refused by `channel` for the given reason.
    #[must_use]
    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: Some(message.into()),
            status_code: None,
        }
    }

    /// Attaches the relay's reply code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Attaches a delivery note.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

/// Where site reports go: the field team's mailbox, the job log, or a
/// capture buffer.
///
/// Each report is handed over once. A failed handover is returned, never
/// retried or queued.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Channel name, as it appears in logs and results.
    fn name(&self) -> &str;

    /// Delivers one report to its recipients.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the report cannot be
    /// handed over, or `AlertError::InvalidAddress` for an unusable recipient.
    fn send(&self, notification: &Notification) -> Result<NotificationResult>;

    /// False for a channel switched off in configuration.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Writes report subjects and recipients to the job log instead of mailing
/// them. Used when no SMTP relay is configured.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    enabled: bool,
}

impl LogChannel {
    /// A log channel reporting under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Switches the channel on or off.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        if !self.is_enabled() {
            return Ok(NotificationResult::success(self.name()).with_message("channel disabled"));
        }

        info!(
            channel = %self.name(),
            subject = %notification.subject,
            recipients = ?notification.recipients,
            "site report"
        );
        debug!(channel = %self.name(), body = %notification.text_body, "site report body");

        Ok(NotificationResult::success(self.name()).with_message("logged"))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A channel that keeps every notification in memory.
///
/// Used for dry runs and tests. It can be switched into a failing mode to
/// exercise delivery-failure paths.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    /// Creates an empty recording channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel that rejects every notification.
    #[must_use]
    pub fn failing() -> Self {
        let channel = Self::default();
        channel.set_failing(true);
        channel
    }

    /// Switches failure mode on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Notifications accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Number of notifications accepted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Removes and returns the captured notifications.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        if self.failing.load(Ordering::SeqCst) {
            debug!(subject = %notification.subject, "recording channel rejecting notification");
            return Ok(NotificationResult::failure(self.name(), "rejected"));
        }
        self.sent.lock().push(notification.clone());
        Ok(NotificationResult::success(self.name()).with_message("captured"))
    }
}
