//! SMTP email delivery.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::channels::{Notification, NotificationChannel, NotificationResult};
use crate::error::{AlertError, Result};

/// Environment variable holding the SMTP password unless configured otherwise.
pub const DEFAULT_PASSWORD_ENV: &str = "FIELDWATCH_SMTP_PASSWORD";

const fn default_smtp_port() -> u16 {
    587
}

const fn default_starttls() -> bool {
    true
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address, e.g. `Fieldwatch <alerts@example.com>`.
    pub sender: String,
    /// Relay host name.
    pub smtp_host: String,
    /// Relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Login user, if the relay requires authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Name of the environment variable holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Upgrade the connection with STARTTLS rather than implicit TLS.
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

impl EmailConfig {
    /// Creates settings for a relay with the default port and STARTTLS.
    #[must_use]
    pub fn new(sender: impl Into<String>, smtp_host: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            smtp_host: smtp_host.into(),
            smtp_port: default_smtp_port(),
            username: None,
            password_env: default_password_env(),
            starttls: default_starttls(),
        }
    }

    /// Sets the relay port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    /// Sets the login user.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` for an empty host, or
    /// `AlertError::InvalidAddress` if the sender does not parse.
    pub fn validate(&self) -> Result<()> {
        if self.smtp_host.trim().is_empty() {
            return Err(AlertError::InvalidConfig {
                reason: "smtp host cannot be empty".to_string(),
            });
        }
        parse_mailbox(&self.sender)?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| AlertError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Builds a multipart (text + HTML) message for a notification.
///
/// # Errors
///
/// Returns `AlertError::InvalidAddress` for an unparseable sender or
/// recipient, or `AlertError::NotificationFailed` if the message cannot be
/// assembled (for example, when there are no recipients).
pub fn build_message(sender: &str, notification: &Notification) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(sender)?)
        .subject(notification.subject.as_str());

    for recipient in &notification.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            notification.text_body.clone(),
            notification.html_body.clone(),
        ))
        .map_err(|e| AlertError::failed("email", e.to_string()))
}

/// Sends notifications through an SMTP relay.
#[derive(Debug, Clone)]
pub struct EmailChannel {
    name: String,
    config: EmailConfig,
    password: Option<String>,
    enabled: bool,
}

impl EmailChannel {
    /// Creates a channel from validated settings and an optional password.
    ///
    /// # Errors
    ///
    /// Returns any error from [`EmailConfig::validate`].
    pub fn new(config: EmailConfig, password: Option<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: "email".to_string(),
            config,
            password,
            enabled: true,
        })
    }

    /// Creates a channel, reading the password from the configured
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns any error from [`EmailConfig::validate`].
    pub fn from_env(config: EmailConfig) -> Result<Self> {
        let password = std::env::var(&config.password_env).ok();
        if password.is_none() {
            debug!(var = %config.password_env, "no smtp password in environment");
        }
        Self::new(config, password)
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the sender address.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.config.sender
    }

    /// Returns the relay settings.
    #[must_use]
    pub const fn config(&self) -> &EmailConfig {
        &self.config
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let host = self.config.smtp_host.as_str();
        let builder = if self.config.starttls {
            SmtpTransport::starttls_relay(host)
        } else {
            SmtpTransport::relay(host)
        }
        .map_err(|e| AlertError::InvalidConfig {
            reason: format!("failed to create SMTP transport: {e}"),
        })?
        .port(self.config.smtp_port);

        let builder = match (&self.config.username, &self.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(builder.build())
    }
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        if !self.is_enabled() {
            debug!(channel = %self.name(), "channel is disabled, skipping");
            return Ok(NotificationResult::success(self.name())
                .with_message("channel disabled, notification skipped"));
        }

        let message = build_message(&self.config.sender, notification)?;
        let transport = self.transport()?;

        match transport.send(&message) {
            Ok(response) if response.is_positive() => {
                info!(
                    channel = %self.name(),
                    subject = %notification.subject,
                    recipients = notification.recipients.len(),
                    "email sent"
                );
                Ok(NotificationResult::success(self.name()).with_message("accepted by relay"))
            }
            Ok(_) => {
                error!(channel = %self.name(), subject = %notification.subject, "relay rejected email");
                Ok(NotificationResult::failure(self.name(), "relay rejected message"))
            }
            Err(e) => {
                error!(channel = %self.name(), error = %e, "email delivery failed");
                Err(AlertError::failed(self.name(), e.to_string()))
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
