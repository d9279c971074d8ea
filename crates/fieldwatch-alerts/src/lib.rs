//! Notification delivery for fieldwatch reports.
//!
//! `fieldwatch-alerts` defines the [`NotificationChannel`] seam and the
//! channels behind it:
//!
//! - [`EmailChannel`]: multipart text + HTML mail through an SMTP relay
//! - [`LogChannel`]: writes notifications to the log
//! - [`RecordingChannel`]: captures notifications in memory for dry runs
//!
//! # Example
//!
//! ```rust
//! use fieldwatch_alerts::{Notification, NotificationChannel, RecordingChannel};
//!
//! let channel = RecordingChannel::new();
//! let notification = Notification::new("Site Data Report", "text", "<p>html</p>")
//!     .to("ops@example.com");
//!
//! let result = channel.send(&notification).unwrap();
//! assert!(result.success);
//! assert_eq!(channel.count(), 1);
//! ```

pub mod channels;
pub mod email;
pub mod error;

pub use channels::{
    LogChannel, Notification, NotificationChannel, NotificationResult, RecordingChannel,
};
pub use email::{DEFAULT_PASSWORD_ENV, EmailChannel, EmailConfig, build_message};
pub use error::{AlertError, Result};
