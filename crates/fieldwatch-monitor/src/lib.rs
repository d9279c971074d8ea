//! Operation orchestration for fieldwatch.
//!
//! Parses an invocation request, runs the requested monitoring operation
//! against injected stores and a notification channel, and wraps the result
//! in a status envelope.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fieldwatch_alerts::RecordingChannel;
//! use fieldwatch_core::{MemoryEventLog, MemoryTelemetryStore, SiteClock, SiteRegistry, SystemClock};
//! use fieldwatch_monitor::Monitor;
//! use serde_json::json;
//!
//! let channel = Arc::new(RecordingChannel::new());
//! let monitor = Monitor::new(
//!     Arc::new(SiteRegistry::fleet()),
//!     Arc::new(MemoryTelemetryStore::new(SiteClock::ist())),
//!     Arc::new(MemoryEventLog::new(SiteClock::ist())),
//!     SiteClock::ist(),
//!     Arc::new(SystemClock),
//!     channel.clone(),
//! );
//!
//! let envelope = monitor.dispatch(&json!({"operation": "error_summary", "email": "ops@example.com"}));
//! assert_eq!(envelope.status_code, 200);
//! assert_eq!(channel.count(), 0);
//! ```

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;

pub use error::{MonitorError, Result, ValidationError};
pub use orchestrator::{Monitor, Outcome};
pub use request::{
    DEFAULT_COUNT, DEFAULT_ERROR_HOURS, DEFAULT_ERROR_LIMIT, DEFAULT_MAX_HOURS, DataReportParams,
    MAX_HOURS,
    OPERATION_NAMES, Operation, Request, SiteSelection,
};
pub use response::{Envelope, STATUS_ERROR, STATUS_OK};
