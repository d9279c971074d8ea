//! Error types for the fieldwatch-monitor crate.

use fieldwatch_alerts::AlertError;
use thiserror::Error;

/// Problems with an invocation request, detected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request names no operation.
    #[error("operation is required; must be one of: data_report, offline_check, error_summary")]
    MissingOperation,

    /// The request names an operation this job does not perform.
    #[error("invalid operation: {0}")]
    UnknownOperation(String),

    /// No recipient address was given.
    #[error("email recipient(s) are required")]
    MissingRecipients,

    /// The recipient field is neither a string nor a list of strings.
    #[error("email must be a string or list of strings")]
    MalformedRecipients,

    /// A single-site data report without a site name.
    #[error("siteName is required for single site query")]
    MissingSiteName,

    /// The named site is unknown or not active.
    #[error("invalid site name {name:?}; must be one of: {}", .active.join(", "))]
    InvalidSite {
        /// The requested site.
        name: String,
        /// Codes of the active sites.
        active: Vec<String>,
    },

    /// `queryType` is neither `single` nor `all`.
    #[error("invalid queryType {0:?}; must be \"single\" or \"all\"")]
    InvalidQueryType(String),

    /// A numeric or text parameter is out of range or mistyped.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// The parameter name as it appears in the request.
        name: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors that fail an invocation.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The request was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The report could not be delivered.
    #[error(transparent)]
    Notification(#[from] AlertError),
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
