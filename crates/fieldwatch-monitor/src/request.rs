//! Invocation request parsing and validation.
//!
//! A request arrives as loosely-typed JSON. [`Request::parse`] turns it into a
//! typed [`Operation`] plus recipient list, rejecting anything malformed
//! before a store is touched.

use std::fmt;

use fieldwatch_core::SiteRegistry;
use serde_json::Value;

use crate::error::ValidationError;

/// Records per site in a data report unless the request says otherwise.
pub const DEFAULT_COUNT: usize = 5;
/// Staleness threshold for offline checks, in hours.
pub const DEFAULT_MAX_HOURS: f64 = 2.0;
/// Look-back window for error summaries, in hours.
pub const DEFAULT_ERROR_HOURS: f64 = 24.0;
/// Upper bound for any hours field: ten years.
pub const MAX_HOURS: f64 = 24.0 * 366.0 * 10.0;
/// Errors listed per site in an error summary.
pub const DEFAULT_ERROR_LIMIT: usize = 5;

/// Which sites a data report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSelection {
    /// Every active site.
    All,
    /// One active site, by code.
    Single(String),
}

/// Parameters of a data report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReportParams {
    /// Sites to include.
    pub selection: SiteSelection,
    /// Records per site.
    pub count: usize,
    /// Subject override.
    pub subject: Option<String>,
}

/// A requested operation with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Dump recent records.
    DataReport(DataReportParams),
    /// Alert on sites that stopped reporting.
    OfflineCheck {
        /// Staleness threshold in hours.
        max_hours: f64,
    },
    /// Summarise recent error events.
    ErrorSummary {
        /// Look-back window in hours.
        hours: f64,
        /// Errors listed per site.
        limit: usize,
    },
}

/// Operation names accepted in the `operation` field.
pub const OPERATION_NAMES: [&str; 3] = ["data_report", "offline_check", "error_summary"];

impl Operation {
    /// The wire name of the operation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DataReport(_) => "data_report",
            Self::OfflineCheck { .. } => "offline_check",
            Self::ErrorSummary { .. } => "error_summary",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated invocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// What to do.
    pub operation: Operation,
    /// Who receives the report.
    pub recipients: Vec<String>,
}

impl Request {
    /// Parses and validates a request payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first problem found.
    pub fn parse(payload: &Value, registry: &SiteRegistry) -> Result<Self, ValidationError> {
        let name = match payload.get("operation") {
            None | Some(Value::Null) => return Err(ValidationError::MissingOperation),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ValidationError::MissingOperation);
            }
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => return Err(ValidationError::UnknownOperation(other.to_string())),
        };

        let recipients = parse_recipients(payload.get("email"))?;

        let operation = match name.as_str() {
            "data_report" => Operation::DataReport(parse_data_report(payload, registry)?),
            "offline_check" => Operation::OfflineCheck {
                max_hours: hours_field(payload, "max_hours", DEFAULT_MAX_HOURS, true)?,
            },
            "error_summary" => Operation::ErrorSummary {
                hours: hours_field(payload, "hours", DEFAULT_ERROR_HOURS, false)?,
                limit: count_field(payload, "limit", DEFAULT_ERROR_LIMIT)?,
            },
            _ => return Err(ValidationError::UnknownOperation(name)),
        };

        Ok(Self {
            operation,
            recipients,
        })
    }
}

/// Peeks at the operation name without validating the rest.
#[must_use]
pub fn operation_name(payload: &Value) -> Option<&str> {
    payload.get("operation").and_then(Value::as_str)
}

fn parse_recipients(value: Option<&Value>) -> Result<Vec<String>, ValidationError> {
    let recipients = match value {
        None | Some(Value::Null) => return Err(ValidationError::MissingRecipients),
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or(ValidationError::MalformedRecipients)
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ValidationError::MalformedRecipients),
    };

    if recipients.is_empty() || recipients.iter().all(String::is_empty) {
        return Err(ValidationError::MissingRecipients);
    }
    if recipients.iter().any(String::is_empty) {
        return Err(ValidationError::MalformedRecipients);
    }
    Ok(recipients)
}

fn parse_data_report(
    payload: &Value,
    registry: &SiteRegistry,
) -> Result<DataReportParams, ValidationError> {
    let query_type = match payload.get("queryType") {
        None | Some(Value::Null) => "single".to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(ValidationError::InvalidQueryType(other.to_string())),
    };

    let selection = match query_type.as_str() {
        "all" => SiteSelection::All,
        "single" => {
            let name = payload
                .get("siteName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(ValidationError::MissingSiteName)?;
            if registry.get_active(name).is_none() {
                return Err(ValidationError::InvalidSite {
                    name: name.to_string(),
                    active: registry.active_codes(),
                });
            }
            SiteSelection::Single(name.to_string())
        }
        _ => return Err(ValidationError::InvalidQueryType(query_type)),
    };

    let subject = match payload.get("subject") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ValidationError::InvalidParameter {
                name: "subject".to_string(),
                reason: "must be a string".to_string(),
            });
        }
    };

    Ok(DataReportParams {
        selection,
        count: count_field(payload, "count", DEFAULT_COUNT)?,
        subject,
    })
}

fn invalid(name: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Reads a number given either as a JSON number or a numeric string.
fn number_field(payload: &Value, name: &str) -> Result<Option<f64>, ValidationError> {
    match payload.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(name, "not representable as a number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(name, format!("{s:?} is not a number"))),
        Some(other) => Err(invalid(name, format!("expected a number, got {other}"))),
    }
}

fn count_field(payload: &Value, name: &str, default: usize) -> Result<usize, ValidationError> {
    let Some(value) = number_field(payload, name)? else {
        return Ok(default);
    };
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
        return Err(invalid(name, "must be a whole number of at least 1"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as usize)
}

fn hours_field(
    payload: &Value,
    name: &str,
    default: f64,
    allow_zero: bool,
) -> Result<f64, ValidationError> {
    let Some(value) = number_field(payload, name)? else {
        return Ok(default);
    };
    if !value.is_finite() {
        return Err(invalid(name, "must be finite"));
    }
    if allow_zero && value < 0.0 {
        return Err(invalid(name, "must not be negative"));
    }
    if !allow_zero && value <= 0.0 {
        return Err(invalid(name, "must be greater than zero"));
    }
    if value > MAX_HOURS {
        return Err(invalid(name, format!("must be at most {MAX_HOURS} hours")));
    }
    Ok(value)
}
