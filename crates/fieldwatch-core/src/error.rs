//! Error types for the fieldwatch-core crate.

use thiserror::Error;

/// Errors raised by the monitoring pipeline.
///
/// Store and timestamp errors are recovered close to where they occur; they
/// surface here so callers can decide how to degrade.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backing store could not answer a query for a site.
    #[error("store unavailable for site {site}: {reason}")]
    StoreUnavailable {
        /// The site code being queried.
        site: String,
        /// Why the store failed.
        reason: String,
    },

    /// A stored row could not be decoded into a record.
    #[error("malformed record for site {site}: {reason}")]
    MalformedRecord {
        /// The site code the row belongs to.
        site: String,
        /// What was wrong with the row.
        reason: String,
    },

    /// A timestamp string matched none of the recognised formats.
    #[error("unparseable timestamp: {raw:?}")]
    TimestampParse {
        /// The raw timestamp text.
        raw: String,
    },

    /// Two site descriptors share the same code.
    #[error("duplicate site code: {code}")]
    DuplicateSite {
        /// The repeated code.
        code: String,
    },

    /// Configuration values are out of range or inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// Filesystem error while loading snapshots.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_store_unavailable() {
        let err = CoreError::StoreUnavailable {
            site: "Sakti".to_string(),
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "store unavailable for site Sakti: connection reset"
        );
    }

    #[test]
    fn error_display_timestamp_parse() {
        let err = CoreError::TimestampParse {
            raw: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "unparseable timestamp: \"yesterday\"");
    }

    #[test]
    fn error_display_duplicate_site() {
        let err = CoreError::DuplicateSite {
            code: "Sakti".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate site code: Sakti");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not json");
        assert!(json_err.is_err());
        let core_err: CoreError = json_err.unwrap_err().into();
        assert!(matches!(core_err, CoreError::Serialization(_)));
    }
}
