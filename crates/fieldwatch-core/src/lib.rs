//! Monitoring evaluation pipeline for remote irrigation sensor sites.
//!
//! This crate provides:
//! - Timestamp normalisation between site-local time and UTC
//! - The site registry and category routing
//! - Store interfaces with in-memory implementations
//! - Liveness evaluation and error aggregation across the fleet
//! - Paired text/HTML report rendering
//!
//! # Example
//!
//! ```rust
//! use fieldwatch_core::{SiteClock, evaluate};
//! use chrono::{TimeZone, Utc};
//!
//! let clock = SiteClock::ist();
//! let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//!
//! let result = evaluate("Sakti", Some("2024-05-01T10:00:00Z"), 2.0, now, &clock);
//! assert!(result.is_active);
//! assert_eq!(clock.display("2024-05-01T10:00:00Z"), "2024-05-01 15:30 IST");
//! ```

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod liveness;
pub mod query;
pub mod records;
pub mod render;
pub mod sites;
pub mod store;
pub mod time;

pub use aggregate::{SiteErrorBundle, SiteErrors, all_sites_recent_errors};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, Result};
pub use liveness::{
    LivenessResult, OfflineSite, OfflineSiteSet, evaluate, offline_sites_report, site_outcomes,
};
pub use query::QueryFacade;
pub use records::{
    AirReading, DripReading, ErrorEvent, MISSING, Reading, Row, Scalar, TelemetryRecord,
};
pub use render::{
    DATA_REPORT_SUBJECT, NO_DATA, Rendered, Report, assemble_data_report, html_escape,
    render_data_dump, render_error_summary, render_offline_alert, render_query_failure,
};
pub use sites::{Category, SITE_TABLE_VERSION, SiteDescriptor, SiteRegistry, SiteTable};
pub use store::{
    EVENT_SCAN_CAP, EventLogStore, MemoryEventLog, MemoryTelemetryStore, TelemetryStore,
    UnavailableStore,
};
pub use time::{CanonicalInstant, DEFAULT_UTC_OFFSET_MINUTES, DEFAULT_ZONE_LABEL, SiteClock, UNKNOWN_TIME};
