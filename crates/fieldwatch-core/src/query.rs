//! Data query facade over the telemetry and event-log stores.
//!
//! Routing by category comes from the [`SiteRegistry`]. The facade owns the
//! ordering guarantees: telemetry comes back newest first, and error events
//! are re-filtered, sorted and truncated here no matter what the store did.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::records::{ErrorEvent, TelemetryRecord, TIMESTAMP_FIELD};
use crate::sites::SiteRegistry;
use crate::store::{EventLogStore, TelemetryStore, EVENT_SCAN_CAP};
use crate::time::SiteClock;

/// Read-only access to site records and error events.
#[derive(Clone)]
pub struct QueryFacade {
    registry: Arc<SiteRegistry>,
    telemetry: Arc<dyn TelemetryStore>,
    events: Arc<dyn EventLogStore>,
    site_clock: SiteClock,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QueryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFacade")
            .field("sites", &self.registry.len())
            .field("site_clock", &self.site_clock)
            .finish_non_exhaustive()
    }
}

impl QueryFacade {
    /// Creates a facade over the given stores.
    #[must_use]
    pub fn new(
        registry: Arc<SiteRegistry>,
        telemetry: Arc<dyn TelemetryStore>,
        events: Arc<dyn EventLogStore>,
        site_clock: SiteClock,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            telemetry,
            events,
            site_clock,
            clock,
        }
    }

    /// The site registry used for routing.
    #[must_use]
    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// The clock used to interpret raw timestamps.
    #[must_use]
    pub fn site_clock(&self) -> &SiteClock {
        &self.site_clock
    }

    /// The source of the current time.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Fetches up to `count` records for a site, newest first.
    ///
    /// Rows that cannot be decoded are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query itself fails.
    pub fn try_latest(&self, code: &str, count: usize) -> Result<Vec<TelemetryRecord>> {
        let category = self.registry.store_for(code);
        let rows = self.telemetry.latest_rows(category, code, count)?;

        let records = rows
            .iter()
            .take(count)
            .filter_map(|row| match TelemetryRecord::from_row(code, category, row) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(site = %code, error = %e, "skipping row");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Fetches up to `count` records for a site, newest first.
    ///
    /// A failed query is logged and yields an empty list.
    #[must_use]
    pub fn latest(&self, code: &str, count: usize) -> Vec<TelemetryRecord> {
        self.try_latest(code, count).unwrap_or_else(|e| {
            warn!(site = %code, error = %e, "telemetry query failed");
            Vec::new()
        })
    }

    /// Raw timestamp of a site's newest row.
    ///
    /// `Ok(None)` means the site has never reported.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn try_latest_timestamp(&self, code: &str) -> Result<Option<String>> {
        let category = self.registry.store_for(code);
        let rows = self.telemetry.latest_rows(category, code, 1)?;
        Ok(rows.first().and_then(|row| {
            row.get(TIMESTAMP_FIELD)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        }))
    }

    /// Raw timestamp of a site's newest row, or `None` if there is none or
    /// the query failed.
    #[must_use]
    pub fn latest_timestamp(&self, code: &str) -> Option<String> {
        self.try_latest_timestamp(code).unwrap_or_else(|e| {
            warn!(site = %code, error = %e, "latest timestamp query failed");
            None
        })
    }

    /// Error events for a site within the last `since_hours`, newest first,
    /// at most `limit` of them.
    ///
    /// Events whose time cannot be resolved fall outside every window.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` for a window that is not finite,
    /// is negative or reaches past the representable calendar, or the
    /// store's error if the scan fails.
    pub fn recent_errors(&self, code: &str, since_hours: f64, limit: usize) -> Result<Vec<ErrorEvent>> {
        let window = window_duration(since_hours)?;
        let since = self
            .clock
            .now()
            .checked_sub_signed(window)
            .ok_or_else(|| CoreError::InvalidConfig {
                reason: format!("look-back window of {since_hours} hours reaches before the calendar start"),
            })?;
        let rows = self.events.scan_rows(code, since, EVENT_SCAN_CAP)?;

        let mut events: Vec<_> = rows
            .iter()
            .map(|row| ErrorEvent::from_row(code, row))
            .filter_map(|event| {
                let instant = self.site_clock.normalize(&event.timestamp)?;
                (instant.as_utc() >= since).then_some((instant, event))
            })
            .collect();

        events.sort_by(|a, b| b.0.cmp(&a.0));
        events.truncate(limit);
        debug!(site = %code, events = events.len(), "recent errors collected");
        Ok(events.into_iter().map(|(_, event)| event).collect())
    }
}

/// Largest window in milliseconds that converts to `i64` without saturating.
const MAX_WINDOW_MILLIS: f64 = 9.2e18;

fn window_duration(hours: f64) -> Result<Duration> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(CoreError::InvalidConfig {
            reason: format!("look-back window must be a non-negative number of hours, got {hours}"),
        });
    }
    let millis = (hours * 3_600_000.0).round();
    if millis >= MAX_WINDOW_MILLIS {
        return Err(CoreError::InvalidConfig {
            reason: format!("look-back window of {hours} hours is out of range"),
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = millis as i64;
    Duration::try_milliseconds(millis).ok_or_else(|| CoreError::InvalidConfig {
        reason: format!("look-back window of {hours} hours is out of range"),
    })
}
