//! Per-site liveness against a staleness threshold.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::query::QueryFacade;
use crate::sites::SiteDescriptor;
use crate::time::SiteClock;

/// Liveness verdict for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivenessResult {
    /// Site code.
    pub site_code: String,
    /// Raw timestamp of the newest record, if any.
    pub last_timestamp_raw: Option<String>,
    /// Hours since the newest record. `None` when there is no record or its
    /// time cannot be resolved. May be negative under clock skew.
    pub hours_since_last_report: Option<f64>,
    /// Whether the site reported within the threshold.
    pub is_active: bool,
}

/// Judges a site from the raw timestamp of its newest record.
///
/// The threshold is inclusive: a record exactly `max_hours` old is active.
#[must_use]
pub fn evaluate(
    site_code: &str,
    raw_timestamp: Option<&str>,
    max_hours: f64,
    now: DateTime<Utc>,
    clock: &SiteClock,
) -> LivenessResult {
    let hours = raw_timestamp
        .and_then(|raw| clock.normalize(raw))
        .map(|instant| instant.hours_until(now));

    LivenessResult {
        site_code: site_code.to_string(),
        last_timestamp_raw: raw_timestamp.map(str::to_string),
        hours_since_last_report: hours,
        is_active: hours.is_some_and(|h| h <= max_hours),
    }
}

/// An active site judged offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineSite {
    /// The site.
    pub site: SiteDescriptor,
    /// Raw timestamp of the newest record, if one was found.
    pub last_timestamp_raw: Option<String>,
    /// Hours since the newest record, if known.
    pub hours_offline: Option<f64>,
    /// Why the site could not be evaluated, when its query failed.
    pub query_error: Option<String>,
}

/// Active sites judged offline, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineSiteSet {
    /// Threshold used for the evaluation, in hours.
    pub max_hours: f64,
    /// Offline sites.
    pub sites: Vec<OfflineSite>,
}

impl OfflineSiteSet {
    /// An empty set for the given threshold.
    #[must_use]
    pub const fn empty(max_hours: f64) -> Self {
        Self {
            max_hours,
            sites: Vec::new(),
        }
    }

    /// Number of offline sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true if every site is reporting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Looks up an offline site by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&OfflineSite> {
        self.sites.iter().find(|s| s.site.code == code)
    }
}

/// Evaluates every active site, keeping each site's outcome separate.
#[must_use]
pub fn site_outcomes(
    facade: &QueryFacade,
    max_hours: f64,
) -> Vec<(SiteDescriptor, Result<LivenessResult>)> {
    let now = facade.clock().now();
    facade
        .registry()
        .active_sites()
        .map(|site| {
            let outcome = facade.try_latest_timestamp(&site.code).map(|raw| {
                evaluate(&site.code, raw.as_deref(), max_hours, now, facade.site_clock())
            });
            (site.clone(), outcome)
        })
        .collect()
}

/// Collects the active sites that have not reported within `max_hours`.
///
/// A site whose query fails is reported offline with unknown fields; the
/// scan itself never fails.
#[must_use]
pub fn offline_sites_report(facade: &QueryFacade, max_hours: f64) -> OfflineSiteSet {
    let mut set = OfflineSiteSet::empty(max_hours);

    for (site, outcome) in site_outcomes(facade, max_hours) {
        match outcome {
            Ok(result) if result.is_active => {
                debug!(site = %site.code, hours = ?result.hours_since_last_report, "site active");
            }
            Ok(result) => {
                info!(site = %site.code, hours = ?result.hours_since_last_report, "site offline");
                set.sites.push(OfflineSite {
                    site,
                    last_timestamp_raw: result.last_timestamp_raw,
                    hours_offline: result.hours_since_last_report,
                    query_error: None,
                });
            }
            Err(e) => {
                warn!(site = %site.code, error = %e, "liveness query failed, reporting offline");
                set.sites.push(OfflineSite {
                    site,
                    last_timestamp_raw: None,
                    hours_offline: None,
                    query_error: Some(e.to_string()),
                });
            }
        }
    }

    set
}
