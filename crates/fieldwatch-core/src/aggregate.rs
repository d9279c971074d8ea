//! Error aggregation across the active fleet.

use serde::Serialize;
use tracing::{info, warn};

use crate::query::QueryFacade;
use crate::records::ErrorEvent;
use crate::sites::SiteDescriptor;

/// Recent errors for one site, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteErrors {
    /// The site.
    pub site: SiteDescriptor,
    /// Its errors, newest first.
    pub events: Vec<ErrorEvent>,
}

/// Per-site recent errors. Sites without errors in the window are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteErrorBundle {
    /// Look-back window, in hours.
    pub window_hours: f64,
    /// Sites with at least one error, in registry order.
    pub sites: Vec<SiteErrors>,
    /// Codes of sites whose event log could not be scanned.
    pub failed_sites: Vec<String>,
}

impl SiteErrorBundle {
    /// An empty bundle for the given window.
    #[must_use]
    pub const fn empty(window_hours: f64) -> Self {
        Self {
            window_hours,
            sites: Vec::new(),
            failed_sites: Vec::new(),
        }
    }

    /// Adds a site's errors. An empty list is ignored.
    pub fn push(&mut self, site: SiteDescriptor, events: Vec<ErrorEvent>) {
        if !events.is_empty() {
            self.sites.push(SiteErrors { site, events });
        }
    }

    /// Total number of errors across sites.
    #[must_use]
    pub fn total(&self) -> usize {
        self.sites.iter().map(|s| s.events.len()).sum()
    }

    /// Records a site whose scan failed.
    pub fn mark_failed(&mut self, code: impl Into<String>) {
        self.failed_sites.push(code.into());
    }

    /// Returns true if every scan succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_sites.is_empty()
    }

    /// Returns true if no site has errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Looks up a site's errors by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&[ErrorEvent]> {
        self.sites
            .iter()
            .find(|s| s.site.code == code)
            .map(|s| s.events.as_slice())
    }
}

/// Gathers recent errors for every active site.
///
/// A site whose scan fails contributes no events and is listed in
/// [`SiteErrorBundle::failed_sites`].
#[must_use]
pub fn all_sites_recent_errors(
    facade: &QueryFacade,
    since_hours: f64,
    limit_per_site: usize,
) -> SiteErrorBundle {
    let mut bundle = SiteErrorBundle::empty(since_hours);

    for site in facade.registry().active_sites() {
        match facade.recent_errors(&site.code, since_hours, limit_per_site) {
            Ok(events) => bundle.push(site.clone(), events),
            Err(e) => {
                warn!(site = %site.code, error = %e, "error scan failed");
                bundle.mark_failed(site.code.clone());
            }
        }
    }

    info!(
        sites = bundle.sites.len(),
        total = bundle.total(),
        failed = ?bundle.failed_sites,
        hours = since_hours,
        "errors aggregated"
    );
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::sites::{Category, SiteRegistry};
    use crate::store::{EventLogStore, MemoryEventLog, MemoryTelemetryStore, UnavailableStore};
    use crate::time::SiteClock;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn event(code: &str, ts: &str) -> crate::records::Row {
        match json!({"site_name": code, "timestamp": ts, "message": "fault", "version": "2.1"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn facade(log: MemoryEventLog) -> QueryFacade {
        facade_over(Arc::new(log))
    }

    fn facade_over(events: Arc<dyn EventLogStore>) -> QueryFacade {
        QueryFacade::new(
            Arc::new(SiteRegistry::fleet()),
            Arc::new(MemoryTelemetryStore::new(SiteClock::ist())),
            events,
            SiteClock::ist(),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())),
        )
    }

    #[test]
    fn omits_sites_without_errors() {
        let log = MemoryEventLog::new(SiteClock::ist());
        log.insert(event("Skuast", "2024-05-01T10:00:00Z"));
        log.insert(event("Skuast", "2024-05-01T11:00:00Z"));
        log.insert(event("Sakti", "2024-05-01T11:30:00Z"));
        log.insert(event("Stakmo", "2024-04-20T11:30:00Z"));
        // Inactive sites are never scanned.
        log.insert(event("Li", "2024-05-01T11:30:00Z"));

        let bundle = all_sites_recent_errors(&facade(log), 24.0, 5);
        let codes: Vec<_> = bundle.sites.iter().map(|s| s.site.code.as_str()).collect();
        assert_eq!(codes, vec!["Sakti", "Skuast"]);
        assert!(bundle.get("Stakmo").is_none());
        assert_eq!(bundle.total(), 3);
        assert_eq!(
            bundle.total(),
            bundle.sites.iter().map(|s| s.events.len()).sum::<usize>()
        );
    }

    #[test]
    fn per_site_limit_applies() {
        let log = MemoryEventLog::new(SiteClock::ist());
        for hour in 0..8 {
            log.insert(event("Sakti", &format!("2024-05-01T0{hour}:00:00Z")));
        }
        let bundle = all_sites_recent_errors(&facade(log), 24.0, 3);
        let events = bundle.get("Sakti").unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp, "2024-05-01T07:00:00Z");
    }

    #[test]
    fn no_errors_gives_empty_bundle() {
        let bundle = all_sites_recent_errors(&facade(MemoryEventLog::new(SiteClock::ist())), 24.0, 5);
        assert!(bundle.is_empty());
        assert_eq!(bundle.total(), 0);
    }

    #[test]
    fn event_log_outage_lists_every_site_as_failed() {
        let bundle = all_sites_recent_errors(&facade_over(Arc::new(UnavailableStore::new("down"))), 24.0, 5);
        assert!(bundle.is_empty());
        assert_eq!(bundle.total(), 0);
        assert!(!bundle.is_complete());
        assert_eq!(bundle.failed_sites, vec!["Sakti", "Stakmo", "Skuast"]);
    }

    #[test]
    fn successful_scans_leave_no_failures() {
        let bundle = all_sites_recent_errors(&facade(MemoryEventLog::new(SiteClock::ist())), 24.0, 5);
        assert!(bundle.is_complete());
    }

    #[test]
    fn push_ignores_empty_lists() {
        let mut bundle = SiteErrorBundle::empty(1.0);
        bundle.push(SiteDescriptor::new("A", "A", Category::Air), Vec::new());
        assert!(bundle.is_empty());
    }
}
