//! Operation orchestration.
//!
//! A [`Monitor`] owns its collaborators (stores, clocks, notification
//! channel) and runs one operation start to finish. Per-site store failures
//! degrade the report; a failed delivery fails the operation.

use std::sync::Arc;

use fieldwatch_alerts::{AlertError, Notification, NotificationChannel, NotificationResult};
use fieldwatch_core::{
    Clock, EventLogStore, QueryFacade, Report, SiteClock, SiteDescriptor, SiteErrorBundle, SiteRegistry,
    TelemetryStore, all_sites_recent_errors, assemble_data_report, offline_sites_report,
    render_data_dump, render_error_summary, render_offline_alert, render_query_failure,
};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::request::{DataReportParams, Operation, Request, SiteSelection};

/// What an operation did, independent of how it is returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Wire name of the operation.
    pub operation: &'static str,
    /// Human-readable summary.
    pub message: String,
    /// Whether a notification was sent.
    pub notified: bool,
    /// Operation-specific fields.
    pub details: Map<String, Value>,
}

impl Outcome {
    fn new(operation: &'static str, message: impl Into<String>, notified: bool) -> Self {
        Self {
            operation,
            message: message.into(),
            notified,
            details: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    fn with_failed_sites(self, bundle: &SiteErrorBundle) -> Self {
        if bundle.is_complete() {
            self
        } else {
            self.with("failed_sites", json!(bundle.failed_sites))
        }
    }
}

/// Runs monitoring operations against injected collaborators.
#[derive(Debug, Clone)]
pub struct Monitor {
    facade: QueryFacade,
    channel: Arc<dyn NotificationChannel>,
}

impl Monitor {
    /// Wires a monitor from its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<SiteRegistry>,
        telemetry: Arc<dyn TelemetryStore>,
        events: Arc<dyn EventLogStore>,
        site_clock: SiteClock,
        clock: Arc<dyn Clock>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            facade: QueryFacade::new(registry, telemetry, events, site_clock, clock),
            channel,
        }
    }

    /// Wires a monitor around an existing query facade.
    #[must_use]
    pub fn with_facade(facade: QueryFacade, channel: Arc<dyn NotificationChannel>) -> Self {
        Self { facade, channel }
    }

    /// The site registry.
    #[must_use]
    pub fn registry(&self) -> &SiteRegistry {
        self.facade.registry()
    }

    /// Runs a validated request.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Notification` if the report could not be
    /// delivered.
    pub fn run(&self, request: &Request) -> Result<Outcome> {
        match &request.operation {
            Operation::DataReport(params) => self.data_report(params, &request.recipients),
            Operation::OfflineCheck { max_hours } => {
                self.offline_check(*max_hours, &request.recipients)
            }
            Operation::ErrorSummary { hours, limit } => {
                self.error_summary(*hours, *limit, &request.recipients)
            }
        }
    }

    /// Sends the latest records of the selected sites.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Notification` if delivery fails.
    pub fn data_report(&self, params: &DataReportParams, recipients: &[String]) -> Result<Outcome> {
        let sites: Vec<SiteDescriptor> = match &params.selection {
            SiteSelection::All => self.registry().active_sites().cloned().collect(),
            SiteSelection::Single(code) => vec![self.registry().describe(code)],
        };

        let mut sections = Vec::with_capacity(sites.len());
        let mut record_counts = Map::new();
        for site in &sites {
            match self.facade.try_latest(&site.code, params.count) {
                Ok(records) => {
                    record_counts.insert(site.code.clone(), json!(records.len()));
                    sections.push(render_data_dump(site, &records));
                }
                Err(e) if params.selection == SiteSelection::All => {
                    warn!(site = %site.code, error = %e, "site skipped in data report");
                    record_counts.insert(site.code.clone(), Value::Null);
                    sections.push(render_query_failure(site, &e.to_string()));
                }
                Err(e) => {
                    // A lone site degrades to an empty dump.
                    warn!(site = %site.code, error = %e, "telemetry query failed");
                    record_counts.insert(site.code.clone(), json!(0));
                    sections.push(render_data_dump(site, &[]));
                }
            }
        }

        let report = assemble_data_report(params.subject.as_deref(), &sections);
        self.deliver(&report, recipients)?;

        info!(sites = sites.len(), "data report sent");
        Ok(Outcome::new("data_report", "Data report sent successfully", true)
            .with("recipients", json!(recipients))
            .with("record_counts", Value::Object(record_counts)))
    }

    /// Alerts on active sites that stopped reporting.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Notification` if delivery fails.
    pub fn offline_check(&self, max_hours: f64, recipients: &[String]) -> Result<Outcome> {
        let set = offline_sites_report(&self.facade, max_hours);

        let Some(report) = render_offline_alert(&set, self.facade.site_clock()) else {
            info!(hours = max_hours, "all sites active");
            return Ok(Outcome::new(
                "offline_check",
                format!("All sites active within {max_hours} hours"),
                false,
            )
            .with("offline_sites", json!({})));
        };

        self.deliver(&report, recipients)?;

        let offline: Map<String, Value> = set
            .sites
            .iter()
            .map(|s| (s.site.code.clone(), json!(s.last_timestamp_raw)))
            .collect();
        info!(offline = set.len(), hours = max_hours, "offline alert sent");
        Ok(Outcome::new(
            "offline_check",
            format!("Offline alert sent - {} sites offline", set.len()),
            true,
        )
        .with("offline_sites", Value::Object(offline))
        .with("recipients", json!(recipients)))
    }

    /// Summarises recent error events across active sites.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Notification` if delivery fails.
    pub fn error_summary(&self, hours: f64, limit: usize, recipients: &[String]) -> Result<Outcome> {
        let bundle = all_sites_recent_errors(&self.facade, hours, limit);
        let now = self.facade.clock().now();

        let Some(report) = render_error_summary(&bundle, self.facade.site_clock(), now) else {
            info!(hours, failed = ?bundle.failed_sites, "no errors in window");
            return Ok(Outcome::new(
                "error_summary",
                format!("No errors found in last {hours} hours"),
                false,
            )
            .with("total_errors", json!(0))
            .with_failed_sites(&bundle));
        };

        self.deliver(&report, recipients)?;

        let total = bundle.total();
        let counts: Map<String, Value> = bundle
            .sites
            .iter()
            .map(|s| (s.site.code.clone(), json!(s.events.len())))
            .collect();
        info!(total, hours, "error summary sent");
        Ok(Outcome::new(
            "error_summary",
            format!("Error summary sent - {total} total errors"),
            true,
        )
        .with("site_error_counts", Value::Object(counts))
        .with("total_errors", json!(total))
        .with("recipients", json!(recipients))
        .with_failed_sites(&bundle))
    }

    fn deliver(&self, report: &Report, recipients: &[String]) -> Result<NotificationResult> {
        let notification = Notification::new(
            report.subject.clone(),
            report.text_body.clone(),
            report.html_body.clone(),
        )
        .with_recipients(recipients.to_vec());

        let result = self.channel.send(&notification).map_err(|e| {
            error!(channel = %self.channel.name(), error = %e, "notification failed");
            e
        })?;

        if !result.success {
            let reason = result
                .message
                .clone()
                .unwrap_or_else(|| "channel reported failure".to_string());
            error!(channel = %result.channel, reason = %reason, "notification rejected");
            return Err(AlertError::failed(result.channel, reason).into());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use chrono::{DateTime, TimeZone, Utc};
    use fieldwatch_alerts::RecordingChannel;
    use fieldwatch_core::{
        Category, CoreError, FixedClock, MemoryEventLog, MemoryTelemetryStore, Row,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    /// Telemetry store that fails for one site.
    struct PartiallyDown {
        inner: MemoryTelemetryStore,
        down: &'static str,
    }

    impl TelemetryStore for PartiallyDown {
        fn latest_rows(
            &self,
            category: Category,
            code: &str,
            limit: usize,
        ) -> fieldwatch_core::Result<Vec<Row>> {
            if code == self.down {
                return Err(CoreError::StoreUnavailable {
                    site: code.to_string(),
                    reason: "throttled".to_string(),
                });
            }
            self.inner.latest_rows(category, code, limit)
        }
    }

    fn telemetry() -> MemoryTelemetryStore {
        let store = MemoryTelemetryStore::new(SiteClock::ist());
        store.extend(
            Category::Air,
            vec![
                row(json!({"site_name": "Sakti", "timestamp": "2024-05-01T11:30:00Z", "temperature": 18})),
                row(json!({"site_name": "Stakmo", "timestamp": "2024-05-01T11:45:00Z"})),
            ],
        );
        store.insert(
            Category::Drip,
            row(json!({"site_name": "Skuast", "timestamp": "2024-05-01T07:00:00Z", "soil_1": 30})),
        );
        store
    }

    fn monitor_with(
        telemetry: Arc<dyn TelemetryStore>,
        events: MemoryEventLog,
        channel: Arc<RecordingChannel>,
    ) -> Monitor {
        Monitor::new(
            Arc::new(SiteRegistry::fleet()),
            telemetry,
            Arc::new(events),
            SiteClock::ist(),
            Arc::new(FixedClock::new(now())),
            channel,
        )
    }

    fn recipients() -> Vec<String> {
        vec!["ops@example.com".to_string()]
    }

    mod data_report_tests {
        use super::*;

        fn params(selection: SiteSelection) -> DataReportParams {
            DataReportParams {
                selection,
                count: 5,
                subject: None,
            }
        }

        #[test]
        fn single_site_report_sent() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor
                .data_report(&params(SiteSelection::Single("Skuast".into())), &recipients())
                .unwrap();

            assert!(outcome.notified);
            assert_eq!(outcome.message, "Data report sent successfully");
            assert_eq!(outcome.details["record_counts"]["Skuast"], 1);
            let sent = channel.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].subject, "Site Data Report");
            assert!(sent[0].text_body.contains("[DRIP]"));
            assert_eq!(sent[0].recipients, recipients());
        }

        #[test]
        fn all_sites_inline_failure_section() {
            let channel = Arc::new(RecordingChannel::new());
            let store = PartiallyDown {
                inner: telemetry(),
                down: "Stakmo",
            };
            let monitor = monitor_with(Arc::new(store), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor.data_report(&params(SiteSelection::All), &recipients()).unwrap();

            assert_eq!(outcome.details["record_counts"]["Sakti"], 1);
            assert_eq!(outcome.details["record_counts"]["Stakmo"], Value::Null);
            let body = &channel.sent()[0].text_body;
            assert!(body.contains("=== Site: Sakti (Sakti) [AIR] ==="));
            assert!(body.contains("Error querying site Stakmo"));
            assert!(body.contains("=== Site: Skuast (Skuast) [DRIP] ==="));
        }

        #[test]
        fn subject_override_used() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel.clone());
            let mut p = params(SiteSelection::All);
            p.subject = Some("Morning dump".to_string());

            monitor.data_report(&p, &recipients()).unwrap();
            assert_eq!(channel.sent()[0].subject, "Morning dump");
        }

        #[test]
        fn delivery_failure_propagates() {
            let channel = Arc::new(RecordingChannel::failing());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel);

            let err = monitor.data_report(&params(SiteSelection::All), &recipients()).unwrap_err();
            assert!(matches!(err, MonitorError::Notification(AlertError::NotificationFailed { .. })));
        }
    }

    mod offline_check_tests {
        use super::*;

        #[test]
        fn stale_site_alerted() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor.offline_check(2.0, &recipients()).unwrap();

            assert!(outcome.notified);
            assert_eq!(outcome.message, "Offline alert sent - 1 sites offline");
            assert_eq!(outcome.details["offline_sites"]["Skuast"], "2024-05-01T07:00:00Z");
            let sent = channel.sent();
            assert_eq!(sent.len(), 1);
            assert!(sent[0].subject.contains("Offline"));
            assert!(sent[0].subject.contains("2H"));
        }

        #[test]
        fn all_active_sends_nothing() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor.offline_check(6.0, &recipients()).unwrap();
            assert!(!outcome.notified);
            assert_eq!(outcome.message, "All sites active within 6 hours");
            assert_eq!(outcome.details["offline_sites"], json!({}));
            assert_eq!(channel.count(), 0);
        }

        #[test]
        fn failing_site_reported_with_null_timestamp() {
            let channel = Arc::new(RecordingChannel::new());
            let store = PartiallyDown {
                inner: telemetry(),
                down: "Sakti",
            };
            let monitor = monitor_with(Arc::new(store), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor.offline_check(6.0, &recipients()).unwrap();
            assert_eq!(outcome.details["offline_sites"]["Sakti"], Value::Null);
            assert!(channel.sent()[0].text_body.contains("No data available"));
        }
    }

    mod error_summary_tests {
        use super::*;

        fn events() -> MemoryEventLog {
            let log = MemoryEventLog::new(SiteClock::ist());
            for (code, ts) in [
                ("Sakti", "2024-05-01T10:00:00Z"),
                ("Sakti", "2024-05-01T09:00:00Z"),
                ("Skuast", "2024-05-01 14:00"),
            ] {
                log.insert(row(json!({"site_name": code, "timestamp": ts, "message": "fault", "version": "1.4"})));
            }
            log
        }

        #[test]
        fn summary_sent_with_counts() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), events(), channel.clone());

            let outcome = monitor.error_summary(24.0, 5, &recipients()).unwrap();

            assert_eq!(outcome.message, "Error summary sent - 3 total errors");
            assert_eq!(outcome.details["site_error_counts"], json!({"Sakti": 2, "Skuast": 1}));
            assert_eq!(outcome.details["total_errors"], 3);
            let sent = channel.sent();
            assert_eq!(sent[0].subject, "🚨 Error Summary - 3 Total Errors");
            assert!(sent[0].text_body.contains("Report generated at: 2024-05-01 17:30 IST"));
        }

        #[test]
        fn no_errors_sends_nothing() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), MemoryEventLog::new(SiteClock::ist()), channel.clone());

            let outcome = monitor.error_summary(24.0, 5, &recipients()).unwrap();
            assert!(!outcome.notified);
            assert_eq!(outcome.message, "No errors found in last 24 hours");
            assert_eq!(outcome.details["total_errors"], 0);
            assert!(!outcome.details.contains_key("failed_sites"));
            assert_eq!(channel.count(), 0);
        }

        #[test]
        fn event_log_outage_is_reported_not_hidden() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = Monitor::new(
                Arc::new(SiteRegistry::fleet()),
                Arc::new(telemetry()),
                Arc::new(fieldwatch_core::UnavailableStore::new("scan throttled")),
                SiteClock::ist(),
                Arc::new(FixedClock::new(now())),
                channel.clone(),
            );

            let outcome = monitor.error_summary(24.0, 5, &recipients()).unwrap();

            assert!(!outcome.notified);
            assert_eq!(outcome.details["total_errors"], 0);
            assert_eq!(outcome.details["failed_sites"], json!(["Sakti", "Stakmo", "Skuast"]));
            assert_eq!(channel.count(), 0);
        }

        #[test]
        fn limit_caps_each_site() {
            let channel = Arc::new(RecordingChannel::new());
            let monitor = monitor_with(Arc::new(telemetry()), events(), channel);

            let outcome = monitor.error_summary(24.0, 1, &recipients()).unwrap();
            assert_eq!(outcome.details["total_errors"], 2);
        }
    }
}
