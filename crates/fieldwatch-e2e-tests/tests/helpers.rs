//! Shared fixtures for end-to-end scenarios.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use fieldwatch_alerts::RecordingChannel;
use fieldwatch_core::{
    Category, CoreError, EventLogStore, FixedClock, MemoryEventLog, MemoryTelemetryStore, Row,
    SiteClock, SiteRegistry, TelemetryStore,
};
use fieldwatch_monitor::Monitor;
use serde_json::Value;

/// 2024-05-01 12:00 UTC, 17:30 at the sites.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Converts a JSON object literal into a store row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

/// Telemetry that fails for the listed sites.
pub struct Throttled {
    pub inner: MemoryTelemetryStore,
    pub down: Vec<&'static str>,
}

impl TelemetryStore for Throttled {
    fn latest_rows(
        &self,
        category: Category,
        code: &str,
        limit: usize,
    ) -> fieldwatch_core::Result<Vec<Row>> {
        if self.down.contains(&code) {
            return Err(CoreError::StoreUnavailable {
                site: code.to_string(),
                reason: "provisioned throughput exceeded".to_string(),
            });
        }
        self.inner.latest_rows(category, code, limit)
    }
}

/// A monitor over the deployed fleet with a recording channel.
pub struct Harness {
    pub monitor: Monitor,
    pub channel: Arc<RecordingChannel>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new(telemetry: Arc<dyn TelemetryStore>, events: Arc<dyn EventLogStore>) -> Self {
        let channel = Arc::new(RecordingChannel::new());
        let clock = Arc::new(FixedClock::new(now()));
        let monitor = Monitor::new(
            Arc::new(SiteRegistry::fleet()),
            telemetry,
            events,
            SiteClock::ist(),
            clock.clone(),
            channel.clone(),
        );
        Self {
            monitor,
            channel,
            clock,
        }
    }

    /// Healthy fleet: every active site reported within the last hour.
    pub fn healthy() -> Self {
        Self::new(Arc::new(fresh_telemetry()), Arc::new(MemoryEventLog::new(SiteClock::ist())))
    }
}

/// Every active site reported recently. Site-local timestamps carry no zone.
pub fn fresh_telemetry() -> MemoryTelemetryStore {
    let store = MemoryTelemetryStore::new(SiteClock::ist());
    store.extend(
        Category::Air,
        vec![
            row(serde_json::json!({
                "site_name": "Sakti", "timestamp": "2024-05-01 17:00:00",
                "temperature": 14.5, "discharge": 2.4, "pressure": 612
            })),
            row(serde_json::json!({
                "site_name": "Sakti", "timestamp": "2024-05-01 16:30:00",
                "temperature": 13.9, "discharge": 2.1, "pressure": 611
            })),
            row(serde_json::json!({"site_name": "Stakmo", "timestamp": "2024-05-01T11:40:00Z"})),
        ],
    );
    store.insert(
        Category::Drip,
        row(serde_json::json!({
            "site_name": "Skuast", "timestamp": "2024-05-01 17:15:00",
            "soil_1": 31, "soil_2": 28, "counter": 1042
        })),
    );
    store
}
