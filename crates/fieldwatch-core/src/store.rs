//! Store interfaces and in-memory implementations.
//!
//! The time-series and event-log stores are external collaborators. This
//! module defines the narrow interface the pipeline needs from each and
//! provides thread-safe in-memory stores that can be loaded from JSON
//! snapshots (one array of items per file).

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::records::{Row, SITE_FIELD, TIMESTAMP_FIELD};
use crate::sites::Category;
use crate::time::SiteClock;

/// Upper bound on event rows a single scan may return.
pub const EVENT_SCAN_CAP: usize = 50;

/// A keyed, time-ordered record store.
pub trait TelemetryStore: Send + Sync {
    /// Returns up to `limit` rows for a site, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StoreUnavailable` if the store cannot be queried.
    fn latest_rows(&self, category: Category, site_code: &str, limit: usize) -> Result<Vec<Row>>;
}

/// A filterable event log.
pub trait EventLogStore: Send + Sync {
    /// Returns up to `cap` rows for a site whose time is at or after `since`.
    ///
    /// Rows come back in no particular order, and the time filter may be
    /// approximate; callers re-filter and sort.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StoreUnavailable` if the log cannot be scanned.
    fn scan_rows(&self, site_code: &str, since: DateTime<Utc>, cap: usize) -> Result<Vec<Row>>;
}

fn row_site(row: &Row) -> Option<&str> {
    row.get(SITE_FIELD).and_then(Value::as_str)
}

fn row_timestamp(row: &Row) -> &str {
    row.get(TIMESTAMP_FIELD).and_then(Value::as_str).unwrap_or("")
}

/// Reads a JSON array of items from disk.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file cannot be read, or
/// `CoreError::Serialization` if it is not an array of objects.
pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let text = std::fs::read_to_string(path)?;
    let rows: Vec<Row> = serde_json::from_str(&text)?;
    debug!(path = %path.display(), rows = rows.len(), "loaded snapshot");
    Ok(rows)
}

/// In-memory time-series store, one table per category.
#[derive(Debug)]
pub struct MemoryTelemetryStore {
    clock: SiteClock,
    tables: RwLock<HashMap<Category, Vec<Row>>>,
}

impl MemoryTelemetryStore {
    /// Creates an empty store. The clock orders rows by their timestamps.
    #[must_use]
    pub fn new(clock: SiteClock) -> Self {
        Self {
            clock,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a row to a category's table.
    pub fn insert(&self, category: Category, row: Row) {
        self.tables.write().entry(category).or_default().push(row);
    }

    /// Adds many rows to a category's table.
    pub fn extend(&self, category: Category, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .write()
            .entry(category)
            .or_default()
            .extend(rows);
    }

    /// Loads `air.json` and `drip.json` from a directory when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a present snapshot cannot be read or parsed.
    pub fn load_dir(clock: SiteClock, dir: &Path) -> Result<Self> {
        let store = Self::new(clock);
        for category in [Category::Air, Category::Drip] {
            let path = dir.join(format!("{}.json", category.as_str()));
            if path.exists() {
                store.extend(category, load_rows(&path)?);
            }
        }
        info!(dir = %dir.display(), rows = store.len(), "telemetry snapshot loaded");
        Ok(store)
    }

    /// Total number of rows across tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().values().map(Vec::len).sum()
    }

    /// Returns true if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetryStore for MemoryTelemetryStore {
    fn latest_rows(&self, category: Category, site_code: &str, limit: usize) -> Result<Vec<Row>> {
        let tables = self.tables.read();
        let Some(table) = tables.get(&category) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Row> = table
            .iter()
            .filter(|row| row_site(row) == Some(site_code))
            .collect();
        // Unparseable timestamps sort last.
        rows.sort_by(|a, b| {
            let ta = self.clock.normalize(row_timestamp(a));
            let tb = self.clock.normalize(row_timestamp(b));
            tb.cmp(&ta)
        });

        Ok(rows.into_iter().take(limit).cloned().collect())
    }
}

/// In-memory event log.
#[derive(Debug)]
pub struct MemoryEventLog {
    clock: SiteClock,
    rows: RwLock<Vec<Row>>,
}

impl MemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new(clock: SiteClock) -> Self {
        Self {
            clock,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Appends an event row.
    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    /// Loads `errors.json` from a directory when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    pub fn load_dir(clock: SiteClock, dir: &Path) -> Result<Self> {
        let log = Self::new(clock);
        let path = dir.join("errors.json");
        if path.exists() {
            log.rows.write().extend(load_rows(&path)?);
        }
        info!(dir = %dir.display(), rows = log.len(), "event log snapshot loaded");
        Ok(log)
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLogStore for MemoryEventLog {
    fn scan_rows(&self, site_code: &str, since: DateTime<Utc>, cap: usize) -> Result<Vec<Row>> {
        let rows = self.rows.read();
        Ok(rows
            .iter()
            .filter(|row| row_site(row) == Some(site_code))
            .filter(|row| {
                self.clock
                    .normalize(row_timestamp(row))
                    .is_some_and(|t| t.as_utc() >= since)
            })
            .take(cap)
            .cloned()
            .collect())
    }
}

/// A store that fails every query. Useful as a stand-in when a backend is
/// not configured.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    /// Creates a store that reports the given reason on every call.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self, site_code: &str) -> CoreError {
        CoreError::StoreUnavailable {
            site: site_code.to_string(),
            reason: self.reason.clone(),
        }
    }
}

impl TelemetryStore for UnavailableStore {
    fn latest_rows(&self, _category: Category, site_code: &str, _limit: usize) -> Result<Vec<Row>> {
        Err(self.error(site_code))
    }
}

impl EventLogStore for UnavailableStore {
    fn scan_rows(&self, site_code: &str, _since: DateTime<Utc>, _cap: usize) -> Result<Vec<Row>> {
        Err(self.error(site_code))
    }
}
