//! Report rendering.
//!
//! Every renderer is a pure function producing a plain-text body and an HTML
//! body from the same inputs. Both bodies carry the same facts; only markup
//! differs. Values interpolated into HTML are escaped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::SiteErrorBundle;
use crate::liveness::{OfflineSite, OfflineSiteSet};
use crate::records::{MISSING, TelemetryRecord};
use crate::sites::{Category, SiteDescriptor};
use crate::time::SiteClock;

/// Subject used for data reports unless the caller overrides it.
pub const DATA_REPORT_SUBJECT: &str = "Site Data Report";

/// Text shown when an offline site has no record at all.
pub const NO_DATA: &str = "No data available";

const AIR_COLUMNS: [&str; 6] = [
    "Timestamp",
    "Temperature",
    "Water Temp",
    "Discharge",
    "Pressure",
    "Counter",
];

const DRIP_COLUMNS: [&str; 7] = [
    "Timestamp",
    "Soil A",
    "Soil B",
    "Temperature",
    "Discharge",
    "Pressure",
    "Counter",
];

const TABLE_OPEN: &str = r#"<table border="1" cellpadding="5" cellspacing="0" style="border-collapse: collapse; margin-bottom: 20px;">"#;
const HEADER_ROW_OPEN: &str = r##"<tr style="background-color: #f2f2f2;">"##;

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Notification subject.
    pub subject: String,
    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
}

/// A text and HTML fragment describing the same content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Plain-text fragment.
    pub text: String,
    /// HTML fragment.
    pub html: String,
}

/// Escapes text for inclusion in HTML element content or attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Formats an hour count with one decimal, or [`MISSING`] when unknown.
#[must_use]
pub fn format_hours(hours: Option<f64>) -> String {
    hours.map_or_else(|| MISSING.to_string(), |h| format!("{h:.1}"))
}

fn columns(category: Category) -> &'static [&'static str] {
    match category {
        Category::Air => &AIR_COLUMNS,
        Category::Drip => &DRIP_COLUMNS,
    }
}

fn site_heading(site: &SiteDescriptor) -> String {
    format!(
        "Site: {} ({}) [{}]",
        site.display_name,
        site.code,
        site.category.as_str().to_uppercase()
    )
}

/// Renders one site's records as a table.
///
/// Columns follow the site's category. Records of another category are
/// rendered with their own values but under this site's header, so callers
/// should pass records decoded for the site.
#[must_use]
pub fn render_data_dump(site: &SiteDescriptor, records: &[TelemetryRecord]) -> Rendered {
    let header = columns(site.category);
    let heading = site_heading(site);

    let mut text = format!("=== {heading} ===\n");
    let mut html = format!("<h2>{}</h2>\n", html_escape(&heading));

    if records.is_empty() {
        text.push_str("No records available\n\n");
        html.push_str("<p>No records available</p>\n");
        return Rendered { text, html };
    }

    let text_header: Vec<String> = header
        .iter()
        .map(|c| c.to_uppercase().replace(' ', "_"))
        .collect();
    text.push_str(&text_header.join("\t"));
    text.push('\n');

    html.push_str(TABLE_OPEN);
    html.push('\n');
    html.push_str(HEADER_ROW_OPEN);
    for column in header {
        html.push_str(&format!("<th>{column}</th>"));
    }
    html.push_str("</tr>\n");

    for record in records {
        let mut cells = vec![record.timestamp.clone()];
        cells.extend(record.reading.cells());

        text.push_str(&cells.join("\t"));
        text.push('\n');

        html.push_str("<tr>");
        for cell in &cells {
            html.push_str(&format!("<td>{}</td>", html_escape(cell)));
        }
        html.push_str("</tr>\n");
    }

    text.push('\n');
    html.push_str("</table>\n");
    Rendered { text, html }
}

/// Renders the inline notice for a site whose query failed.
#[must_use]
pub fn render_query_failure(site: &SiteDescriptor, reason: &str) -> Rendered {
    let message = format!("Error querying site {}: {reason}", site.code);
    Rendered {
        text: format!("{message}\n\n"),
        html: format!("<p style=\"color: red;\">{}</p>\n", html_escape(&message)),
    }
}

/// Joins per-site fragments into one data report.
#[must_use]
pub fn assemble_data_report(subject: Option<&str>, sections: &[Rendered]) -> Report {
    let mut text_body = String::new();
    let mut html_body = String::from("<html><body>\n");
    for section in sections {
        text_body.push_str(&section.text);
        html_body.push_str(&section.html);
    }
    html_body.push_str("</body></html>\n");

    Report {
        subject: subject.unwrap_or(DATA_REPORT_SUBJECT).to_string(),
        text_body,
        html_body,
    }
}

fn last_report(site: &OfflineSite, clock: &SiteClock) -> String {
    match site.last_timestamp_raw.as_deref() {
        None => NO_DATA.to_string(),
        Some(raw) => clock
            .normalize(raw)
            .map_or_else(|| raw.to_string(), |instant| clock.format_instant(instant)),
    }
}

/// Renders the offline-sites alert, or `None` when no site is offline.
#[must_use]
pub fn render_offline_alert(set: &OfflineSiteSet, clock: &SiteClock) -> Option<Report> {
    if set.is_empty() {
        return None;
    }

    let hours = set.max_hours;
    let intro = format!("The following sites have not reported data in the last {hours} hours:");

    let mut text = format!("⚠️ URGENT ALERT: {intro}\n\n");
    let mut html = String::from("<html><body>\n");
    html.push_str("<h2 style=\"color: #FF0000;\">⚠️ URGENT ALERT: Sites Offline</h2>\n");
    html.push_str(&format!("<p>{}</p>\n", html_escape(&intro)));
    html.push_str(TABLE_OPEN);
    html.push('\n');
    html.push_str(HEADER_ROW_OPEN);
    html.push_str("<th>Site</th><th>Last Report</th><th>Hours Offline</th></tr>\n");

    for offline in &set.sites {
        let name = format!("{} ({})", offline.site.display_name, offline.site.code);
        let last = last_report(offline, clock);
        let since = format_hours(offline.hours_offline);

        text.push_str(&format!("Site: {name}\n"));
        text.push_str(&format!("Last report: {last}\n"));
        text.push_str(&format!("Hours since last report: {since}\n\n"));

        html.push_str(&format!(
            "<tr><td><strong>{}</strong></td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&name),
            html_escape(&last),
            html_escape(&since)
        ));
    }

    let footer = "Please check the site status and ensure data collection systems are functioning properly.";
    text.push_str(footer);
    text.push('\n');
    html.push_str("</table>\n");
    html.push_str(&format!("<p>{footer}</p>\n"));
    html.push_str("</body></html>\n");

    Some(Report {
        subject: format!("⚠️ URGENT ALERT: Sites Offline - {hours}H Check"),
        text_body: text,
        html_body: html,
    })
}

/// Renders the error summary, or `None` when the bundle is empty.
///
/// `generated_at` is stamped at the end of both bodies in site-local time.
#[must_use]
pub fn render_error_summary(
    bundle: &SiteErrorBundle,
    clock: &SiteClock,
    generated_at: DateTime<Utc>,
) -> Option<Report> {
    if bundle.is_empty() {
        return None;
    }

    let total = bundle.total();
    let window = bundle.window_hours;

    let mut text = format!("🚨 ERROR SUMMARY (Last {window} Hours)\n\n");
    text.push_str(&format!("Total errors across all sites: {total}\n\n"));

    let mut html = String::from("<html><body>\n");
    html.push_str(&format!(
        "<h2 style=\"color: #FF6600;\">🚨 Error Summary Report (Last {window} Hours)</h2>\n"
    ));
    html.push_str(&format!(
        "<p><strong>Total Errors:</strong> {total} across all sites</p>\n"
    ));

    for entry in &bundle.sites {
        let heading = format!(
            "{} ({}) - {} error(s)",
            entry.site.display_name,
            entry.site.code,
            entry.events.len()
        );
        text.push_str(&format!("Site: {heading}:\n"));
        text.push_str(&"-".repeat(50));
        text.push('\n');

        html.push_str(&format!(
            "<h4 style=\"color: #CC0000;\">{}</h4>\n",
            html_escape(&heading)
        ));
        html.push_str(TABLE_OPEN);
        html.push('\n');
        html.push_str(HEADER_ROW_OPEN);
        html.push_str("<th>#</th><th>Time</th><th>Version</th><th>Error Message</th></tr>\n");

        for (i, event) in entry.events.iter().enumerate() {
            let index = i + 1;
            let time = clock.display(&event.timestamp);
            text.push_str(&format!(
                "{index}. [{time}] [v{}] {}\n",
                event.version, event.message
            ));
            html.push_str(&format!(
                "<tr><td><strong>{index}</strong></td><td>{}</td><td>v{}</td><td>{}</td></tr>\n",
                html_escape(&time),
                html_escape(&event.version),
                html_escape(&event.message)
            ));
        }

        text.push('\n');
        html.push_str("</table>\n");
    }

    let stamp = clock.format_utc(generated_at);
    text.push_str(&format!("Report generated at: {stamp}"));
    html.push_str(&format!(
        "<p><em>Report generated at: {}</em></p>\n",
        html_escape(&stamp)
    ));
    html.push_str("</body></html>\n");

    Some(Report {
        subject: format!("🚨 Error Summary - {total} Total Errors"),
        text_body: text,
        html_body: html,
    })
}
