//! Configuration file loading.
//!
//! The file is optional. Every section falls back to the built-in default:
//! the deployed fleet, IST site time, and the log channel.

use std::path::Path;

use fieldwatch_alerts::EmailConfig;
use fieldwatch_core::{
    DEFAULT_UTC_OFFSET_MINUTES, DEFAULT_ZONE_LABEL, SiteClock, SiteRegistry, SiteTable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CliError;

/// Site-local time settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Offset of site-local time east of UTC, in minutes.
    #[serde(default = "default_offset")]
    pub utc_offset_minutes: i32,
    /// Label appended to displayed times.
    #[serde(default = "default_label")]
    pub label: String,
}

const fn default_offset() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

fn default_label() -> String {
    DEFAULT_ZONE_LABEL.to_string()
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_offset(),
            label: default_label(),
        }
    }
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Site table; the deployed fleet when absent.
    #[serde(default)]
    pub sites: Option<SiteTable>,
    /// Site clock.
    #[serde(default)]
    pub clock: ClockConfig,
    /// SMTP settings; notifications go to the log when absent.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl Config {
    /// Loads configuration from a file, or defaults when no path is given or
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Io` if the file exists but cannot be read, or
    /// `CliError::Config` if it is not valid configuration JSON.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            debug!("no configuration file given, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            info!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Builds the site registry.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` for an unsupported or inconsistent table.
    pub fn registry(&self) -> Result<SiteRegistry, CliError> {
        match &self.sites {
            None => Ok(SiteRegistry::fleet()),
            Some(table) => SiteRegistry::from_table(table.clone())
                .map_err(|e| CliError::Config(e.to_string())),
        }
    }

    /// Builds the site clock.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` for an out-of-range offset.
    pub fn site_clock(&self) -> Result<SiteClock, CliError> {
        SiteClock::new(self.clock.utc_offset_minutes, self.clock.label.clone())
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.registry().unwrap(), SiteRegistry::fleet());
        assert_eq!(config.site_clock().unwrap(), SiteClock::ist());
        assert!(config.email.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn full_file() {
        let file = write_config(
            r#"{
                "sites": {
                    "version": 1,
                    "sites": [
                        {"code": "North", "display_name": "North Field", "category": "drip", "active": true},
                        {"code": "Old", "display_name": "Old Pump", "category": "air", "active": false}
                    ]
                },
                "clock": {"utc_offset_minutes": 60, "label": "CET"},
                "email": {"sender": "alerts@example.com", "smtp_host": "smtp.example.com", "username": "alerts"}
            }"#,
        );
        let config = Config::load(Some(file.path())).unwrap();

        let registry = config.registry().unwrap();
        assert_eq!(registry.active_codes(), vec!["North"]);
        assert_eq!(config.site_clock().unwrap().label(), "CET");
        let email = config.email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert_eq!(email.username.as_deref(), Some("alerts"));
    }

    #[test]
    fn partial_clock_section_keeps_defaults() {
        let file = write_config(r#"{"clock": {"label": "Site"}}"#);
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.clock.utc_offset_minutes, 330);
        assert_eq!(config.clock.label, "Site");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let file = write_config("{ not json");
        assert!(matches!(Config::load(Some(file.path())), Err(CliError::Config(_))));
    }

    #[test]
    fn duplicate_sites_rejected() {
        let file = write_config(
            r#"{"sites": {"sites": [
                {"code": "A", "display_name": "A", "category": "air", "active": true},
                {"code": "A", "display_name": "B", "category": "air", "active": true}
            ]}}"#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(config.registry(), Err(CliError::Config(_))));
    }

    #[test]
    fn out_of_range_offset_rejected() {
        let config = Config {
            clock: ClockConfig {
                utc_offset_minutes: 24 * 60,
                label: "X".to_string(),
            },
            ..Config::default()
        };
        assert!(config.site_clock().is_err());
    }
}
