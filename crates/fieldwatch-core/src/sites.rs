//! The catalog of monitored sites.
//!
//! A [`SiteRegistry`] is built once at startup from a versioned list of
//! [`SiteDescriptor`]s. Retired installations stay in the table with
//! `active = false` so their history remains addressable.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Schema version of the site table understood by this build.
pub const SITE_TABLE_VERSION: u32 = 1;

/// Irrigation category of a site, selecting its record schema and store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Air-line installation.
    #[default]
    Air,
    /// Drip-line installation with soil probes.
    Drip,
}

impl Category {
    /// Returns the category as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Drip => "drip",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A monitored installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    /// Unique site code, also the partition key in the stores.
    pub code: String,
    /// Human-readable name used in reports.
    pub display_name: String,
    /// Irrigation category.
    pub category: Category,
    /// Whether the site is currently monitored.
    pub active: bool,
}

impl SiteDescriptor {
    /// Creates an active site descriptor.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            category,
            active: true,
        }
    }

    /// Sets whether the site is active.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// A descriptor for a code the registry does not know.
    ///
    /// Falls back to the air category and uses the code as display name.
    #[must_use]
    pub fn unregistered(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            display_name: code.clone(),
            code,
            category: Category::Air,
            active: false,
        }
    }
}

/// Serialized form of the site table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTable {
    /// Schema version.
    #[serde(default = "default_table_version")]
    pub version: u32,
    /// Site descriptors in reporting order.
    pub sites: Vec<SiteDescriptor>,
}

const fn default_table_version() -> u32 {
    SITE_TABLE_VERSION
}

/// Immutable, ordered catalog of sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<SiteDescriptor>,
}

impl SiteRegistry {
    /// Builds a registry, preserving the given order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateSite` if two descriptors share a code, or
    /// `CoreError::InvalidConfig` if a code is empty.
    pub fn new(sites: Vec<SiteDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for site in &sites {
            if site.code.trim().is_empty() {
                return Err(CoreError::InvalidConfig {
                    reason: "site code cannot be empty".to_string(),
                });
            }
            if !seen.insert(site.code.as_str()) {
                return Err(CoreError::DuplicateSite {
                    code: site.code.clone(),
                });
            }
        }
        debug!(sites = sites.len(), "site registry built");
        Ok(Self { sites })
    }

    /// Builds a registry from a serialized site table.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` for an unsupported table version, or
    /// any error from [`SiteRegistry::new`].
    pub fn from_table(table: SiteTable) -> Result<Self> {
        if table.version != SITE_TABLE_VERSION {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "unsupported site table version {} (expected {SITE_TABLE_VERSION})",
                    table.version
                ),
            });
        }
        Self::new(table.sites)
    }

    /// The deployed fleet.
    #[must_use]
    pub fn fleet() -> Self {
        Self {
            sites: vec![
                SiteDescriptor::new("Sakti", "Sakti", Category::Air),
                SiteDescriptor::new("Stakmo", "Stakmo", Category::Air),
                SiteDescriptor::new("Skuast", "Skuast", Category::Drip),
                SiteDescriptor::new("Surya", "Surya AIR", Category::Air).active(false),
                SiteDescriptor::new("Ayee", "Ayee", Category::Air).active(false),
                SiteDescriptor::new("Li", "Likir", Category::Air).active(false),
                SiteDescriptor::new("Ig", "Igoo", Category::Air).active(false),
                SiteDescriptor::new("Shey", "Shey", Category::Air).active(false),
                SiteDescriptor::new("Te", "Test", Category::Drip).active(false),
            ],
        }
    }

    /// Returns the serialized form of this registry.
    #[must_use]
    pub fn to_table(&self) -> SiteTable {
        SiteTable {
            version: SITE_TABLE_VERSION,
            sites: self.sites.clone(),
        }
    }

    /// Active sites in registry order.
    pub fn active_sites(&self) -> impl Iterator<Item = &SiteDescriptor> {
        self.sites.iter().filter(|s| s.active)
    }

    /// Codes of the active sites in registry order.
    #[must_use]
    pub fn active_codes(&self) -> Vec<String> {
        self.active_sites().map(|s| s.code.clone()).collect()
    }

    /// Looks up a site by code, active or not.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&SiteDescriptor> {
        self.sites.iter().find(|s| s.code == code)
    }

    /// Looks up an active site by code.
    #[must_use]
    pub fn get_active(&self, code: &str) -> Option<&SiteDescriptor> {
        self.get(code).filter(|s| s.active)
    }

    /// Returns the descriptor for a code, or an unregistered placeholder.
    #[must_use]
    pub fn describe(&self, code: &str) -> SiteDescriptor {
        self.get(code)
            .cloned()
            .unwrap_or_else(|| SiteDescriptor::unregistered(code))
    }

    /// Store category for a site. Unknown codes route to the air store.
    #[must_use]
    pub fn store_for(&self, code: &str) -> Category {
        self.get(code).map_or(Category::Air, |s| s.category)
    }

    /// Total number of sites, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true if the registry has no sites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::fleet()
    }
}
