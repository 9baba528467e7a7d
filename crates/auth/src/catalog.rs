//! Ordered catalog of navigable modules.
//!
//! Order is priority: the first entry a role can view is where that role
//! lands after login and where the dashboard falls back to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use adminpanel_core::{DomainError, DomainResult};

/// Module key of the landing dashboard.
pub const DASHBOARD: &str = "dashboard";

const STANDARD_MODULES: &[(&str, &str)] = &[
    (DASHBOARD, "/"),
    ("admins", "/admins"),
    ("roles", "/roles"),
    ("users", "/users"),
    ("user-credits", "/user-credits"),
    ("credits", "/credits"),
    ("categories", "/categories"),
    ("banners", "/banners"),
    ("food-orders", "/food-orders"),
    ("food-details", "/food-details"),
    ("spa-packages", "/spa-packages"),
    ("spa-bookings", "/spa-bookings"),
    ("drivers", "/drivers"),
    ("driver-payments", "/driver-payments"),
    ("attendance", "/attendance"),
    ("reports", "/reports"),
    ("settings", "/settings"),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub module: String,
    pub path: String,
}

impl CatalogEntry {
    pub fn new(module: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            path: path.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CatalogEntry>", into = "Vec<CatalogEntry>")]
pub struct ModuleCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModuleCatalog {
    /// Build a catalog, rejecting duplicate module keys and paths that are
    /// not absolute.
    pub fn new(entries: Vec<CatalogEntry>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.module.is_empty() {
                return Err(DomainError::validation("catalog entry with empty module key"));
            }
            if !entry.path.starts_with('/') {
                return Err(DomainError::validation(format!(
                    "catalog path for '{}' must start with '/': {:?}",
                    entry.module, entry.path
                )));
            }
            if !seen.insert(entry.module.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate catalog module '{}'",
                    entry.module
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The console's built-in catalog.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_MODULES
                .iter()
                .map(|(module, path)| CatalogEntry::new(*module, *path))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn get(&self, module: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.module == module)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<CatalogEntry>> for ModuleCatalog {
    type Error = DomainError;

    fn try_from(entries: Vec<CatalogEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ModuleCatalog> for Vec<CatalogEntry> {
    fn from(catalog: ModuleCatalog) -> Self {
        catalog.entries
    }
}
