//! Read-only view over the product catalog.
//!
//! The catalog itself lives outside this crate. Everything downstream works
//! on a snapshot: a `Vec<InventoryItem>` read once per build cycle through an
//! [`InventorySource`]. Nothing here writes back.
//!
//! ## Snapshot file
//!
//! The CLI reads a JSON array exported from the catalog:
//!
//! ```json
//! [
//!   {
//!     "id": 17,
//!     "slug": "shacman-x3000-6x4-dump",
//!     "category_slug": "dump-trucks",
//!     "series_raw": "X3000",
//!     "wheel_formula_raw": "6×4",
//!     "engine_raw": "WP13.550E501",
//!     "in_stock": true,
//!     "updated_at": "2026-09-30T12:00:00Z"
//!   }
//! ]
//! ```
//!
//! `active` and `public` default to `true`; every facet field is optional so a
//! malformed row degrades to fewer clusters instead of failing the load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One product row as seen by the facet engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: u64,
    /// Product URL slug.
    pub slug: String,
    #[serde(default)]
    pub category_slug: Option<String>,
    /// Brand line text, e.g. `X3000`.
    #[serde(default)]
    pub series_raw: Option<String>,
    #[serde(default)]
    pub wheel_formula_raw: Option<String>,
    #[serde(default)]
    pub engine_raw: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Published on the storefront.
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl InventoryItem {
    /// Active and published. Unlisted items are excluded from every cluster.
    pub fn is_listed(&self) -> bool {
        self.active && self.public
    }
}

/// Anything that can hand out a full inventory snapshot.
pub trait InventorySource {
    fn snapshot(&self) -> Result<Vec<InventoryItem>, InventoryError>;
}

impl InventorySource for Vec<InventoryItem> {
    fn snapshot(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        Ok(self.clone())
    }
}

/// Inventory exported to a JSON file.
#[derive(Debug, Clone)]
pub struct JsonInventory {
    path: PathBuf,
}

impl JsonInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InventorySource for JsonInventory {
    fn snapshot(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        load_json(&self.path)
    }
}

/// Read a JSON array of inventory items.
pub fn load_json(path: &Path) -> Result<Vec<InventoryItem>, InventoryError> {
    let content = fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InventoryError::Json {
        path: path.to_path_buf(),
        source,
    })
}
