//! Shared test utilities for the catalog-hubs test suite.
//!
//! Provides an inventory item builder, the checked-in fixture inventory, and
//! lookup helpers that panic with a listing of what *was* there on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let items = vec![
//!     item(1).category("dump-trucks").formula("6×4").in_stock().build(),
//!     item(2).category("dump-trucks").formula("6x4").build(),
//! ];
//! let clusters = aggregate(&items);
//! let c = find_cluster(&clusters, FacetType::Formula, &["6x4"]);
//! assert_eq!(c.member_count, 2);
//! ```

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::inventory::{self, InventoryItem};
use crate::types::{FacetCluster, FacetType, HubDefinition};

// =========================================================================
// Item builder
// =========================================================================

pub struct ItemBuilder(InventoryItem);

/// Start a listed, out-of-stock item with no facets and slug `item-{id}`.
pub fn item(id: u64) -> ItemBuilder {
    ItemBuilder(InventoryItem {
        id,
        slug: format!("item-{id}"),
        category_slug: None,
        series_raw: None,
        wheel_formula_raw: None,
        engine_raw: None,
        in_stock: false,
        active: true,
        public: true,
        updated_at: None,
    })
}

impl ItemBuilder {
    pub fn slug(mut self, slug: &str) -> Self {
        self.0.slug = slug.to_string();
        self
    }

    pub fn category(mut self, raw: &str) -> Self {
        self.0.category_slug = Some(raw.to_string());
        self
    }

    pub fn series(mut self, raw: &str) -> Self {
        self.0.series_raw = Some(raw.to_string());
        self
    }

    pub fn formula(mut self, raw: &str) -> Self {
        self.0.wheel_formula_raw = Some(raw.to_string());
        self
    }

    pub fn engine(mut self, raw: &str) -> Self {
        self.0.engine_raw = Some(raw.to_string());
        self
    }

    pub fn in_stock(mut self) -> Self {
        self.0.in_stock = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.0.active = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.0.public = false;
        self
    }

    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.0.updated_at = Some(at);
        self
    }

    pub fn build(self) -> InventoryItem {
        self.0
    }
}

// =========================================================================
// Fixtures
// =========================================================================

/// Load `fixtures/inventory.json`.
pub fn fixture_inventory() -> Vec<InventoryItem> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/inventory.json");
    inventory::load_json(&path).unwrap()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a cluster by type and key. Panics if not found.
pub fn find_cluster<'a>(
    clusters: &'a [FacetCluster],
    facet_type: FacetType,
    key: &[&str],
) -> &'a FacetCluster {
    clusters
        .iter()
        .find(|c| c.facet_type == facet_type && c.facet_key.values() == key)
        .unwrap_or_else(|| {
            let keys: Vec<String> = clusters
                .iter()
                .filter(|c| c.facet_type == facet_type)
                .map(|c| c.facet_key.to_string())
                .collect();
            panic!("{facet_type} cluster {key:?} not found. Available: {keys:?}")
        })
}

/// Find a hub by canonical path. Panics if not found.
pub fn find_hub<'a>(hubs: &'a [HubDefinition], path: &str) -> &'a HubDefinition {
    hubs.iter().find(|h| h.path == path).unwrap_or_else(|| {
        let paths: Vec<&str> = hubs.iter().map(|h| h.path.as_str()).collect();
        panic!("hub '{path}' not found. Available: {paths:?}")
    })
}
