//! Sitemap builder.
//!
//! Enumerates every hub and product in one snapshot, keeps those whose clean
//! request (no query string) classifies as `index`, and attaches a `lastmod`
//! taken from the inventory items backing each page.
//!
//! Hub entries come first in registry order, then products ordered by path,
//! so the same snapshot and inventory always give the same list.

use crate::aggregate::ItemFacets;
use crate::classify::{Target, classify};
use crate::inventory::InventoryItem;
use crate::snapshot::Snapshot;
use crate::types::{FacetKey, FacetType};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("cannot build URL for {path} on {base}: {source}")]
    Url {
        base: String,
        path: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapEntry {
    /// Absolute URL without query string.
    pub url: String,
    pub lastmod: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Latest {
    all: Option<DateTime<Utc>>,
    in_stock: Option<DateTime<Utc>>,
}

/// Build the sitemap for one snapshot.
///
/// `inventory` should be the item list the snapshot was built from; it only
/// supplies `lastmod` dates.
pub fn build_sitemap(
    snapshot: &Snapshot,
    inventory: &[InventoryItem],
    site_url: &Url,
) -> Result<Vec<SitemapEntry>, SitemapError> {
    let latest = latest_updates(inventory);
    let mut entries = Vec::new();

    for hub in snapshot.registry().hubs() {
        if !classify(&Target::Hub(hub), "").robots.index {
            continue;
        }
        let lastmod = latest
            .get(&(hub.facet_type, hub.facet_values.clone()))
            .and_then(|l| if hub.is_in_stock_variant { l.in_stock } else { l.all });
        entries.push(SitemapEntry {
            url: absolute(site_url, &hub.path)?,
            lastmod,
        });
    }

    for product in snapshot.products() {
        if !classify(&Target::Product(product), "").robots.index {
            continue;
        }
        entries.push(SitemapEntry {
            url: absolute(site_url, &product.path)?,
            lastmod: product.updated_at,
        });
    }

    info!("sitemap: {} entries", entries.len());
    Ok(entries)
}

/// Newest `updated_at` per cluster key, over listed items.
fn latest_updates(inventory: &[InventoryItem]) -> BTreeMap<(FacetType, FacetKey), Latest> {
    let mut latest: BTreeMap<(FacetType, FacetKey), Latest> = BTreeMap::new();
    for item in inventory.iter().filter(|i| i.is_listed()) {
        let Some(updated) = item.updated_at else {
            continue;
        };
        for key in ItemFacets::of(item).keys() {
            let entry = latest.entry(key).or_default();
            entry.all = entry.all.max(Some(updated));
            if item.in_stock {
                entry.in_stock = entry.in_stock.max(Some(updated));
            }
        }
    }
    latest
}

fn absolute(site_url: &Url, path: &str) -> Result<String, SitemapError> {
    site_url
        .join(path)
        .map(String::from)
        .map_err(|source| SitemapError::Url {
            base: site_url.to_string(),
            path: path.to_string(),
            source,
        })
}
