//! Immutable, versioned registry snapshots.
//!
//! A [`Snapshot`] bundles everything request handling needs from one
//! inventory read: the hub registry, the product index, the aggregation
//! counters and a content version. It is built completely before anyone sees
//! it and never changes afterwards.
//!
//! [`SnapshotHandle`] is the shared "current registry". Readers clone an
//! `Arc` out of it and keep using that snapshot for as long as they like; a
//! refresh builds the next snapshot off to the side and swaps the reference in
//! one short write section. A reader therefore sees either the old registry
//! or the new one, never a mix.
//!
//! If a refresh fails (the inventory cannot be read), the previous snapshot
//! stays current. A snapshot older than the configured refresh interval is
//! still served; [`SnapshotHandle::current_checked`] reports it as stale.

use crate::aggregate::{self, Aggregation};
use crate::classify::Target;
use crate::config::SiteConfig;
use crate::inventory::{InventoryError, InventoryItem, InventorySource};
use crate::registry::{self, HubRegistry};
use crate::slug;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// A product page known to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPage {
    pub id: u64,
    pub slug: String,
    /// Canonical path, `{path_prefix}{slug}/`.
    pub path: String,
    /// Active and published. Unlisted products are served but not indexed.
    pub listed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One complete, immutable view of the derived page set.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Hex SHA-256 over the hub set and product index.
    pub version: String,
    pub built_at: DateTime<Utc>,
    registry: HubRegistry,
    aggregation: Aggregation,
    products: BTreeMap<String, ProductPage>,
    product_prefix: String,
}

impl Snapshot {
    /// Aggregate, build the registry and index products for one inventory read.
    pub fn build(items: &[InventoryItem], config: &SiteConfig, built_at: DateTime<Utc>) -> Self {
        let aggregation = aggregate::aggregate_with_stats(items);
        let known_categories = known_categories(items);
        let registry = HubRegistry::build_with_categories(
            &aggregation.clusters,
            &known_categories,
            &config.hubs.base_path,
        );
        let products = index_products(items, &config.products.path_prefix);
        let version = fingerprint(&registry, &products);

        info!(
            "snapshot {}: {} hubs, {} products",
            &version[..12],
            registry.len(),
            products.len()
        );

        Self {
            version,
            built_at,
            registry,
            aggregation,
            products,
            product_prefix: config.products.path_prefix.clone(),
        }
    }

    pub fn registry(&self) -> &HubRegistry {
        &self.registry
    }

    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// Products ordered by path.
    pub fn products(&self) -> impl Iterator<Item = &ProductPage> {
        self.products.values()
    }

    pub fn product(&self, canonical_path: &str) -> Option<&ProductPage> {
        self.products.get(canonical_path)
    }

    /// Match a request path to a product or a hub. Products are checked first.
    ///
    /// Segments are percent-decoded and product paths tolerate a missing
    /// trailing slash. Hub paths additionally normalize their facet values
    /// (see [`HubRegistry::resolve`]).
    pub fn resolve(&self, path: &str) -> Option<Target<'_>> {
        if let Some(rest) = path.strip_prefix(self.product_prefix.as_str()) {
            let rest = rest.trim_end_matches('/');
            if rest.is_empty() || rest.contains('/') {
                return None;
            }
            let slug = registry::decode_segment(rest)?;
            let canonical = format!("{}{slug}/", self.product_prefix);
            return self.products.get(&canonical).map(Target::Product);
        }
        self.registry.resolve(path).map(Target::Hub)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.built_at).to_std().unwrap_or(Duration::ZERO)
    }
}

fn known_categories(items: &[InventoryItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.category_slug.as_deref())
        .filter_map(|raw| slug::normalize_category(raw).ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn index_products(items: &[InventoryItem], prefix: &str) -> BTreeMap<String, ProductPage> {
    let mut sorted: Vec<&InventoryItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.id);

    let mut products: BTreeMap<String, ProductPage> = BTreeMap::new();
    for item in sorted {
        let Ok(slug) = slug::normalize_product_slug(&item.slug) else {
            warn!("item {}: unusable product slug {:?}", item.id, item.slug);
            continue;
        };
        let path = format!("{prefix}{slug}/");
        if let Some(existing) = products.get(&path) {
            warn!(
                "items {} and {} share product path {path}; keeping {}",
                existing.id, item.id, existing.id
            );
            continue;
        }
        products.insert(
            path.clone(),
            ProductPage {
                id: item.id,
                slug,
                path,
                listed: item.is_listed(),
                updated_at: item.updated_at,
            },
        );
    }
    products
}

/// SHA-256 over everything a reader can observe.
fn fingerprint(registry: &HubRegistry, products: &BTreeMap<String, ProductPage>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"hubs\0");
    for hub in registry.hubs() {
        hasher.update(hub.path.as_bytes());
        hasher.update([hub.eligible as u8, hub.is_in_stock_variant as u8]);
        hasher.update(hub.member_count.to_le_bytes());
    }
    hasher.update(b"products\0");
    for product in products.values() {
        hasher.update(product.path.as_bytes());
        hasher.update(product.id.to_le_bytes());
        hasher.update([product.listed as u8]);
        if let Some(ts) = product.updated_at {
            hasher.update(ts.timestamp().to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

// =============================================================================
// Shared handle
// =============================================================================

/// The current snapshot is older than the expected refresh interval.
///
/// Not an error: requests keep being served from the last good snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleRegistryWarning {
    pub age: Duration,
    pub interval: Duration,
}

impl fmt::Display for StaleRegistryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hub registry is {}s old (expected refresh every {}s)",
            self.age.as_secs(),
            self.interval.as_secs()
        )
    }
}

/// Shared pointer to the current snapshot.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
    refresh_interval: Duration,
}

impl SnapshotHandle {
    pub fn new(initial: Snapshot, refresh_interval: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            refresh_interval,
        }
    }

    /// The snapshot to use for one request or one sitemap run.
    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// [`SnapshotHandle::current`], plus a warning if it is overdue for a refresh.
    pub fn current_checked(
        &self,
        now: DateTime<Utc>,
    ) -> (Arc<Snapshot>, Option<StaleRegistryWarning>) {
        let snapshot = self.current();
        let age = snapshot.age(now);
        let stale = (age > self.refresh_interval).then(|| {
            let warning = StaleRegistryWarning {
                age,
                interval: self.refresh_interval,
            };
            warn!("{warning}");
            warning
        });
        (snapshot, stale)
    }

    /// Replace the current snapshot. Returns the previous one.
    pub fn swap(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Read the inventory, build a new snapshot and swap it in.
    ///
    /// On a failed read the current snapshot is kept and the error returned.
    pub fn refresh<S: InventorySource + ?Sized>(
        &self,
        source: &S,
        config: &SiteConfig,
        now: DateTime<Utc>,
    ) -> Result<Arc<Snapshot>, InventoryError> {
        let items = source.snapshot().map_err(|e| {
            warn!("refresh failed, keeping snapshot {}: {e}", self.current().version);
            e
        })?;
        let next = Snapshot::build(&items, config, now);
        let unchanged = next.version == self.current().version;
        self.swap(next);
        if unchanged {
            info!("refresh produced an identical registry");
        }
        Ok(self.current())
    }
}
