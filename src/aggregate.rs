//! Facet aggregation.
//!
//! Stage 1 of the hub pipeline. Scans one inventory snapshot and counts, for
//! every facet value and every supported facet pair, how many listed items
//! carry it and how many of those are in stock.
//!
//! ## What counts
//!
//! - Only listed items (active and published). Everything else is excluded
//!   outright, not down-weighted.
//! - Each facet is normalized independently. A value that fails normalization
//!   drops out of that facet's clusters (and every pair using it); the item
//!   still counts toward the facets that succeed.
//! - Pairs are the fixed set in [`FacetType`]; no N-way combinations.
//!
//! ## Determinism
//!
//! The pass is a rayon fold/reduce into ordered maps. Counts are sums, so the
//! result is independent of how the work was split, and the output is sorted
//! by `(facet_type, facet_key)`. Running it twice on the same snapshot gives
//! identical clusters.

use crate::inventory::InventoryItem;
use crate::slug;
use crate::types::{Facet, FacetCluster, FacetKey, FacetType};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Normalized facet values of one item. `None` means missing or rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFacets {
    pub category: Option<String>,
    pub series: Option<String>,
    pub formula: Option<String>,
    pub engine: Option<String>,
}

/// Why a facet value did not make it into [`ItemFacets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    Missing,
    Rejected,
}

impl ItemFacets {
    /// Normalize the facet fields of `item`.
    ///
    /// This is the only place raw item fields become slugs; the sitemap
    /// builder goes through it too when attributing `lastmod`.
    pub fn of(item: &InventoryItem) -> Self {
        Self::with_skips(item).0
    }

    /// Like [`ItemFacets::of`], also reporting which facets were skipped.
    pub fn with_skips(item: &InventoryItem) -> (Self, Vec<(Facet, Skipped)>) {
        let mut skips = Vec::new();
        let mut take = |facet: Facet, raw: Option<&String>, result: Option<String>| {
            match (raw, result) {
                (None, _) => {
                    skips.push((facet, Skipped::Missing));
                    None
                }
                (Some(_), None) => {
                    skips.push((facet, Skipped::Rejected));
                    None
                }
                (Some(_), Some(value)) => Some(value),
            }
        };

        let category = take(
            Facet::Category,
            item.category_slug.as_ref(),
            item.category_slug
                .as_deref()
                .and_then(|raw| log_skip(item, Facet::Category, slug::normalize_category(raw))),
        );
        let series = take(
            Facet::Series,
            item.series_raw.as_ref(),
            item.series_raw
                .as_deref()
                .and_then(|raw| log_skip(item, Facet::Series, slug::normalize_series(raw))),
        );
        let formula = take(
            Facet::Formula,
            item.wheel_formula_raw.as_ref(),
            item.wheel_formula_raw
                .as_deref()
                .and_then(|raw| log_skip(item, Facet::Formula, slug::normalize_formula(raw))),
        );
        let engine = take(
            Facet::Engine,
            item.engine_raw.as_ref(),
            item.engine_raw
                .as_deref()
                .and_then(|raw| log_skip(item, Facet::Engine, slug::normalize_engine(raw))),
        );

        (
            Self {
                category,
                series,
                formula,
                engine,
            },
            skips,
        )
    }

    pub fn get(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Category => self.category.as_deref(),
            Facet::Series => self.series.as_deref(),
            Facet::Formula => self.formula.as_deref(),
            Facet::Engine => self.engine.as_deref(),
        }
    }

    /// Key of this item under `facet_type`, if every facet in its template is present.
    pub fn key(&self, facet_type: FacetType) -> Option<FacetKey> {
        facet_type
            .facets()
            .iter()
            .map(|f| self.get(*f).map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(FacetKey)
    }

    /// Every `(facet_type, key)` this item contributes to.
    pub fn keys(&self) -> Vec<(FacetType, FacetKey)> {
        FacetType::ALL
            .into_iter()
            .filter_map(|t| self.key(t).map(|k| (t, k)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Facet::ALL.into_iter().all(|f| self.get(f).is_none())
    }
}

fn log_skip<E: std::fmt::Display>(
    item: &InventoryItem,
    facet: Facet,
    result: Result<String, E>,
) -> Option<String> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("item {}: {facet} skipped: {e}", item.id);
            None
        }
    }
}

/// Output of one aggregation pass, with bookkeeping for the operator report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub clusters: Vec<FacetCluster>,
    pub listed_items: u32,
    pub excluded_items: u32,
    /// Listed items with no value for a facet.
    pub missing: BTreeMap<Facet, u32>,
    /// Listed items whose value failed normalization.
    pub rejected: BTreeMap<Facet, u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    members: u32,
    in_stock: u32,
}

#[derive(Debug, Default)]
struct Tally {
    counts: BTreeMap<(FacetType, FacetKey), Counts>,
    listed: u32,
    excluded: u32,
    missing: BTreeMap<Facet, u32>,
    rejected: BTreeMap<Facet, u32>,
}

impl Tally {
    fn add(mut self, item: &InventoryItem) -> Self {
        if !item.is_listed() {
            self.excluded += 1;
            return self;
        }
        self.listed += 1;

        let (facets, skips) = ItemFacets::with_skips(item);
        for (facet, why) in skips {
            let bucket = match why {
                Skipped::Missing => &mut self.missing,
                Skipped::Rejected => &mut self.rejected,
            };
            *bucket.entry(facet).or_default() += 1;
        }

        for key in facets.keys() {
            let counts = self.counts.entry(key).or_default();
            counts.members += 1;
            if item.in_stock {
                counts.in_stock += 1;
            }
        }
        self
    }

    fn merge(mut self, other: Tally) -> Self {
        for (key, c) in other.counts {
            let counts = self.counts.entry(key).or_default();
            counts.members += c.members;
            counts.in_stock += c.in_stock;
        }
        for (facet, n) in other.missing {
            *self.missing.entry(facet).or_default() += n;
        }
        for (facet, n) in other.rejected {
            *self.rejected.entry(facet).or_default() += n;
        }
        self.listed += other.listed;
        self.excluded += other.excluded;
        self
    }
}

/// Count every facet cluster in the snapshot.
pub fn aggregate(items: &[InventoryItem]) -> Vec<FacetCluster> {
    aggregate_with_stats(items).clusters
}

/// [`aggregate`], keeping the skip counters.
pub fn aggregate_with_stats(items: &[InventoryItem]) -> Aggregation {
    let tally = items
        .par_iter()
        .fold(Tally::default, Tally::add)
        .reduce(Tally::default, Tally::merge);

    let clusters: Vec<FacetCluster> = tally
        .counts
        .into_iter()
        .map(|((facet_type, facet_key), c)| FacetCluster {
            facet_type,
            facet_key,
            member_count: c.members,
            in_stock_count: c.in_stock,
        })
        .collect();

    info!(
        "aggregated {} listed items into {} clusters ({} excluded)",
        tally.listed,
        clusters.len(),
        tally.excluded
    );

    Aggregation {
        clusters,
        listed_items: tally.listed,
        excluded_items: tally.excluded,
        missing: tally.missing,
        rejected: tally.rejected,
    }
}

// =============================================================================
// Duplicate audit
// =============================================================================

/// Listed items that share the exact same facet signature.
///
/// These are candidates for merging or for picking one canonical product:
/// their pages differ only in copy, never in facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// `category / line / formula / engine`, `-` for a missing facet.
    pub signature: String,
    pub ids: Vec<u64>,
}

/// Group listed items by facet signature, keeping groups of at least `min_group`.
///
/// Ordered by group size (largest first), then signature.
pub fn duplicate_groups(items: &[InventoryItem], min_group: usize) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for item in items.iter().filter(|i| i.is_listed()) {
        let facets = ItemFacets::of(item);
        if facets.is_empty() {
            continue;
        }
        let signature = Facet::ALL
            .into_iter()
            .map(|f| facets.get(f).unwrap_or("-"))
            .collect::<Vec<_>>()
            .join(" / ");
        groups.entry(signature).or_default().push(item.id);
    }

    let mut out: Vec<DuplicateGroup> = groups
        .into_iter()
        .filter(|(_, ids)| ids.len() >= min_group.max(2))
        .map(|(signature, mut ids)| {
            ids.sort_unstable();
            DuplicateGroup { signature, ids }
        })
        .collect();
    out.sort_by(|a, b| {
        b.ids
            .len()
            .cmp(&a.ids.len())
            .then_with(|| a.signature.cmp(&b.signature))
    });
    out
}
