//! Hub registry.
//!
//! Stage 2 of the pipeline. Turns facet clusters into the authoritative set of
//! hub pages: which hub URLs exist at all, and which of them are eligible for
//! indexing.
//!
//! ## Policy
//!
//! 1. A cluster is eligible only with at least [`MIN_HUB_MEMBERS`] listed items.
//!    Below the threshold its base hub still exists, so a page that loses
//!    items is served as `noindex` instead of disappearing.
//! 2. Per capped facet type, eligible clusters are ranked by member count
//!    (descending, ties by key) and only the top [`HUB_CAP_PER_TYPE`] get hubs.
//!    The rest land in [`RegistryReport::over_cap`] and have no page.
//!    Non-eligible hubs do not count against the cap.
//! 3. Category hubs are uncapped and also exist for categories known from
//!    unlisted items, with zero members.
//! 4. Each eligible hub with at least one in-stock item also gets an in-stock
//!    variant. Nothing else does.
//! 5. Formula tokens outside the recognized set never become hubs.
//!
//! ## Paths
//!
//! ```text
//! /hubs/category/dump-trucks/
//! /hubs/category/dump-trucks/formula/6x4/
//! /hubs/line/x3000/in-stock/
//! ```
//!
//! Segments follow the facet-type template, which exists in one orientation
//! only, so `/hubs/formula/6x4/category/dump-trucks/` is never a hub.
//!
//! The registry is immutable once built. A new inventory snapshot produces a
//! new registry that replaces this one wholesale.

use crate::slug;
use crate::types::{
    Facet, FacetCluster, FacetKey, FacetType, HUB_CAP_PER_TYPE, HubDefinition, IN_STOCK_SEGMENT,
    MIN_HUB_MEMBERS,
};
use log::info;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Clusters that did not become eligible hubs, kept for the operator report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryReport {
    pub below_threshold: Vec<FacetCluster>,
    pub over_cap: Vec<FacetCluster>,
    pub unrecognized_formula: Vec<FacetCluster>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRegistry {
    base_path: String,
    hubs: Vec<HubDefinition>,
    by_path: HashMap<String, usize>,
    report: RegistryReport,
}

impl HubRegistry {
    /// Build the hub set for one aggregation pass.
    pub fn build(clusters: &[FacetCluster], base_path: &str) -> Self {
        Self::build_with_categories(clusters, &[], base_path)
    }

    /// Like [`HubRegistry::build`], also creating empty (non-eligible) hubs
    /// for `known_categories` that currently have no listed items.
    ///
    /// Category pages exist as long as the category does; an empty one is
    /// served but not indexed.
    pub fn build_with_categories(
        clusters: &[FacetCluster],
        known_categories: &[String],
        base_path: &str,
    ) -> Self {
        let mut by_type: BTreeMap<FacetType, Vec<FacetCluster>> = BTreeMap::new();
        let mut report = RegistryReport::default();

        for cluster in clusters {
            if !formulas_recognized(cluster) {
                report.unrecognized_formula.push(cluster.clone());
                continue;
            }
            by_type
                .entry(cluster.facet_type)
                .or_default()
                .push(cluster.clone());
        }

        let categories = by_type.entry(FacetType::Category).or_default();
        for category in known_categories {
            let key = FacetKey::single(category.clone());
            if !categories.iter().any(|c| c.facet_key == key) {
                categories.push(FacetCluster {
                    facet_type: FacetType::Category,
                    facet_key: key,
                    member_count: 0,
                    in_stock_count: 0,
                });
            }
        }

        let mut hubs = Vec::new();
        for (facet_type, mut group) in by_type {
            group.sort_by(rank);
            let mut promoted = 0usize;

            for cluster in group {
                let eligible = cluster.member_count >= MIN_HUB_MEMBERS;
                if !eligible {
                    report.below_threshold.push(cluster.clone());
                } else if facet_type.is_capped() {
                    if promoted == HUB_CAP_PER_TYPE {
                        report.over_cap.push(cluster);
                        continue;
                    }
                    promoted += 1;
                }

                hubs.push(HubDefinition {
                    facet_type,
                    facet_values: cluster.facet_key.clone(),
                    is_in_stock_variant: false,
                    eligible,
                    member_count: cluster.member_count,
                    path: hub_path(base_path, facet_type, &cluster.facet_key, false),
                });
                if eligible && cluster.in_stock_count >= 1 {
                    hubs.push(HubDefinition {
                        facet_type,
                        facet_values: cluster.facet_key.clone(),
                        is_in_stock_variant: true,
                        eligible: true,
                        member_count: cluster.in_stock_count,
                        path: hub_path(base_path, facet_type, &cluster.facet_key, true),
                    });
                }
            }
        }

        let by_path = hubs
            .iter()
            .enumerate()
            .map(|(i, hub)| (hub.path.clone(), i))
            .collect();

        let registry = Self {
            base_path: base_path.to_string(),
            hubs,
            by_path,
            report,
        };
        info!(
            "hub registry: {} hubs, {} eligible, {} below threshold, {} over cap",
            registry.hubs.len(),
            registry.hubs.iter().filter(|h| h.eligible).count(),
            registry.report.below_threshold.len(),
            registry.report.over_cap.len()
        );
        registry
    }

    /// All hubs in precedence order; each base hub is followed by its in-stock variant.
    pub fn hubs(&self) -> &[HubDefinition] {
        &self.hubs
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    pub fn report(&self) -> &RegistryReport {
        &self.report
    }

    /// Exact lookup by canonical path.
    pub fn get(&self, canonical_path: &str) -> Option<&HubDefinition> {
        self.by_path.get(canonical_path).map(|&i| &self.hubs[i])
    }

    /// Match a request path to a hub.
    ///
    /// Values are normalized with the same functions the aggregator uses, so
    /// `/hubs/line/X3000` finds the `/hubs/line/x3000/` hub. A missing trailing
    /// slash is tolerated. Returns `None` for anything that is not a hub.
    pub fn resolve(&self, path: &str) -> Option<&HubDefinition> {
        let canonical = canonicalize_hub_path(&self.base_path, path)?;
        self.get(&canonical)
    }

    /// Number of eligible base hubs of one facet type.
    pub fn eligible_count(&self, facet_type: FacetType) -> usize {
        self.hubs
            .iter()
            .filter(|h| h.facet_type == facet_type && h.eligible && !h.is_in_stock_variant)
            .count()
    }
}

/// Member count descending, then key ascending.
fn rank(a: &FacetCluster, b: &FacetCluster) -> Ordering {
    b.member_count
        .cmp(&a.member_count)
        .then_with(|| a.facet_key.cmp(&b.facet_key))
}

fn formulas_recognized(cluster: &FacetCluster) -> bool {
    cluster
        .facet_type
        .facets()
        .iter()
        .zip(cluster.facet_key.values())
        .all(|(facet, value)| *facet != Facet::Formula || slug::is_recognized_formula(value))
}

/// Compose the canonical path of a hub.
pub fn hub_path(base_path: &str, facet_type: FacetType, key: &FacetKey, in_stock: bool) -> String {
    let mut path = base_path.to_string();
    for (facet, value) in facet_type.facets().iter().zip(key.values()) {
        path.push_str(facet.segment());
        path.push('/');
        path.push_str(value);
        path.push('/');
    }
    if in_stock {
        path.push_str(IN_STOCK_SEGMENT);
        path.push('/');
    }
    path
}

/// Parse a request path under `base_path` into a canonical hub path.
///
/// Checks shape only (known segments, a supported template, values that
/// normalize); whether the hub exists is up to the registry.
pub fn canonicalize_hub_path(base_path: &str, path: &str) -> Option<String> {
    let rest = path
        .strip_prefix(base_path)
        .or_else(|| (format!("{path}/") == base_path).then_some(""))?;
    let mut parts = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect::<Option<Vec<_>>>()?;

    // Facet segments come in pairs, so only an odd trailing segment can be
    // the variant marker. A facet value may itself be `in-stock`.
    let in_stock = parts.len() % 2 == 1 && parts.last().is_some_and(|s| s == IN_STOCK_SEGMENT);
    if in_stock {
        parts.pop();
    }
    if parts.is_empty() || parts.len() % 2 != 0 || parts.len() > 4 {
        return None;
    }

    let mut facets = Vec::with_capacity(2);
    let mut values = Vec::with_capacity(2);
    for chunk in parts.chunks(2) {
        let facet = Facet::from_segment(&chunk[0])?;
        values.push(normalize_value(facet, &chunk[1])?);
        facets.push(facet);
    }
    let facet_type = FacetType::from_facets(&facets)?;

    Some(hub_path(base_path, facet_type, &FacetKey(values), in_stock))
}

/// Percent-decode one path segment. `None` if it is not valid UTF-8.
pub(crate) fn decode_segment(segment: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(segment).decode_utf8().ok()
}

fn normalize_value(facet: Facet, raw: &str) -> Option<String> {
    match facet {
        Facet::Category => slug::normalize_category(raw).ok(),
        Facet::Series => slug::normalize_series(raw).ok(),
        Facet::Formula => slug::normalize_formula(raw).ok(),
        Facet::Engine => slug::normalize_engine(raw).ok(),
    }
}
