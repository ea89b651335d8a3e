//! CLI output formatting for all pipeline stages.
//!
//! # Page-First Display
//!
//! Output is organized around pages, not clusters. Every hub line leads with
//! its canonical path, the one thing an operator can paste into a browser,
//! followed by counts and flags. Cluster keys appear as secondary context.
//!
//! # Output Format
//!
//! ## Hubs
//!
//! ```text
//! category
//! 001 /hubs/category/dump-trucks/ (6 items)
//! 002 /hubs/category/dump-trucks/in-stock/ (3 items)
//! 003 /hubs/category/cranes/ (1 item) [not eligible]
//!
//! 18 hubs, 15 eligible
//! ```
//!
//! ## Classify
//!
//! ```text
//! /hubs/line/x3000/?page=3&utm_source=ads
//!     Status: 200
//!     Robots: noindex,follow
//!     Canonical: /hubs/line/x3000/
//!     Structured data: no
//!     Rule: non-canonical query
//!     Tracking: utm_source
//! ```
//!
//! ## Report
//!
//! ```text
//! Inventory
//!     24 listed, 2 excluded
//!     Missing: engine 3
//!
//! Facet types
//!     category×line     5 clusters, 3 hubs, 2 below threshold
//!     ...
//!
//! Duplicate groups
//! 001 dump-trucks / x3000 / 6x4 / wp13-550e501 (3 items)
//!     ids: 17, 18, 22
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::aggregate::DuplicateGroup;
use crate::classify::{IndexabilityDecision, QueryParams};
use crate::registry::HubRegistry;
use crate::sitemap::SitemapEntry;
use crate::snapshot::{Snapshot, StaleRegistryWarning};
use crate::types::{Facet, FacetCluster, FacetType, HubDefinition};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn items(n: u32) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{n} items")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// One hub line: index, path, backing count and flags.
///
/// ```text
/// 001 /hubs/line/x3000/ (5 items)
/// 002 /hubs/category/cranes/ (1 item) [not eligible]
/// ```
fn hub_line(index: usize, hub: &HubDefinition) -> String {
    let flag = if hub.eligible { "" } else { " [not eligible]" };
    format!(
        "{} {} ({}){}",
        format_index(index),
        hub.path,
        items(hub.member_count),
        flag
    )
}

fn cluster_line(cluster: &FacetCluster) -> String {
    format!(
        "{} ({}, {} in stock)",
        cluster.facet_key,
        items(cluster.member_count),
        cluster.in_stock_count
    )
}

// ============================================================================
// Hubs
// ============================================================================

/// Format the hub list grouped by facet type, in registry order.
pub fn format_hubs(registry: &HubRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<FacetType> = None;
    let mut index = 0;

    for hub in registry.hubs() {
        if current != Some(hub.facet_type) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(hub.facet_type.label());
            current = Some(hub.facet_type);
            index = 0;
        }
        index += 1;
        lines.push(hub_line(index, hub));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    let eligible = registry.hubs().iter().filter(|h| h.eligible).count();
    lines.push(format!("{} hubs, {} eligible", registry.len(), eligible));
    lines
}

pub fn print_hubs(registry: &HubRegistry) {
    for line in format_hubs(registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Classify
// ============================================================================

/// Format one decision with the reasons behind it.
pub fn format_decision(
    request: &str,
    query: &str,
    decision: &IndexabilityDecision,
) -> Vec<String> {
    let params = QueryParams::parse(query);
    let mut lines = vec![
        request.to_string(),
        format!("{}Status: {}", indent(1), decision.http_status()),
        format!("{}Robots: {}", indent(1), decision.robots),
        format!("{}Canonical: {}", indent(1), decision.canonical_path),
        format!(
            "{}Structured data: {}",
            indent(1),
            yes_no(decision.emit_structured_data)
        ),
        format!("{}Rule: {}", indent(1), decision.rule),
    ];

    let tracking: Vec<&str> = params.tracking().collect();
    if !tracking.is_empty() {
        lines.push(format!("{}Tracking: {}", indent(1), tracking.join(", ")));
    }
    let other: Vec<&str> = params
        .foreign
        .iter()
        .map(String::as_str)
        .filter(|name| !tracking.contains(name))
        .collect();
    if !other.is_empty() {
        lines.push(format!("{}Other parameters: {}", indent(1), other.join(", ")));
    }
    if params.bad_page {
        lines.push(format!("{}Invalid page parameter", indent(1)));
    }
    lines
}

pub fn print_decision(request: &str, query: &str, decision: &IndexabilityDecision) {
    for line in format_decision(request, query, decision) {
        println!("{}", line);
    }
}

// ============================================================================
// Sitemap
// ============================================================================

/// Format sitemap entries, one per line, with `lastmod` when known.
pub fn format_sitemap(entries: &[SitemapEntry]) -> Vec<String> {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| match e.lastmod {
            Some(date) => format!("{} {}", e.url, date.format("%Y-%m-%d")),
            None => e.url.clone(),
        })
        .collect();
    lines.push(String::new());
    lines.push(format!("{} URLs", entries.len()));
    lines
}

pub fn print_sitemap(entries: &[SitemapEntry]) {
    for line in format_sitemap(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Report
// ============================================================================

/// Operator report: inventory counts, per-type hub policy outcomes, top
/// clusters, non-hub clusters and duplicate groups.
pub fn format_report(
    snapshot: &Snapshot,
    duplicates: &[DuplicateGroup],
    top: usize,
) -> Vec<String> {
    let agg = snapshot.aggregation();
    let registry = snapshot.registry();
    let report = registry.report();
    let mut lines = Vec::new();

    lines.push("Inventory".to_string());
    lines.push(format!(
        "{}{} listed, {} excluded",
        indent(1),
        agg.listed_items,
        agg.excluded_items
    ));
    for (label, counts) in [("Missing", &agg.missing), ("Rejected", &agg.rejected)] {
        let parts: Vec<String> = Facet::ALL
            .into_iter()
            .filter_map(|f| counts.get(&f).map(|n| format!("{f} {n}")))
            .collect();
        if !parts.is_empty() {
            lines.push(format!("{}{label}: {}", indent(1), parts.join(", ")));
        }
    }
    lines.push(format!("{}Snapshot: {}", indent(1), &snapshot.version[..12]));

    lines.push(String::new());
    lines.push("Facet types".to_string());
    let width = FacetType::ALL
        .iter()
        .map(|t| t.label().chars().count())
        .max()
        .unwrap_or(0);
    for facet_type in FacetType::ALL {
        let count = |list: &[FacetCluster]| {
            list.iter()
                .filter(|c| c.facet_type == facet_type)
                .count()
        };
        let clusters = agg.clusters.iter().filter(|c| c.facet_type == facet_type).count();
        let hubs = registry.eligible_count(facet_type);
        let mut line = format!(
            "{}{:<width$} {} clusters, {} hubs",
            indent(1),
            facet_type.label(),
            clusters,
            hubs,
        );
        for (n, what) in [
            (count(&report.below_threshold), "below threshold"),
            (count(&report.over_cap), "over cap"),
            (count(&report.unrecognized_formula), "unrecognized formula"),
        ] {
            if n > 0 {
                line.push_str(&format!(", {n} {what}"));
            }
        }
        lines.push(line);
    }

    if top > 0 {
        lines.push(String::new());
        lines.push("Top clusters".to_string());
        for facet_type in FacetType::ALL {
            let mut ranked: Vec<&FacetCluster> = agg
                .clusters
                .iter()
                .filter(|c| c.facet_type == facet_type)
                .collect();
            if ranked.is_empty() {
                continue;
            }
            ranked.sort_by(|a, b| {
                b.member_count
                    .cmp(&a.member_count)
                    .then_with(|| a.facet_key.cmp(&b.facet_key))
            });
            lines.push(format!("{}{}", indent(1), facet_type.label()));
            for (i, cluster) in ranked.iter().take(top).enumerate() {
                lines.push(format!(
                    "{}{} {}",
                    indent(2),
                    format_index(i + 1),
                    cluster_line(cluster)
                ));
            }
        }
    }

    for (title, list) in [
        ("Over cap", &report.over_cap),
        ("Unrecognized formulas", &report.unrecognized_formula),
    ] {
        if list.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(title.to_string());
        for cluster in list.iter() {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                cluster.facet_type.label(),
                cluster_line(cluster)
            ));
        }
    }

    lines.push(String::new());
    lines.push("Duplicate groups".to_string());
    if duplicates.is_empty() {
        lines.push(format!("{}none", indent(1)));
    }
    for (i, group) in duplicates.iter().enumerate() {
        lines.push(format!(
            "{} {} ({} items)",
            format_index(i + 1),
            group.signature,
            group.ids.len()
        ));
        let ids: Vec<String> = group.ids.iter().map(|id| id.to_string()).collect();
        lines.push(format!("{}ids: {}", indent(1), ids.join(", ")));
    }
    lines
}

pub fn print_report(snapshot: &Snapshot, duplicates: &[DuplicateGroup], top: usize) {
    for line in format_report(snapshot, duplicates, top) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Summary for `check`: what was loaded and whether anything looks off.
pub fn format_check(snapshot: &Snapshot, stale: Option<&StaleRegistryWarning>) -> Vec<String> {
    let agg = snapshot.aggregation();
    let mut lines = vec![
        format!(
            "{}{} items ({} listed)",
            indent(1),
            agg.listed_items + agg.excluded_items,
            agg.listed_items
        ),
        format!("{}{} clusters", indent(1), agg.clusters.len()),
        format!(
            "{}{} hubs, {} products",
            indent(1),
            snapshot.registry().len(),
            snapshot.products().count()
        ),
    ];
    if let Some(warning) = stale {
        lines.push(format!("{}Warning: {}", indent(1), warning));
    }
    lines
}

pub fn print_check(snapshot: &Snapshot, stale: Option<&StaleRegistryWarning>) {
    for line in format_check(snapshot, stale) {
        println!("{}", line);
    }
}
