//! End-to-end checks over `fixtures/inventory.json`.
//!
//! Each test builds a snapshot the way the CLI does (config → inventory →
//! aggregate → registry → snapshot) and asserts on hubs, decisions and the
//! sitemap through the public API only.
//!
//! Run with: cargo test --test scenarios

use catalog_hubs::aggregate::aggregate;
use catalog_hubs::classify::{DecisionRule, classify_request};
use catalog_hubs::config::{SiteConfig, load_config};
use catalog_hubs::inventory::{InventoryItem, JsonInventory, InventorySource};
use catalog_hubs::registry::HubRegistry;
use catalog_hubs::sitemap::build_sitemap;
use catalog_hubs::snapshot::{Snapshot, SnapshotHandle};
use catalog_hubs::types::{FacetType, HUB_CAP_PER_TYPE, MIN_HUB_MEMBERS, Robots};
use chrono::{TimeZone, Utc};
use std::path::Path;
use std::time::Duration;

fn fixtures() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

fn load() -> (SiteConfig, Vec<InventoryItem>, Snapshot) {
    let config = load_config(fixtures()).unwrap();
    let items = JsonInventory::new(fixtures().join("inventory.json"))
        .snapshot()
        .unwrap();
    let built_at = Utc.with_ymd_and_hms(2026, 10, 10, 0, 0, 0).unwrap();
    let snapshot = Snapshot::build(&items, &config, built_at);
    (config, items, snapshot)
}

fn bare(id: u64, formula: &str) -> InventoryItem {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "slug": format!("truck-{id}"),
        "wheel_formula_raw": formula,
    }))
    .unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_formula_threshold() {
    let items = vec![bare(1, "6x4"), bare(2, "6×4"), bare(3, "6 X 4"), bare(4, "8x4")];
    let config = SiteConfig::default();
    let snapshot = Snapshot::build(&items, &config, Utc::now());

    let six = snapshot.registry().get("/hubs/formula/6x4/").unwrap();
    assert!(six.eligible);
    assert_eq!(six.member_count, 3);
    assert!(!snapshot.registry().get("/hubs/formula/8x4/").unwrap().eligible);

    // The thin page exists but is neither indexed nor listed.
    let thin = classify_request(&snapshot, "/hubs/formula/8x4/", "").unwrap();
    assert_eq!(thin.http_status(), 200);
    assert_eq!(thin.robots, Robots::NOINDEX_FOLLOW);
    let entries = build_sitemap(&snapshot, &items, &config.site_url().unwrap()).unwrap();
    assert!(entries.iter().all(|e| !e.url.contains("8x4")));
}

#[test]
fn pair_hub_down_to_one_truck_stays_200() {
    let items: Vec<InventoryItem> = serde_json::from_value(serde_json::json!([
        {"id": 1, "slug": "a", "category_slug": "dump-trucks", "wheel_formula_raw": "8x4"}
    ]))
    .unwrap();
    let snapshot = Snapshot::build(&items, &SiteConfig::default(), Utc::now());
    let d = classify_request(&snapshot, "/hubs/category/dump-trucks/formula/8x4/", "").unwrap();
    assert_eq!(d.robots, Robots::NOINDEX_FOLLOW);
    assert_eq!(d.canonical_path, "/hubs/category/dump-trucks/formula/8x4/");
}

#[test]
fn scenario_b_variant_without_stock_is_unknown() {
    let (_, _, snapshot) = load();

    // wp12-430 backs two listed trucks, neither in stock.
    let base = classify_request(&snapshot, "/hubs/engine/wp12-430/", "").unwrap();
    assert_eq!(base.http_status(), 200);
    assert_eq!(base.robots, Robots::INDEX_FOLLOW);

    let err = classify_request(&snapshot, "/hubs/engine/wp12-430/in-stock/", "").unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[test]
fn scenario_c_tracking_beats_pagination() {
    let (_, _, snapshot) = load();
    let d = classify_request(&snapshot, "/hubs/line/x3000/", "page=3&utm_source=ads").unwrap();
    assert_eq!(d.robots, Robots::NOINDEX_FOLLOW);
    assert_eq!(d.canonical_path, "/hubs/line/x3000/");
    assert!(!d.emit_structured_data);
    assert_eq!(d.rule, DecisionRule::NonCanonicalQuery);
}

// =============================================================================
// Registry invariants
// =============================================================================

#[test]
fn threshold_invariant() {
    let (_, items, snapshot) = load();
    for cluster in aggregate(&items) {
        if cluster.member_count >= MIN_HUB_MEMBERS {
            continue;
        }
        let eligible = snapshot.registry().hubs().iter().any(|h| {
            h.facet_type == cluster.facet_type && h.facet_values == cluster.facet_key && h.eligible
        });
        assert!(!eligible, "{cluster:?} is below threshold but has an eligible hub");
    }
}

#[test]
fn cap_invariant() {
    let items: Vec<InventoryItem> = (0..60u64)
        .map(|i| {
            serde_json::from_value(serde_json::json!({
                "id": i,
                "slug": format!("truck-{i}"),
                "series_raw": format!("S{}", i / 2),
                "engine_raw": format!("E{}", i / 2),
            }))
            .unwrap()
        })
        .collect();
    let registry = HubRegistry::build(&aggregate(&items), "/hubs/");

    for facet_type in FacetType::ALL {
        if facet_type.is_capped() {
            assert!(registry.eligible_count(facet_type) <= HUB_CAP_PER_TYPE, "{facet_type}");
        }
    }
    assert_eq!(registry.eligible_count(FacetType::Series), HUB_CAP_PER_TYPE);
    assert_eq!(registry.report().over_cap.len(), 30);
}

#[test]
fn in_stock_subset_invariant() {
    let (_, items, snapshot) = load();
    let clusters = aggregate(&items);
    for variant in snapshot.registry().hubs().iter().filter(|h| h.is_in_stock_variant) {
        let base = snapshot.registry().hubs().iter().find(|h| {
            !h.is_in_stock_variant
                && h.facet_type == variant.facet_type
                && h.facet_values == variant.facet_values
        });
        assert!(base.is_some_and(|b| b.eligible), "{} has no eligible base", variant.path);

        let cluster = clusters
            .iter()
            .find(|c| c.facet_type == variant.facet_type && c.facet_key == variant.facet_values)
            .unwrap();
        assert!(cluster.in_stock_count >= 1);
    }
}

#[test]
fn unrecognized_formula_has_no_hub() {
    let (_, _, snapshot) = load();
    assert!(classify_request(&snapshot, "/hubs/formula/10x4/", "").is_err());
    assert!(
        snapshot
            .registry()
            .report()
            .unrecognized_formula
            .iter()
            .any(|c| c.facet_type == FacetType::Formula && c.member_count == 2)
    );
}

// =============================================================================
// Decisions
// =============================================================================

#[test]
fn canonical_stability() {
    let (_, _, snapshot) = load();
    let path = "/hubs/category/dump-trucks/";
    let x = classify_request(&snapshot, path, "utm_source=x").unwrap();
    let y = classify_request(&snapshot, path, "utm_source=y").unwrap();
    let clean = classify_request(&snapshot, path, "").unwrap();

    assert_eq!(x.canonical_path, clean.canonical_path);
    assert_eq!(y.canonical_path, clean.canonical_path);
    assert!(!x.emit_structured_data);
    assert!(!y.emit_structured_data);
    assert!(clean.emit_structured_data);
}

#[test]
fn pagination_self_canonical() {
    let (_, _, snapshot) = load();
    let path = "/hubs/category/dump-trucks/formula/6x4/";
    let two = classify_request(&snapshot, path, "page=2").unwrap();
    assert!(two.canonical_path.ends_with("?page=2"));
    assert_eq!(two.robots, Robots::NOINDEX_FOLLOW);

    assert_eq!(
        classify_request(&snapshot, path, "page=1").unwrap(),
        classify_request(&snapshot, path, "").unwrap()
    );
}

#[test]
fn single_truck_category_is_200_noindex() {
    let (_, _, snapshot) = load();
    let d = classify_request(&snapshot, "/hubs/category/vans/", "").unwrap();
    assert_eq!(d.http_status(), 200);
    assert_eq!(d.robots, Robots::NOINDEX_FOLLOW);
    assert_eq!(d.canonical_path, "/hubs/category/vans/");
    assert!(classify_request(&snapshot, "/hubs/category/vans/in-stock/", "").is_err());
}

#[test]
fn hidden_product_is_200_noindex() {
    let (_, _, snapshot) = load();
    let d = classify_request(&snapshot, "/product/shacman-x6000-6x4-tractor/", "").unwrap();
    assert_eq!(d.http_status(), 200);
    assert_eq!(d.robots, Robots::NOINDEX_FOLLOW);
    assert_eq!(d.rule, DecisionRule::UnlistedContent);
}

#[test]
fn unknown_paths_are_404() {
    let (_, _, snapshot) = load();
    for path in [
        "/product/never-existed/",
        "/hubs/formula/6x4/category/dump-trucks/",
        "/hubs/line/x9000/",
        "/contacts/",
    ] {
        let err = classify_request(&snapshot, path, "").unwrap_err();
        assert_eq!(err.path, path);
    }
}

#[test]
fn request_values_normalize_like_inventory() {
    let (_, _, snapshot) = load();
    let d = classify_request(&snapshot, "/hubs/line/Х3000/engine/WP12.430", "").unwrap();
    assert_eq!(d.canonical_path, "/hubs/line/x3000/engine/wp12-430/");
}

// =============================================================================
// Sitemap
// =============================================================================

#[test]
fn sitemap_exclusion() {
    let (config, items, snapshot) = load();
    let entries = build_sitemap(&snapshot, &items, &config.site_url().unwrap()).unwrap();
    assert!(!entries.is_empty());

    for entry in &entries {
        assert!(!entry.url.contains('?'), "{}", entry.url);
        let path = entry.url.strip_prefix("https://trucks.example").unwrap();
        let d = classify_request(&snapshot, path, "").unwrap();
        assert_eq!(d.robots, Robots::INDEX_FOLLOW, "{path}");
    }

    let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
    assert!(!urls.contains(&"https://trucks.example/hubs/category/vans/"));
    assert!(!urls.contains(&"https://trucks.example/product/shacman-x6000-6x4-tractor/"));
    assert!(!urls.contains(&"https://trucks.example/product/shacman-x3000-6x4-dump-2024/"));
}

#[test]
fn every_sitemap_url_resolves() {
    let items: Vec<InventoryItem> = serde_json::from_value(serde_json::json!([
        {"id": 1, "slug": "a", "series_raw": "In Stock", "in_stock": true},
        {"id": 2, "slug": "b", "series_raw": "in-stock"},
        {"id": 3, "slug": "c", "series_raw": "X3000", "engine_raw": "in stock"},
        {"id": 4, "slug": "d", "series_raw": "X3000", "engine_raw": "IN-STOCK"}
    ]))
    .unwrap();
    let config = SiteConfig::default();
    let snapshot = Snapshot::build(&items, &config, Utc::now());
    let site = config.site_url().unwrap();
    let entries = build_sitemap(&snapshot, &items, &site).unwrap();

    let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
    assert!(urls.contains(&"https://example.com/hubs/line/in-stock/"));
    assert!(urls.contains(&"https://example.com/hubs/line/in-stock/in-stock/"));
    assert!(urls.contains(&"https://example.com/hubs/line/x3000/engine/in-stock/"));
    for url in urls {
        let path = url.strip_prefix("https://example.com").unwrap();
        let d = classify_request(&snapshot, path, "").unwrap();
        assert_eq!(d.canonical_path, path);
    }
}

#[test]
fn nested_prefixes_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[hubs]\nbase_path = \"/catalog/hubs/\"\n\n[products]\npath_prefix = \"/catalog/\"\n",
    )
    .unwrap();
    assert!(load_config(dir.path()).is_err());
}

#[test]
fn encoded_request_paths_resolve() {
    let (_, _, snapshot) = load();
    // Cyrillic capital Ha, as a browser would send it.
    let d = classify_request(&snapshot, "/hubs/line/%D0%A53000/", "").unwrap();
    assert_eq!(d.canonical_path, "/hubs/line/x3000/");
}

#[test]
fn sitemap_lastmod_from_backing_items() {
    let (config, items, snapshot) = load();
    let entries = build_sitemap(&snapshot, &items, &config.site_url().unwrap()).unwrap();
    let lastmod = |url: &str| {
        entries
            .iter()
            .find(|e| e.url == url)
            .unwrap_or_else(|| panic!("{url} not in sitemap"))
            .lastmod
            .map(|d| d.format("%Y-%m-%d").to_string())
    };

    // Newest listed 6x4 truck; the hidden and inactive ones are newer but ignored.
    assert_eq!(
        lastmod("https://trucks.example/hubs/formula/6x4/").as_deref(),
        Some("2026-09-30")
    );
    assert_eq!(
        lastmod("https://trucks.example/hubs/category/tractors/in-stock/").as_deref(),
        Some("2026-09-20")
    );
    assert_eq!(
        lastmod("https://trucks.example/product/shacman-x3000-dump-chassis/"),
        None
    );
}

#[test]
fn sitemap_is_reproducible() {
    let (config, items, _) = load();
    let site = config.site_url().unwrap();
    let a = Snapshot::build(&items, &config, Utc::now());
    let b = Snapshot::build(&items, &config, Utc::now());
    assert_eq!(a.version, b.version);
    assert_eq!(
        build_sitemap(&a, &items, &site).unwrap(),
        build_sitemap(&b, &items, &site).unwrap()
    );
}

// =============================================================================
// Snapshot handle
// =============================================================================

#[test]
fn refresh_from_file_and_staleness() {
    let (config, _, snapshot) = load();
    let built_at = snapshot.built_at;
    let handle = SnapshotHandle::new(snapshot, config.registry.refresh_interval());

    let (_, stale) = handle.current_checked(built_at + chrono::Duration::seconds(601));
    assert_eq!(stale.unwrap().interval, Duration::from_secs(600));

    let source = JsonInventory::new(fixtures().join("inventory.json"));
    let later = built_at + chrono::Duration::seconds(700);
    handle.refresh(&source, &config, later).unwrap();
    let (_, stale) = handle.current_checked(later);
    assert!(stale.is_none());

    let missing = JsonInventory::new(fixtures().join("missing.json"));
    assert!(handle.refresh(&missing, &config, later).is_err());
    assert_eq!(handle.current().built_at, later);
}
