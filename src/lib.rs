//! # Catalog Hubs
//!
//! Faceted landing pages ("hubs") for a vehicle-dealer catalog: which facet
//! combinations deserve their own page, how every request to a hub or product
//! page should be indexed, and which URLs belong in the sitemap.
//!
//! # Architecture: Snapshot Pipeline
//!
//! Hubs are derived in batch from one inventory snapshot; requests are then
//! answered from the derived state without touching the inventory again:
//!
//! ```text
//! 1. Aggregate   inventory  →  facet clusters     (counts per value and value pair)
//! 2. Registry    clusters   →  hub definitions    (threshold, cap, in-stock variants)
//! 3. Snapshot    hubs + products → versioned, immutable, atomically swapped
//!
//! per request:   snapshot + path + query  →  indexability decision
//! on demand:     snapshot + inventory     →  sitemap entries
//! ```
//!
//! Each stage is a pure function of its input, so a stage can be tested
//! without the ones around it, and rebuilding from the same inventory gives an
//! identical snapshot version.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`slug`] | Facet value normalization (lines, engines, categories, wheel formulas) |
//! | [`inventory`] | Read-only inventory items and the `InventorySource` seam |
//! | [`aggregate`] | Stage 1: facet clusters, skip counters and the duplicate audit |
//! | [`registry`] | Stage 2: hub policy, canonical hub paths and path resolution |
//! | [`snapshot`] | Stage 3: immutable snapshots, product index, atomic swap, staleness |
//! | [`classify`] | Per-request robots / canonical / structured-data decisions |
//! | [`sitemap`] | Sitemap entries for every indexable page |
//! | [`render`] | `<head>` tags and sitemap XML, using Maud |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`types`] | Shared types: facets, facet types, clusters, hubs, robots |
//! | [`output`] | CLI output formatting for every command |
//!
//! # Design Decisions
//!
//! ## Closed Facet Types
//!
//! The four facets and the six supported pairs are a closed enum,
//! [`types::FacetType`], declared in path precedence order. Cap and threshold
//! policy match on it exhaustively, and each pair exists in one orientation
//! only, so two facet orders can never alias the same page.
//!
//! ## Existence Is Not Eligibility
//!
//! A hub that exists but is thin (a line or category with one truck, or a
//! category with none right now) still answers 200 with `noindex,follow`. Routing never depends on live
//! stock, and a temporarily empty page cannot turn into a crawl error. Only
//! paths that match no hub and no product are 404s.
//!
//! ## Ordered Decision Rules
//!
//! The classifier is a fixed list of rules evaluated top to bottom
//! ([`classify::DecisionRule::ORDER`]). Tracking parameters rank above
//! pagination: a campaign URL collapses onto the clean canonical regardless of
//! page depth, while a genuine `?page=N` keeps a self-referencing canonical.
//!
//! ## Swap, Don't Mutate
//!
//! [`snapshot::SnapshotHandle`] holds an `Arc` to the current snapshot.
//! Refreshes build the next snapshot completely and then replace the pointer,
//! so a request or sitemap run holding the old `Arc` sees one consistent
//! registry for its whole lifetime. A failed refresh keeps the old snapshot.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod inventory;
pub mod output;
pub mod registry;
pub mod render;
pub mod sitemap;
pub mod slug;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
