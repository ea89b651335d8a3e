//! Shared types used across all pipeline stages.
//!
//! These types flow from the aggregator into the registry, the classifier and
//! the sitemap builder, and are serialized to JSON by the CLI. Facet types are
//! a closed enum so the cap and threshold policy is matched exhaustively
//! instead of through string-keyed lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of listed items a cluster needs before its hub is eligible.
pub const MIN_HUB_MEMBERS: u32 = 2;

/// Maximum number of eligible hubs per capped facet type.
pub const HUB_CAP_PER_TYPE: usize = 20;

/// Trailing path segment that marks an in-stock variant.
pub const IN_STOCK_SEGMENT: &str = "in-stock";

/// One classifiable dimension of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Category,
    Series,
    Formula,
    Engine,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Category, Facet::Series, Facet::Formula, Facet::Engine];

    /// URL segment that introduces a value of this facet in a hub path.
    pub fn segment(self) -> &'static str {
        match self {
            Facet::Category => "category",
            Facet::Series => "line",
            Facet::Formula => "formula",
            Facet::Engine => "engine",
        }
    }

    /// Inverse of [`Facet::segment`].
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.segment() == segment)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// The closed set of facet types a cluster or hub can belong to.
///
/// Variants are declared in path-composition precedence order, so the derived
/// `Ord` is that precedence: category-first pairs, then line-first pairs, then
/// the formula×engine pair, then single-facet hubs. Each pair exists in one
/// orientation only, which keeps two orderings from aliasing the same page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetType {
    CategorySeries,
    CategoryFormula,
    CategoryEngine,
    SeriesFormula,
    SeriesEngine,
    FormulaEngine,
    Category,
    Series,
    Formula,
    Engine,
}

impl FacetType {
    /// Every facet type, in precedence order.
    pub const ALL: [FacetType; 10] = [
        FacetType::CategorySeries,
        FacetType::CategoryFormula,
        FacetType::CategoryEngine,
        FacetType::SeriesFormula,
        FacetType::SeriesEngine,
        FacetType::FormulaEngine,
        FacetType::Category,
        FacetType::Series,
        FacetType::Formula,
        FacetType::Engine,
    ];

    /// Ordered facet template; also the order of segments in the hub path.
    pub fn facets(self) -> &'static [Facet] {
        match self {
            FacetType::CategorySeries => &[Facet::Category, Facet::Series],
            FacetType::CategoryFormula => &[Facet::Category, Facet::Formula],
            FacetType::CategoryEngine => &[Facet::Category, Facet::Engine],
            FacetType::SeriesFormula => &[Facet::Series, Facet::Formula],
            FacetType::SeriesEngine => &[Facet::Series, Facet::Engine],
            FacetType::FormulaEngine => &[Facet::Formula, Facet::Engine],
            FacetType::Category => &[Facet::Category],
            FacetType::Series => &[Facet::Series],
            FacetType::Formula => &[Facet::Formula],
            FacetType::Engine => &[Facet::Engine],
        }
    }

    /// Find the facet type whose template is exactly `facets`, in that order.
    pub fn from_facets(facets: &[Facet]) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.facets() == facets)
    }

    /// Category hubs are operator-controlled and few; every other type is capped.
    pub fn is_capped(self) -> bool {
        self != FacetType::Category
    }

    pub fn contains(self, facet: Facet) -> bool {
        self.facets().contains(&facet)
    }

    /// Human label such as `category×line`.
    pub fn label(self) -> String {
        self.facets()
            .iter()
            .map(|f| f.segment())
            .collect::<Vec<_>>()
            .join("×")
    }
}

impl fmt::Display for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Normalized slugs for a facet template, one per facet, in template order.
///
/// The derived `Ord` compares element by element, which is the lexical
/// tie-breaker used when ranking clusters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetKey(pub Vec<String>);

impl FacetKey {
    pub fn single(value: impl Into<String>) -> Self {
        Self(vec![value.into()])
    }

    pub fn pair(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self(vec![first.into(), second.into()])
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FacetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Counts for one facet value (or value pair) over one inventory snapshot.
///
/// Always recomputed from scratch; `member_count >= in_stock_count` holds by
/// construction because an in-stock item is counted in both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCluster {
    pub facet_type: FacetType,
    pub facet_key: FacetKey,
    pub member_count: u32,
    pub in_stock_count: u32,
}

/// One hub page derived from a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubDefinition {
    pub facet_type: FacetType,
    pub facet_values: FacetKey,
    pub is_in_stock_variant: bool,
    pub eligible: bool,
    /// Items backing this page: the in-stock count for in-stock variants.
    pub member_count: u32,
    /// Canonical path, without query string.
    pub path: String,
}

impl HubDefinition {
    pub fn path_template(&self) -> &'static [Facet] {
        self.facet_type.facets()
    }
}

/// Robots directive. `follow` is always set in this design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robots {
    pub index: bool,
    pub follow: bool,
}

impl Robots {
    pub const INDEX_FOLLOW: Robots = Robots {
        index: true,
        follow: true,
    };
    pub const NOINDEX_FOLLOW: Robots = Robots {
        index: false,
        follow: true,
    };
}

impl fmt::Display for Robots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = if self.index { "index" } else { "noindex" };
        let follow = if self.follow { "follow" } else { "nofollow" };
        write!(f, "{index},{follow}")
    }
}
