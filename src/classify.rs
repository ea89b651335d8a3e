//! Per-request indexability decisions.
//!
//! Given a resolved target (a hub or a product page) and the raw query
//! string, decide the robots directive, the canonical path and whether
//! structured data may be emitted.
//!
//! ## Rules
//!
//! Evaluated top to bottom; the first rule that applies decides.
//!
//! | Rule                | Applies when                                   | robots         | canonical        | schema |
//! |---------------------|------------------------------------------------|----------------|------------------|--------|
//! | `NonCanonicalQuery` | any parameter other than `page`, or a bad page | noindex,follow | clean path       | no     |
//! | `UnlistedContent`   | hub not eligible or empty, product unlisted    | noindex,follow | clean path       | no     |
//! | `Paginated`         | `page` > 1                                     | noindex,follow | `path?page=N`    | no     |
//! | `Canonical`         | otherwise                                      | index,follow   | clean path       | yes    |
//!
//! Tracking parameters outrank pagination: `?page=3&utm_source=ads` collapses
//! onto the clean path. `?page=1` is the same page as no query at all.
//!
//! Every known target answers 200, even when not indexable. Only a path that
//! resolves to nothing is an [`UnknownTargetError`] (404).

use crate::snapshot::{ProductPage, Snapshot};
use crate::types::{HubDefinition, Robots};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The path matches no hub and no product.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no hub or product at {path}")]
pub struct UnknownTargetError {
    pub path: String,
}

impl UnknownTargetError {
    pub fn http_status(&self) -> u16 {
        404
    }
}

/// A page the classifier can decide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Hub(&'a HubDefinition),
    Product(&'a ProductPage),
}

impl Target<'_> {
    pub fn canonical_path(&self) -> &str {
        match self {
            Target::Hub(hub) => &hub.path,
            Target::Product(product) => &product.path,
        }
    }

    /// Whether the page currently has indexable content behind it.
    pub fn has_listed_content(&self) -> bool {
        match self {
            Target::Hub(hub) => hub.eligible && hub.member_count > 0,
            Target::Product(product) => product.listed,
        }
    }
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    NonCanonicalQuery,
    UnlistedContent,
    Paginated,
    Canonical,
}

impl DecisionRule {
    /// Evaluation order.
    pub const ORDER: [DecisionRule; 4] = [
        DecisionRule::NonCanonicalQuery,
        DecisionRule::UnlistedContent,
        DecisionRule::Paginated,
        DecisionRule::Canonical,
    ];

    pub fn applies(self, target: &Target<'_>, query: &QueryParams) -> bool {
        match self {
            DecisionRule::NonCanonicalQuery => query.is_non_canonical(),
            DecisionRule::UnlistedContent => !target.has_listed_content(),
            DecisionRule::Paginated => query.page.is_some_and(|n| n > 1),
            DecisionRule::Canonical => true,
        }
    }

    fn decide(self, target: &Target<'_>, query: &QueryParams) -> IndexabilityDecision {
        let clean = target.canonical_path().to_string();
        let (robots, canonical_path, emit_structured_data) = match self {
            DecisionRule::NonCanonicalQuery | DecisionRule::UnlistedContent => {
                (Robots::NOINDEX_FOLLOW, clean, false)
            }
            DecisionRule::Paginated => {
                let page = query.page.unwrap_or(1);
                (Robots::NOINDEX_FOLLOW, format!("{clean}?page={page}"), false)
            }
            DecisionRule::Canonical => (Robots::INDEX_FOLLOW, clean, true),
        };
        IndexabilityDecision {
            robots,
            canonical_path,
            emit_structured_data,
            rule: self,
        }
    }
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionRule::NonCanonicalQuery => "non-canonical query",
            DecisionRule::UnlistedContent => "unlisted content",
            DecisionRule::Paginated => "paginated",
            DecisionRule::Canonical => "canonical",
        };
        f.write_str(name)
    }
}

/// Robots directive, canonical path and structured-data flag for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexabilityDecision {
    #[serde(serialize_with = "robots_as_str")]
    pub robots: Robots,
    /// Path only. Carries `?page=N` for paginated pages and nothing else.
    pub canonical_path: String,
    pub emit_structured_data: bool,
    pub rule: DecisionRule,
}

impl IndexabilityDecision {
    /// Known targets always render.
    pub fn http_status(&self) -> u16 {
        200
    }
}

fn robots_as_str<S: serde::Serializer>(robots: &Robots, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(robots)
}

// =============================================================================
// Query parameters
// =============================================================================

/// The parts of a query string that matter for classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// The page number, when exactly one valid `page` was given.
    pub page: Option<u32>,
    /// Names of parameters other than `page`, in request order.
    pub foreign: Vec<String>,
    /// `page` was repeated, empty, zero or not a number.
    pub bad_page: bool,
}

impl QueryParams {
    /// Parse a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        let mut pages = 0;

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if name != "page" {
                params.foreign.push(name.into_owned());
                continue;
            }
            pages += 1;
            match value.parse::<u32>() {
                Ok(n) if n >= 1 && pages == 1 => params.page = Some(n),
                _ => params.bad_page = true,
            }
        }
        if params.bad_page {
            params.page = None;
        }
        params
    }

    /// Whether this query makes the URL a non-canonical variant.
    pub fn is_non_canonical(&self) -> bool {
        self.bad_page || !self.foreign.is_empty()
    }

    /// Foreign parameters that are known click-tracking or attribution keys.
    pub fn tracking(&self) -> impl Iterator<Item = &str> {
        self.foreign
            .iter()
            .map(String::as_str)
            .filter(|name| is_tracking_param(name))
    }
}

/// Known marketing and attribution parameters.
///
/// Informational: any parameter besides `page` already makes a URL
/// non-canonical. This only labels the common ones.
pub fn is_tracking_param(name: &str) -> bool {
    const KEYS: &[&str] = &[
        "gclid", "yclid", "ysclid", "ymclid", "fbclid", "_openstat", "roistat", "from", "ref",
    ];
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || KEYS.contains(&name.as_str())
}

// =============================================================================
// Entry points
// =============================================================================

/// Decide indexability for a resolved target.
pub fn classify(target: &Target<'_>, query: &str) -> IndexabilityDecision {
    let params = QueryParams::parse(query);
    let rule = DecisionRule::ORDER
        .into_iter()
        .find(|rule| rule.applies(target, &params))
        .unwrap_or(DecisionRule::Canonical);
    rule.decide(target, &params)
}

/// Resolve `path` against `snapshot` and classify it.
pub fn classify_request(
    snapshot: &Snapshot,
    path: &str,
    query: &str,
) -> Result<IndexabilityDecision, UnknownTargetError> {
    let target = snapshot.resolve(path).ok_or_else(|| UnknownTargetError {
        path: path.to_string(),
    })?;
    Ok(classify(&target, query))
}

/// Split `/path?query#fragment` into path and query.
pub fn split_request(raw: &str) -> (&str, &str) {
    let raw = raw.split('#').next().unwrap_or(raw);
    raw.split_once('?').unwrap_or((raw, ""))
}
