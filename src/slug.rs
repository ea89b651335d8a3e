//! Facet value normalization.
//!
//! Free-text facet values from the catalog (brand lines, engine designations,
//! wheel formulas) become URL-safe slugs here. The same functions run when the
//! aggregator reads inventory and when a request path is matched back to a
//! hub, so a value normalizes identically in both directions.
//!
//! ## Slugs
//!
//! Series, engine and category values share one routine:
//!
//! - `X3000` → `x3000`
//! - `WP13.550E501` → `wp13-550e501` (any run of non-alphanumerics is one `-`)
//! - `Х3000` typed with a Cyrillic `Х` → `x3000`
//!
//! Cyrillic letters that look like Latin ones are transliterated only inside a
//! token where every non-ASCII letter is such a look-alike, i.e. a Latin code
//! typed on the wrong keyboard layout. Other non-ASCII letters are dropped.
//!
//! ## Wheel formulas
//!
//! `6x4`, `6 X 4`, `6×4` and `6х4` (Cyrillic) all become `6x4`. Anything that
//! is not `digits separator digits` is rejected. Only [`RECOGNIZED_FORMULAS`]
//! may become hubs; other well-formed tokens are counted but never promoted.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("empty facet value")]
    Empty,
    #[error("facet value {0:?} has no ASCII letters or digits")]
    NoAsciiAlphanumerics(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a wheel formula: {0:?}")]
pub struct InvalidFormulaError(pub String);

/// Two-, three- and four-axle drive configurations that may get hubs.
pub const RECOGNIZED_FORMULAS: &[&str] = &["4x2", "4x4", "6x2", "6x4", "6x6", "8x4", "8x6", "8x8"];

static FORMULA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2})\s*[xX×хХ]\s*([0-9]{1,2})$").expect("formula pattern must compile")
});

/// Normalize a brand line (series) name to a slug.
pub fn normalize_series(text: &str) -> Result<String, NormalizationError> {
    slugify(text)
}

/// Normalize an engine designation to a slug.
pub fn normalize_engine(text: &str) -> Result<String, NormalizationError> {
    slugify(text)
}

/// Normalize a category slug coming from the catalog.
///
/// Categories already arrive as slugs; this only guarantees they have the
/// same shape as the other facet values.
pub fn normalize_category(text: &str) -> Result<String, NormalizationError> {
    slugify(text)
}

/// Normalize a product URL slug.
pub fn normalize_product_slug(text: &str) -> Result<String, NormalizationError> {
    slugify(text)
}

/// Normalize a wheel formula to its canonical `NxM` token.
pub fn normalize_formula(text: &str) -> Result<String, InvalidFormulaError> {
    let invalid = || InvalidFormulaError(text.to_string());
    let caps = FORMULA_PATTERN.captures(text.trim()).ok_or_else(invalid)?;
    let wheels: u32 = caps[1].parse().map_err(|_| invalid())?;
    let driven: u32 = caps[2].parse().map_err(|_| invalid())?;
    Ok(format!("{wheels}x{driven}"))
}

/// Whether a canonical formula token may become a hub.
pub fn is_recognized_formula(token: &str) -> bool {
    RECOGNIZED_FORMULAS.contains(&token)
}

fn slugify(text: &str) -> Result<String, NormalizationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NormalizationError::Empty);
    }

    let lowered = trimmed.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    for token in lowered.split(|c: char| !c.is_alphanumeric()) {
        let folded = fold_token(token);
        if folded.is_empty() {
            continue;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&folded);
    }

    if slug.is_empty() {
        Err(NormalizationError::NoAsciiAlphanumerics(trimmed.to_string()))
    } else {
        Ok(slug)
    }
}

/// Reduce one lower-cased alphanumeric token to `[a-z0-9]`.
fn fold_token(token: &str) -> String {
    let transliterate = token
        .chars()
        .filter(|c| !c.is_ascii())
        .all(|c| latin_lookalike(c).is_some());

    token
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if transliterate {
                latin_lookalike(c)
            } else {
                None
            }
        })
        .collect()
}

/// Lower-case Cyrillic letters that render like a Latin letter.
fn latin_lookalike(c: char) -> Option<char> {
    match c {
        'а' => Some('a'),
        'в' => Some('b'),
        'е' => Some('e'),
        'к' => Some('k'),
        'м' => Some('m'),
        'н' => Some('h'),
        'о' => Some('o'),
        'р' => Some('p'),
        'с' => Some('c'),
        'т' => Some('t'),
        'у' => Some('y'),
        'х' => Some('x'),
        _ => None,
    }
}
