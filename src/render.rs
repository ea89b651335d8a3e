//! Thin adapters from decisions and sitemap entries to markup.
//!
//! Page templates belong to the site; this module only renders the pieces
//! the decision engine owns:
//!
//! - [`head_tags`]: robots meta, canonical link and, when allowed, the
//!   JSON-LD block for a page's `<head>`.
//! - [`sitemap_xml`]: a sitemaps.org `urlset` document.
//!
//! Uses [maud](https://maud.lambda.xyz/), so every interpolated value is
//! escaped.

use crate::classify::IndexabilityDecision;
use crate::sitemap::SitemapEntry;
use maud::{Markup, PreEscaped, html};
use url::Url;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// `<head>` tags for one decision.
///
/// `structured_data` is emitted only if the decision allows it, so callers can
/// pass it unconditionally.
pub fn head_tags(
    decision: &IndexabilityDecision,
    site_url: &Url,
    structured_data: Option<&serde_json::Value>,
) -> Result<Markup, url::ParseError> {
    let canonical = site_url.join(&decision.canonical_path)?;
    let json_ld = structured_data
        .filter(|_| decision.emit_structured_data)
        .map(|value| value.to_string().replace("</", "<\\/"));

    Ok(html! {
        meta name="robots" content=(decision.robots.to_string());
        link rel="canonical" href=(canonical.as_str());
        @if let Some(json) = json_ld {
            script type="application/ld+json" { (PreEscaped(json)) }
        }
    })
}

/// Render entries as a sitemap XML document.
pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let rows: Vec<(&str, Option<String>)> = entries
        .iter()
        .map(|e| {
            (
                e.url.as_str(),
                e.lastmod.map(|d| d.format("%Y-%m-%d").to_string()),
            )
        })
        .collect();

    let body = html! {
        urlset xmlns=(SITEMAP_NAMESPACE) {
            @for (loc, lastmod) in &rows {
                url {
                    loc { (loc) }
                    @if let Some(date) = lastmod {
                        lastmod { (date) }
                    }
                }
            }
        }
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n",
        body.into_string()
    )
}
