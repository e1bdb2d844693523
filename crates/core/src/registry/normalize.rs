//! # Normalizer
//!
//! Maps one raw catalog record to the flat `LibraryDisplay` model. Pure
//! and total: every field degrades to a documented fallback instead of
//! failing, so a malformed record can never abort a feed load.

use crate::models::{
    Catalog, LibraryDisplay, Link, REL_AUTH_DOCUMENT, REL_CATALOG, REL_ICON, REL_SELF,
};
use rand::distr::{Alphanumeric, SampleString};
use regex::Regex;
use std::sync::LazyLock;

/// Comma, optional whitespace, then exactly two uppercase letters at a
/// word boundary (", CA" but not ", Inc." or ", INdiana")
static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([A-Z]{2})\b").expect("state pattern must compile"));

/// Normalize one raw catalog into a display record
///
/// Field resolution is order-significant and matches the registry's
/// conventions:
/// - `link` prefers the OPDS auth document, then the `self` link, then
///   the catalog's direct `href`, then a dead `"#"`.
/// - `logo_url` prefers the catalog's `images`, then `icon`/thumbnail
///   links.
/// - `state` is a heuristic over free text; see [`extract_state`].
pub fn normalize(catalog: &Catalog) -> LibraryDisplay {
    let id = if catalog.metadata.id.is_empty() {
        fallback_id()
    } else {
        catalog.metadata.id.clone()
    };

    let name = if catalog.metadata.title.is_empty() {
        "Unknown Library".to_string()
    } else {
        catalog.metadata.title.clone()
    };

    let link = find_link(&catalog.links, REL_AUTH_DOCUMENT)
        .or_else(|| find_link(&catalog.links, REL_SELF))
        .map(|l| l.href.clone())
        .or_else(|| catalog.href.clone())
        .unwrap_or_else(|| "#".to_string());

    let logo_url = catalog
        .images
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|image| !image.href.is_empty())
        .or_else(|| {
            catalog
                .links
                .iter()
                .find(|l| l.rel == REL_ICON || l.rel.contains("thumbnail"))
        })
        .map(|l| l.href.clone());

    let catalog_url = find_link(&catalog.links, REL_CATALOG).map(|l| l.href.clone());

    let state = catalog
        .metadata
        .description
        .as_deref()
        .and_then(extract_state);

    LibraryDisplay {
        id,
        name,
        description: catalog.metadata.description.clone().unwrap_or_default(),
        link,
        logo_url,
        catalog_url,
        state,
    }
}

/// Extract a 2-letter state code from a free-text description
///
/// Heuristic: the registry has no structured region field, so this
/// matches the ", CA" convention most descriptions follow. It will
/// misfire on a comma followed by an unrelated two-letter acronym;
/// known imprecision, kept as-is.
pub fn extract_state(description: &str) -> Option<String> {
    STATE_RE
        .captures(description)
        .map(|captures| captures[1].to_string())
}

fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|l| l.rel == rel)
}

/// Session-local random token for records the registry ships without an id
///
/// Collisions are not guarded against; ids are never persisted, so a
/// fresh token per normalization is enough.
fn fallback_id() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), 7)
        .to_lowercase()
}
