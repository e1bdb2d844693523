//! # Stacks Models
//!
//! Wire types for the registry payload and the normalized display model
//! the rest of the application consumes. The raw types mirror the OPDS
//! registry feed shape; `LibraryDisplay` is the flat record produced by
//! the normalizer.

use serde::{Deserialize, Serialize};

/// OPDS authentication document relation
pub const REL_AUTH_DOCUMENT: &str = "http://opds-spec.org/auth/document";
/// OPDS catalog relation (the "add this library" entry point)
pub const REL_CATALOG: &str = "http://opds-spec.org/catalog";
/// Self relation
pub const REL_SELF: &str = "self";
/// Icon relation, used as a logo fallback
pub const REL_ICON: &str = "icon";

/// A typed hyperlink from the registry's link-relation vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Target URL
    pub href: String,
    /// Link relation (OPDS vocabulary or plain `self`/`icon`)
    #[serde(default)]
    pub rel: String,
    /// Media type, when the registry provides one
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Descriptive fields for one catalog
///
/// `id` and `title` default to empty strings so a sparse record still
/// deserializes; the normalizer applies its own fallbacks for both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// One library's catalog entry as published by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Link>>,
    /// Sometimes provided directly instead of a `self` link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// The registry feed: an ordered sequence of catalogs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub catalogs: Vec<Catalog>,
}

/// Normalized, consumer-facing record for one library
///
/// Produced once per session by the normalizer and held immutably
/// afterwards. `id` is unique per session only; when the source record
/// carries no id a random token is generated, so it is not stable
/// across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDisplay {
    pub id: String,
    pub name: String,
    pub description: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,
    /// 2-letter uppercase code extracted heuristically from the description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_deserializes_sparse_record() {
        let raw = r#"{"metadata": {"title": "Springfield"}}"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();

        assert_eq!(catalog.metadata.title, "Springfield");
        assert_eq!(catalog.metadata.id, "");
        assert!(catalog.links.is_empty());
        assert!(catalog.images.is_none());
        assert!(catalog.href.is_none());
    }

    #[test]
    fn test_link_type_field_is_renamed() {
        let raw =
            r#"{"href": "https://x.test/feed", "rel": "self", "type": "application/opds+json"}"#;
        let link: Link = serde_json::from_str(raw).unwrap();

        assert_eq!(link.media_type.as_deref(), Some("application/opds+json"));
    }

    #[test]
    fn test_library_display_serializes_camel_case() {
        let display = LibraryDisplay {
            id: "lib-1".to_string(),
            name: "Springfield Library".to_string(),
            description: String::new(),
            link: "https://x.test/auth".to_string(),
            logo_url: Some("https://x.test/logo.png".to_string()),
            catalog_url: None,
            state: Some("IL".to_string()),
        };

        let json = serde_json::to_value(&display).unwrap();
        assert_eq!(json["logoUrl"], "https://x.test/logo.png");
        assert!(json.get("catalogUrl").is_none());
    }
}
