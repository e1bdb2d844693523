//! # Directory
//!
//! The immutable session snapshot of normalized libraries and its two
//! derived views: the set of states present and the filtered subset for
//! a search query / state selection. Both views are pure, synchronous
//! derivations over the snapshot; filtering preserves source order.

use crate::models::LibraryDisplay;
use std::collections::BTreeSet;

/// One session's normalized library collection
///
/// Created once after a feed load and read-only thereafter. A reload
/// builds a fresh snapshot rather than mutating this one.
#[derive(Debug, Clone, Default)]
pub struct LibraryDirectory {
    libraries: Vec<LibraryDisplay>,
}

impl LibraryDirectory {
    pub fn new(libraries: Vec<LibraryDisplay>) -> Self {
        Self { libraries }
    }

    /// The full normalized collection, in feed order
    pub fn libraries(&self) -> &[LibraryDisplay] {
        &self.libraries
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Distinct non-empty state codes, ascending lexical order
    pub fn available_states(&self) -> Vec<String> {
        let states: BTreeSet<&str> = self
            .libraries
            .iter()
            .filter_map(|lib| lib.state.as_deref())
            .filter(|state| !state.is_empty())
            .collect();
        states.into_iter().map(String::from).collect()
    }

    /// Libraries matching a text query and/or a selected state
    ///
    /// A record passes when the trimmed query is empty or appears
    /// case-insensitively in its name or description, AND no state is
    /// selected or its state equals the selection exactly. Source
    /// order is preserved.
    pub fn filter(&self, query: &str, state: Option<&str>) -> Vec<&LibraryDisplay> {
        let needle = query.trim().to_lowercase();

        self.libraries
            .iter()
            .filter(|lib| {
                let matches_search = needle.is_empty()
                    || lib.name.to_lowercase().contains(&needle)
                    || lib.description.to_lowercase().contains(&needle);

                let matches_state = match state {
                    None | Some("") => true,
                    Some(selected) => lib.state.as_deref() == Some(selected),
                };

                matches_search && matches_state
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(id: &str, name: &str, description: &str, state: Option<&str>) -> LibraryDisplay {
        LibraryDisplay {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            link: "#".to_string(),
            logo_url: None,
            catalog_url: None,
            state: state.map(String::from),
        }
    }

    fn sample_directory() -> LibraryDirectory {
        LibraryDirectory::new(vec![
            library("1", "My Library", "Springfield, CA area", Some("CA")),
            library("2", "Valley Books", "Open to all, CA residents", Some("CA")),
            library("3", "Lone Star Reads", "Austin, TX community", Some("TX")),
            library("4", "Statewide Digital", "No region listed", None),
        ])
    }

    #[test]
    fn test_available_states_deduped_and_sorted() {
        let directory = sample_directory();
        assert_eq!(directory.available_states(), vec!["CA", "TX"]);
    }

    #[test]
    fn test_state_filter_preserves_source_order() {
        let directory = sample_directory();
        let matches = directory.filter("", Some("CA"));

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "1");
        assert_eq!(matches[1].id, "2");
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let directory = sample_directory();
        let matches = directory.filter("lib", None);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "My Library");
    }

    #[test]
    fn test_search_matches_description_too() {
        let directory = sample_directory();
        let matches = directory.filter("austin", None);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "3");
    }

    #[test]
    fn test_query_is_trimmed_before_matching() {
        let directory = sample_directory();
        assert_eq!(directory.filter("  lib  ", None).len(), 1);
    }

    #[test]
    fn test_empty_query_and_no_state_pass_everything() {
        let directory = sample_directory();
        assert_eq!(directory.filter("", None).len(), 4);
        assert_eq!(directory.filter("   ", Some("")).len(), 4);
    }

    #[test]
    fn test_query_and_state_combine_with_and() {
        let directory = sample_directory();
        let matches = directory.filter("valley", Some("CA"));

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "2");

        assert!(directory.filter("valley", Some("TX")).is_empty());
    }
}
