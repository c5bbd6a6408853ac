//! Manually triggered species taxonomy search.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::models::Tag;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;
/// Shorter (trimmed) queries are never sent.
pub const MIN_QUERY_LEN: usize = 2;

/// Tag key used when a candidate is applied as a tag.
pub const SPECIES_TAG_KEY: &str = "species";

/// A taxon suggested by the taxonomy service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCandidate {
    pub usage_key: String,
    pub canonical_name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub synonym: Option<bool>,
    #[serde(default)]
    pub dataset_key: Option<String>,
}

impl SpeciesCandidate {
    pub fn to_tag(&self) -> Tag {
        Tag::new(SPECIES_TAG_KEY, self.canonical_name.clone())
    }
}

/// A search to run, tagged with the request id it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesQuery {
    pub request_id: u64,
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct SpeciesSearch {
    query: String,
    limit: usize,
    enabled: bool,
    request_id: u64,
    in_flight: bool,
    results: Vec<SpeciesCandidate>,
    error: Option<SearchError>,
}

impl Default for SpeciesSearch {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: DEFAULT_LIMIT,
            enabled: true,
            request_id: 0,
            in_flight: false,
            results: Vec::new(),
            error: None,
        }
    }
}

impl SpeciesSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(1, MAX_LIMIT);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn can_search(&self) -> bool {
        self.enabled && self.query.trim().chars().count() >= MIN_QUERY_LEN
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn results(&self) -> &[SpeciesCandidate] {
        &self.results
    }

    pub fn error(&self) -> Option<&SearchError> {
        self.error.as_ref()
    }

    /// Start a search for the current query. Every trigger gets a new
    /// request id, so pressing search again refetches.
    pub fn trigger(&mut self) -> Option<SpeciesQuery> {
        if !self.can_search() {
            return None;
        }
        self.request_id += 1;
        self.in_flight = true;
        self.error = None;
        let query = self.query.trim().to_string();
        tracing::debug!(request = self.request_id, query = %query, "Searching species");
        Some(SpeciesQuery {
            request_id: self.request_id,
            query,
            limit: self.limit,
        })
    }

    /// Apply a search result. Returns false for superseded requests.
    pub fn handle_response(
        &mut self,
        request_id: u64,
        result: Result<Vec<SpeciesCandidate>, SearchError>,
    ) -> bool {
        if request_id != self.request_id || !self.in_flight {
            tracing::debug!(request = request_id, current = self.request_id, "Discarding stale search");
            return false;
        }
        self.in_flight = false;
        match result {
            Ok(mut candidates) => {
                candidates.truncate(self.limit);
                self.results = candidates;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Species search failed");
                self.results.clear();
                self.error = Some(e);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.error = None;
        self.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> SpeciesCandidate {
        SpeciesCandidate {
            usage_key: name.len().to_string(),
            canonical_name: name.to_string(),
            scientific_name: None,
            rank: Some("SPECIES".to_string()),
            synonym: None,
            dataset_key: None,
        }
    }

    #[test]
    fn test_short_queries_not_sent() {
        let mut search = SpeciesSearch::new();
        search.set_query("  a ");
        assert!(search.trigger().is_none());
        search.set_query(" my ");
        let query = search.trigger().unwrap();
        assert_eq!(query.query, "my");
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_disabled_search() {
        let mut search = SpeciesSearch::new();
        search.set_query("Myotis");
        search.set_enabled(false);
        assert!(search.trigger().is_none());
    }

    #[test]
    fn test_limit_clamped() {
        let mut search = SpeciesSearch::new();
        search.set_limit(0);
        assert_eq!(search.limit(), 1);
        search.set_limit(500);
        assert_eq!(search.limit(), MAX_LIMIT);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut search = SpeciesSearch::new();
        search.set_query("Myotis");
        let first = search.trigger().unwrap();
        let second = search.trigger().unwrap();
        assert!(second.request_id > first.request_id);

        assert!(!search.handle_response(first.request_id, Ok(vec![candidate("old")])));
        assert!(search.results().is_empty());
        assert!(search.is_loading());

        assert!(search.handle_response(second.request_id, Ok(vec![candidate("Myotis daubentonii")])));
        assert_eq!(search.results().len(), 1);
        assert!(!search.is_loading());
    }

    #[test]
    fn test_error_kept_until_next_trigger() {
        let mut search = SpeciesSearch::new();
        search.set_query("Myotis");
        let q = search.trigger().unwrap();
        search.handle_response(q.request_id, Err(SearchError::Status { status: 502 }));
        assert!(search.error().is_some());
        search.trigger();
        assert!(search.error().is_none());
    }

    #[test]
    fn test_candidate_deserializes_with_missing_optionals() {
        let json = r#"[{"usage_key": "2432", "canonical_name": "Pipistrellus pipistrellus"}]"#;
        let parsed: Vec<SpeciesCandidate> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].rank, None);
        assert_eq!(parsed[0].to_tag(), Tag::new("species", "Pipistrellus pipistrellus"));
    }
}
