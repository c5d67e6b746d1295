use serde_json::{json, Map, Value};

use super::MatchType;

/// A search against one index with a resolved match type.
///
/// Can only be built from a known match type, so an unresolved query never
/// reaches a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    index: String,
    match_type: MatchType,
    payload: Map<String, Value>,
}

impl SearchQuery {
    /// Build a query, returning `None` when `match_type` is [`MatchType::Unknown`].
    pub fn new(
        index: impl Into<String>,
        match_type: MatchType,
        payload: Map<String, Value>,
    ) -> Option<Self> {
        if !match_type.is_known() {
            return None;
        }

        Some(Self {
            index: index.into(),
            match_type,
            payload,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Request body sent to the backend: `{"query": {<match_type>: payload}}`.
    pub fn body(&self) -> Value {
        let key = self.match_type.query_key().unwrap_or_default();
        let mut query = Map::new();
        query.insert(key.to_string(), Value::Object(self.payload.clone()));
        json!({ "query": query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn wraps_payload_under_match_type() {
        let query = SearchQuery::new(
            "books",
            MatchType::Fuzzy,
            payload(json!({ "title": "dune" })),
        )
        .unwrap();

        assert_eq!(query.index(), "books");
        assert_eq!(
            query.body(),
            json!({ "query": { "fuzzy": { "title": "dune" } } })
        );
    }

    #[test]
    fn match_all_with_empty_payload() {
        let query = SearchQuery::new("books", MatchType::MatchAll, Map::new()).unwrap();
        assert_eq!(query.body(), json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn unknown_match_type_builds_nothing() {
        assert!(SearchQuery::new("books", MatchType::Unknown, Map::new()).is_none());
    }
}
