use std::fmt;

/// Query strategy used when searching an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    /// Elasticsearch `fuzzy` query.
    Fuzzy,
    /// Elasticsearch `match_all` query.
    MatchAll,
    /// Anything that did not resolve. Never sent to the backend.
    Unknown,
}

impl MatchType {
    /// Resolve a client-supplied match type.
    ///
    /// Aliases compare case-insensitively: `fuzzy` resolves to [`MatchType::Fuzzy`];
    /// `match_all`, `matchall` and `match` resolve to [`MatchType::MatchAll`].
    /// Every other string is [`MatchType::Unknown`].
    pub fn resolve(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "fuzzy" => MatchType::Fuzzy,
            "match_all" | "matchall" | "match" => MatchType::MatchAll,
            _ => MatchType::Unknown,
        }
    }

    /// Query key understood by the backend, or `None` for [`MatchType::Unknown`].
    pub fn query_key(self) -> Option<&'static str> {
        match self {
            MatchType::Fuzzy => Some("fuzzy"),
            MatchType::MatchAll => Some("match_all"),
            MatchType::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        self != MatchType::Unknown
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_key().unwrap_or("?"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fuzzy_aliases() {
        for alias in ["fuzzy", "Fuzzy", "FUZZY"] {
            assert_eq!(MatchType::resolve(alias), MatchType::Fuzzy, "{}", alias);
        }
    }

    #[test]
    fn resolves_match_all_aliases() {
        for alias in ["match_all", "MatchAll", "match", "MATCH_ALL"] {
            assert_eq!(MatchType::resolve(alias), MatchType::MatchAll, "{}", alias);
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        for value in ["bogus", "", "term", "fuzzy ", "match-all", "?"] {
            assert_eq!(MatchType::resolve(value), MatchType::Unknown, "{:?}", value);
        }
    }

    #[test]
    fn unknown_has_no_query_key() {
        assert_eq!(MatchType::Fuzzy.query_key(), Some("fuzzy"));
        assert_eq!(MatchType::MatchAll.query_key(), Some("match_all"));
        assert_eq!(MatchType::Unknown.query_key(), None);
        assert!(!MatchType::Unknown.is_known());
        assert_eq!(MatchType::Unknown.to_string(), "?");
    }
}
