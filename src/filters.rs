//! Entity blacklist and token-drop filtering (spec.md §6 "Filters"), shared
//! by the extractor (C4) and the graph (C5) so that a blacklisted entity
//! can never enter either.

use std::collections::HashSet;

use regex::Regex;

use crate::settings::RecallConfig;

/// Compiled blacklist: an exact-match set plus a list of regexes.
pub struct EntityBlacklist {
    exact: HashSet<String>,
    regex: Vec<Regex>,
}

impl EntityBlacklist {
    pub fn from_config(cfg: &RecallConfig) -> Self {
        let exact = cfg.entity_blacklist_exact.iter().cloned().collect();
        let regex = cfg
            .entity_blacklist_regex
            .iter()
            .map(|pat| Regex::new(pat).expect("invalid entity_blacklist_regex pattern"))
            .collect();
        EntityBlacklist { exact, regex }
    }

    pub fn is_blacklisted(&self, value: &str) -> bool {
        if self.exact.contains(value) {
            return true;
        }
        self.regex.iter().any(|re| re.is_match(value))
    }
}

/// Compiled `token_drop_regex` list: tokens matching any pattern here are
/// never considered as entity candidates.
pub struct TokenDropFilter {
    patterns: Vec<Regex>,
}

impl TokenDropFilter {
    pub fn from_config(cfg: &RecallConfig) -> Self {
        let patterns = cfg
            .token_drop_regex
            .iter()
            .map(|pat| Regex::new(pat).expect("invalid token_drop_regex pattern"))
            .collect();
        TokenDropFilter { patterns }
    }

    pub fn is_dropped(&self, tok: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(tok))
    }
}
