//! C4 — Statistical entity extractor (spec.md §4.4): filters tokens by
//! length, drop-regex, complexity, and recurrence; splits `ip:port` tokens.

use indexmap::IndexSet;

use crate::entity::bare_ipv4;
use crate::filters::{EntityBlacklist, TokenDropFilter};
use crate::recurrence::RecurrenceCounter;
use crate::settings::RecallConfig;
use crate::text::{token_complexity, tokenize_for_entity_candidates};

pub struct StatExtractor {
    recurrence: RecurrenceCounter,
    min_token_len: usize,
    theta_tc: u32,
    theta_rf: u64,
}

impl StatExtractor {
    pub fn new(cfg: &RecallConfig) -> Self {
        StatExtractor {
            recurrence: RecurrenceCounter::new(cfg.delta_t_sec),
            min_token_len: cfg.min_token_len,
            theta_tc: cfg.theta_tc,
            theta_rf: cfg.theta_rf,
        }
    }

    /// Tokenizes `message`, feeds the recurrence counter, and returns the
    /// accepted entity-candidate set in first-seen order.
    pub fn extract(
        &mut self,
        ts: i64,
        message: &str,
        blacklist: &EntityBlacklist,
        drop_filter: &TokenDropFilter,
    ) -> IndexSet<String> {
        let tokens = tokenize_for_entity_candidates(message);
        self.recurrence.push(ts, &tokens);

        let mut accepted = IndexSet::new();
        for t in &tokens {
            if t.chars().count() < self.min_token_len {
                continue;
            }
            if drop_filter.is_dropped(t) {
                continue;
            }
            if let Some(bare) = bare_ipv4(t) {
                if !blacklist.is_blacklisted(bare) {
                    accepted.insert(bare.to_string());
                }
            }
            if !blacklist.is_blacklisted(t)
                && token_complexity(t) as u32 > self.theta_tc
                && self.recurrence.rf(t) > self.theta_rf
            {
                accepted.insert(t.clone());
            }
        }
        accepted
    }
}
