//! C6 — Trigger engine: severity + burst fusion (spec.md §4.7).

use log::debug;
use recall_common::TriggerBy;

use crate::burst::BurstDetector;
use crate::settings::RecallConfig;
use crate::text::mask_for_template_key;

pub struct TriggerEngine {
    burst: BurstDetector,
    enable_severity: bool,
    enable_burst: bool,
    trigger_keywords: Vec<String>,
    fatal_keywords: Vec<String>,
    error_keywords: Vec<String>,
}

impl TriggerEngine {
    pub fn new(cfg: &RecallConfig) -> Self {
        TriggerEngine {
            burst: BurstDetector::new(cfg.burst_window_sec, cfg.burst_ema_alpha, cfg.burst_sigma),
            enable_severity: cfg.enable_severity_trigger,
            enable_burst: cfg.enable_burst_trigger,
            trigger_keywords: lower_all(&cfg.trigger_keywords),
            fatal_keywords: lower_all(&cfg.fatal_keywords),
            error_keywords: lower_all(&cfg.error_keywords),
        }
    }

    /// First-match severity cascade: fatal → 3, error → 2, `warn`/`warning`
    /// substring → 1, else 0.
    pub fn severity_level(&self, message: &str) -> u8 {
        let lower = message.to_lowercase();
        if self.fatal_keywords.iter().any(|k| lower.contains(k)) {
            3
        } else if self.error_keywords.iter().any(|k| lower.contains(k)) {
            2
        } else if lower.contains("warn") || lower.contains("warning") {
            1
        } else {
            0
        }
    }

    /// Evaluates severity, then burst, returning the first trigger that
    /// fires (or `TriggerBy::None`).
    pub fn evaluate(&mut self, ts: i64, message: &str) -> (bool, TriggerBy) {
        if self.enable_severity {
            let lower = message.to_lowercase();
            if self.trigger_keywords.iter().any(|k| lower.contains(k)) {
                debug!("severity trigger fired at ts={}", ts);
                return (true, TriggerBy::Severity);
            }
        }
        if self.enable_burst {
            let key = mask_for_template_key(message);
            if self.burst.observe(ts, &key) {
                debug!("burst trigger fired at ts={} for template {:?}", ts, key);
                return (true, TriggerBy::Burst);
            }
        }
        (false, TriggerBy::None)
    }
}

fn lower_all(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_beats_error_beats_warn() {
        let engine = TriggerEngine::new(&RecallConfig::default());
        assert_eq!(engine.severity_level("fatal error on node-7"), 3);
        assert_eq!(engine.severity_level("error: disk failure"), 2);
        assert_eq!(engine.severity_level("warn: disk 80%"), 1);
        assert_eq!(engine.severity_level("connection established"), 0);
    }

    #[test]
    fn severity_trigger_fires_on_keyword() {
        let mut engine = TriggerEngine::new(&RecallConfig::default());
        let (fired, by) = engine.evaluate(1000, "fatal error on node-7");
        assert!(fired);
        assert_eq!(by, TriggerBy::Severity);
    }

    #[test]
    fn disabled_severity_trigger_falls_through_to_burst() {
        let mut cfg = RecallConfig::default();
        cfg.enable_severity_trigger = false;
        cfg.enable_burst_trigger = false;
        let mut engine = TriggerEngine::new(&cfg);
        let (fired, by) = engine.evaluate(1000, "fatal error on node-7");
        assert!(!fired);
        assert_eq!(by, TriggerBy::None);
    }
}
