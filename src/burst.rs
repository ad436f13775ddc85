//! C3 — Burst detector: per-template-key EMA of mean/variance over a
//! sliding window, gated by a σ-threshold (spec.md §4.3).

use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct TemplateState {
    window: VecDeque<i64>,
    mean: f64,
    var: f64,
    initialized: bool,
}

impl TemplateState {
    fn new() -> Self {
        TemplateState {
            window: VecDeque::new(),
            mean: 0.0,
            var: 0.0,
            initialized: false,
        }
    }
}

/// Streaming burst detector keyed by masked template.
#[derive(Debug)]
pub struct BurstDetector {
    window_sec: i64,
    alpha: f64,
    sigma: f64,
    templates: HashMap<String, TemplateState>,
}

impl BurstDetector {
    pub fn new(window_sec: i64, alpha: f64, sigma: f64) -> Self {
        BurstDetector {
            window_sec,
            alpha,
            sigma,
            templates: HashMap::new(),
        }
    }

    /// Feeds one arrival of `key` at `ts`. Returns `true` iff this arrival
    /// constitutes a burst. The very first observation of a new key never
    /// fires.
    pub fn observe(&mut self, ts: i64, key: &str) -> bool {
        let state = self
            .templates
            .entry(key.to_string())
            .or_insert_with(TemplateState::new);

        state.window.push_back(ts);
        if self.window_sec > 0 {
            let cutoff = ts - self.window_sec;
            while let Some(&front) = state.window.front() {
                if front < cutoff {
                    state.window.pop_front();
                } else {
                    break;
                }
            }
        }
        let x = state.window.len() as f64;

        if !state.initialized {
            state.mean = x;
            state.var = 0.0;
            state.initialized = true;
            return false;
        }

        let old_mean = state.mean;
        let new_mean = (1.0 - self.alpha) * state.mean + self.alpha * x;
        let new_var =
            (1.0 - self.alpha) * state.var + self.alpha * (x - old_mean) * (x - new_mean);
        state.mean = new_mean;
        state.var = new_var;

        let threshold = new_mean + self.sigma * new_var.max(0.0).sqrt();
        threshold > 1.0 && x > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fires_on_first_observation() {
        let mut d = BurstDetector::new(300, 0.01, 3.0);
        assert!(!d.observe(1000, "conn reset from <NUM>"));
    }

    #[test]
    fn fires_after_repeated_bursty_arrivals() {
        let mut d = BurstDetector::new(300, 0.5, 1.0);
        let key = "conn reset from <NUM>";
        let mut fired = false;
        for i in 0..20 {
            if d.observe(1000 + i, key) {
                fired = true;
            }
        }
        assert!(fired, "expected burst detector to fire under sustained load");
    }

    #[test]
    fn distinct_keys_have_independent_state() {
        let mut d = BurstDetector::new(300, 0.5, 3.0);
        for i in 0..10 {
            d.observe(1000 + i, "a");
        }
        // "b" is brand new, so its first observation must never fire
        // regardless of how bursty "a" has become.
        assert!(!d.observe(1010, "b"));
    }
}
