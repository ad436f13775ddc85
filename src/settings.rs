/*
BSD 2-Clause License

Copyright (c) 2022, Diagnosis and Control of Clouds Laboratory
All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.

2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

*/

//! Configuration: the closed option set of spec.md §6, loaded the way the
//! teacher's `Settings` structs are (`config::Config` merged over a typed
//! struct) but built around `Default` since every option here has a
//! compiled-in value and an override file is optional rather than
//! required.

use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use recall_common::RecallError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    // --- Extraction (C2, C4) ---
    pub theta_tc: u32,
    pub theta_rf: u64,
    pub delta_t_sec: i64,
    pub min_token_len: usize,

    // --- Graph (C5) ---
    pub graph_window_t_sec: i64,
    pub decay_lambda: Option<f64>,
    pub theta_w: f64,
    pub activity_beta: f64,
    pub activity_alpha: f64,
    pub activity_epsilon: f64,

    // --- Retrieval (C7) ---
    pub temporal_k: usize,
    pub evidence_budget_nmax: usize,
    pub degree_threshold_dmax: usize,
    pub score_a: f64,
    pub score_b: f64,
    pub score_c: f64,
    pub dedup_case_insensitive: bool,

    // --- Triggers (C6) ---
    pub enable_severity_trigger: bool,
    pub enable_burst_trigger: bool,
    pub burst_sigma: f64,
    pub burst_window_sec: i64,
    pub burst_ema_alpha: f64,
    pub trigger_keywords: Vec<String>,
    pub fatal_keywords: Vec<String>,
    pub error_keywords: Vec<String>,

    // --- Filters ---
    pub entity_blacklist_exact: Vec<String>,
    pub entity_blacklist_regex: Vec<String>,
    pub token_drop_regex: Vec<String>,
}

impl Default for RecallConfig {
    fn default() -> Self {
        RecallConfig {
            theta_tc: 2,
            theta_rf: 2,
            delta_t_sec: 300,
            min_token_len: 2,

            graph_window_t_sec: 900,
            decay_lambda: None,
            theta_w: 0.05,
            activity_beta: 0.99,
            activity_alpha: 1.0,
            activity_epsilon: 0.1,

            temporal_k: 15,
            evidence_budget_nmax: 30,
            degree_threshold_dmax: 200,
            score_a: 1.0,
            score_b: 1.0,
            score_c: 1.0,
            dedup_case_insensitive: false,

            enable_severity_trigger: true,
            enable_burst_trigger: true,
            burst_sigma: 3.0,
            burst_window_sec: 300,
            burst_ema_alpha: 0.01,
            trigger_keywords: vec![
                "error", "exception", "fail", "failed", "failure", "fatal", "panic", "critical",
                "timeout", "refused", "denied", "corrupt", "crash",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fatal_keywords: vec!["fatal", "panic", "critical", "crash", "corrupt"]
                .into_iter()
                .map(String::from)
                .collect(),
            error_keywords: vec![
                "error", "exception", "fail", "failed", "failure", "refused", "denied", "timeout",
            ]
            .into_iter()
            .map(String::from)
            .collect(),

            entity_blacklist_exact: vec!["127.0.0.1", "0.0.0.0", "localhost", "/tmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            entity_blacklist_regex: vec!["^::1$".to_string()],
            // A run of two or more dot-separated numeric groups, e.g. a
            // timestamp fragment like "08.31.21.10.99.43" that would
            // otherwise be misclassified as a meaningful entity.
            token_drop_regex: vec![r"^\d{1,4}(\.\d{1,4}){2,}$".to_string()],
        }
    }
}

impl RecallConfig {
    /// Loads the default configuration, optionally merging a TOML/JSON/YAML
    /// override file on top of it. Construction only fails if an explicitly
    /// supplied file is malformed or a field fails validation (spec.md §7
    /// "Configuration error").
    pub fn load(override_path: Option<&Path>) -> Result<RecallConfig, RecallError> {
        let cfg = match override_path {
            None => RecallConfig::default(),
            Some(path) => {
                let mut builder = Config::default();
                builder
                    .merge(File::new(
                        path.to_str().ok_or_else(|| {
                            RecallError::Configuration("override path is not valid UTF-8".into())
                        })?,
                        FileFormat::Toml,
                    ))
                    .map_err(|e| RecallError::Configuration(e.to_string()))?;
                builder
                    .try_into::<RecallConfig>()
                    .map_err(|e| RecallError::Configuration(e.to_string()))?
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), RecallError> {
        if self.theta_w < 0.0 {
            return Err(RecallError::Configuration(
                "theta_w must be non-negative".into(),
            ));
        }
        if self.activity_beta < 0.0 {
            return Err(RecallError::Configuration(
                "activity_beta must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RecallConfig::load(None).unwrap();
        assert_eq!(cfg.temporal_k, 15);
        assert_eq!(cfg.evidence_budget_nmax, 30);
    }
}
