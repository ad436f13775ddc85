//! C10 — Pipeline orchestrator: the per-record data flow (spec.md §2 data
//! flow line, §4.9-4.10 wiring, §6 output shape).

use recall_common::{OutputRecord, Prediction, Record, RetrievalSummary};

use crate::entity::EntityType;
use crate::evidence::package;
use crate::extractor::StatExtractor;
use crate::filters::{EntityBlacklist, TokenDropFilter};
use crate::graph::LogEntityGraph;
use crate::llm::{parse_decision, Decider};
use crate::prompt::build as build_prompt;
use crate::retrieval::retrieve;
use crate::settings::RecallConfig;
use crate::trigger::TriggerEngine;

/// Owns the long-lived components (§5 "single-threaded cooperative
/// pipeline"): the extractor's recurrence window, the trigger engine's
/// burst state, and the graph, are all shared mutable state across records.
pub struct Pipeline {
    cfg: RecallConfig,
    extractor: StatExtractor,
    trigger: TriggerEngine,
    graph: LogEntityGraph,
    blacklist: EntityBlacklist,
    drop_filter: TokenDropFilter,
}

impl Pipeline {
    pub fn new(cfg: RecallConfig) -> Self {
        let extractor = StatExtractor::new(&cfg);
        let trigger = TriggerEngine::new(&cfg);
        let graph = LogEntityGraph::new(&cfg);
        let blacklist = EntityBlacklist::from_config(&cfg);
        let drop_filter = TokenDropFilter::from_config(&cfg);
        Pipeline {
            cfg,
            extractor,
            trigger,
            graph,
            blacklist,
            drop_filter,
        }
    }

    /// Runs one record through C4 → C5 → C6 and, if triggered, C7 → C8 →
    /// C9 → the external collaborator, producing the full output mapping.
    pub fn process(&mut self, record: &Record, decider: &dyn Decider) -> OutputRecord {
        let entities_stat = self
            .extractor
            .extract(record.ts_sec, &record.message, &self.blacklist, &self.drop_filter);
        let entities_stat: Vec<String> = entities_stat.into_iter().collect();

        let entities_stat_validated: Vec<String> = entities_stat
            .iter()
            .filter(|e| !self.blacklist.is_blacklisted(e))
            .cloned()
            .collect();

        let severity = self.trigger.severity_level(&record.message);

        self.graph.add_log(
            record.log_id,
            record.ts_sec,
            &record.message,
            &entities_stat_validated,
            severity,
        );
        self.graph.tick(record.ts_sec);

        let (triggered, trigger_by) = self.trigger.evaluate(record.ts_sec, &record.message);

        let entities_sem = semantic_channel(&self.graph, &entities_stat_validated, &record.message);
        let entities_final = entities_stat_validated.clone();

        let (prediction, retrieval, prompt_len) = if triggered {
            let items = retrieve(&self.cfg, &self.graph, &self.trigger, record.log_id);
            let evidence_log_ids: Vec<i64> = items.iter().map(|i| i.log_id).collect();
            let evidence_count = items.len();

            match package(&self.cfg, &self.graph, record.log_id, &items) {
                Ok(pkg) => match build_prompt(&self.graph, record.log_id, &pkg) {
                    Ok(prompt) => {
                        let prompt_len = prompt.len();
                        let prediction = run_decider(decider, &prompt);
                        (
                            prediction,
                            Some(RetrievalSummary {
                                evidence_count,
                                evidence_log_ids,
                            }),
                            Some(prompt_len),
                        )
                    }
                    Err(e) => (
                        Prediction::with_error(e.to_string()),
                        Some(RetrievalSummary {
                            evidence_count,
                            evidence_log_ids,
                        }),
                        None,
                    ),
                },
                Err(e) => (
                    Prediction::with_error(e.to_string()),
                    Some(RetrievalSummary {
                        evidence_count,
                        evidence_log_ids,
                    }),
                    None,
                ),
            }
        } else {
            (Prediction::default_normal(), None, None)
        };

        OutputRecord {
            log_id: record.log_id,
            timestamp: record.ts_sec,
            message: record.message.clone(),
            true_label: record.true_label,
            triggered,
            trigger_by,
            severity,
            entities_stat,
            entities_stat_validated,
            entities_sem,
            entities_final,
            prediction,
            retrieval,
            prompt_len,
        }
    }
}

/// Calls the external collaborator and turns whatever comes back (or the
/// transport error) into a `Prediction` (spec.md §7 "external I/O error").
fn run_decider(decider: &dyn Decider, prompt: &str) -> Prediction {
    match decider.decide(prompt) {
        Ok(raw) => Prediction::from_outcome(parse_decision(&raw)),
        Err(e) => Prediction::with_error(e),
    }
}

/// §9 design note / open question 3: substring presence in the raw message,
/// looser than exact containment for IPv4 entities (bare IP *or* `"ip:"`
/// substring also counts).
fn semantic_channel(graph: &LogEntityGraph, entities: &[String], message: &str) -> Vec<String> {
    entities
        .iter()
        .filter(|e| {
            if graph.entity_type(e) == Some(EntityType::Ip) {
                message.contains(e.as_str()) || message.contains("ip:")
            } else {
                message.contains(e.as_str())
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FixedDecider, NullDecider};

    fn rec(log_id: i64, ts: i64, msg: &str) -> Record {
        Record {
            log_id,
            ts_sec: ts,
            message: msg.to_string(),
            true_label: 0,
        }
    }

    #[test]
    fn untriggered_record_gets_default_normal_prediction() {
        let mut p = Pipeline::new(RecallConfig::default());
        let out = p.process(&rec(1, 1000, "connection established"), &NullDecider);
        assert!(!out.triggered);
        assert!(out.retrieval.is_none());
        assert!(out.prompt_len.is_none());
        assert_eq!(out.prediction.label, recall_common::Label::Normal);
    }

    #[test]
    fn triggered_record_runs_full_flow_with_fixed_decider() {
        let mut p = Pipeline::new(RecallConfig::default());
        let decider = FixedDecider {
            response: r#"{"label": "ANOMALY", "confidence": 0.9, "evidence_ids": ["L1"], "rationale": "burst"}"#
                .to_string(),
        };
        for i in 0..3 {
            p.process(&rec(i, 1000 + i, "connection reset from node-7"), &NullDecider);
        }
        let out = p.process(&rec(3, 1003, "fatal error on node-7"), &decider);
        assert!(out.triggered);
        assert!(out.retrieval.is_some());
        assert!(out.prompt_len.is_some());
        assert_eq!(out.prediction.label, recall_common::Label::Anomaly);
    }

    #[test]
    fn graph_stores_real_severity_not_zero() {
        let mut p = Pipeline::new(RecallConfig::default());
        let out = p.process(&rec(0, 1000, "fatal error on node-7"), &NullDecider);
        assert_eq!(out.severity, 3);
        assert_eq!(p.graph.get_log(0).map(|(_, _, sev)| sev), Some(3));
    }

    #[test]
    fn triggered_record_with_disabled_collaborator_reports_llm_error() {
        let mut p = Pipeline::new(RecallConfig::default());
        let out = p.process(&rec(0, 1000, "fatal error near node-1"), &NullDecider);
        assert!(out.triggered);
        assert_eq!(out.prediction.label, recall_common::Label::Normal);
        assert!(out.prediction.llm_error.is_some());
    }

    #[test]
    fn entities_sem_is_subset_of_entities_stat_validated() {
        let mut p = Pipeline::new(RecallConfig::default());
        let out = p.process(&rec(0, 1000, "refused connection from 10.0.0.9:8080"), &NullDecider);
        for e in &out.entities_sem {
            assert!(out.entities_stat_validated.contains(e));
        }
    }
}
