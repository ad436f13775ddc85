//! C7 — Dual-path retriever: a k-hop temporal walk plus a 2-hop structural
//! walk, deduped, scored, and budget-truncated (spec.md §4.8).

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use log::debug;
use recall_common::PathKind;

use crate::graph::LogEntityGraph;
use crate::settings::RecallConfig;
use crate::text::normalize_message_for_dedup;
use crate::trigger::TriggerEngine;

#[derive(Debug, Clone)]
pub struct EvidenceItem {
    pub log_id: i64,
    pub ts: i64,
    pub message: String,
    pub severity: u8,
    pub dist: usize,
    pub score: f64,
    pub edge_weight: f64,
    pub paths: Vec<PathKind>,
    pub shared_entities: Vec<String>,
    pub time_offset: Option<i64>,
}

struct Candidate {
    dist: usize,
    paths: HashSet<PathKind>,
    shared_entities: BTreeSet<String>,
}

impl Candidate {
    fn empty() -> Self {
        Candidate {
            dist: usize::MAX,
            paths: HashSet::new(),
            shared_entities: BTreeSet::new(),
        }
    }
}

/// Runs the dual-path walk from `target_log_id` and returns up to
/// `cfg.evidence_budget_nmax` scored, deduplicated evidence items ordered
/// by `(score desc, ts desc)`.
pub fn retrieve(
    cfg: &RecallConfig,
    graph: &LogEntityGraph,
    trigger: &TriggerEngine,
    target_log_id: i64,
) -> Vec<EvidenceItem> {
    let (target_ts, _, _) = match graph.get_log(target_log_id) {
        Some(t) => t,
        None => return Vec::new(),
    };
    let now = target_ts;

    let mut candidates: IndexMap<i64, Candidate> = IndexMap::new();

    // --- structural candidates (distance 2, shared entity) --------------
    let mut target_entities = graph.log_entities(target_log_id);
    target_entities.sort();
    for e in &target_entities {
        if graph.entity_degree(e) > cfg.degree_threshold_dmax {
            continue; // hub: skip to avoid dominating cost
        }
        for lid in graph.get_logs_for_entity(e) {
            if lid == target_log_id {
                continue;
            }
            let entry = candidates.entry(lid).or_insert_with(Candidate::empty);
            entry.dist = entry.dist.min(2);
            entry.paths.insert(PathKind::Struct);
            entry.shared_entities.insert(e.clone());
        }
    }

    // --- temporal candidates (k-hop prev/next walk) ----------------------
    if cfg.temporal_k > 0 {
        for (lid, hops) in graph.walk_temporal(target_log_id, cfg.temporal_k, false) {
            let entry = candidates.entry(lid).or_insert_with(Candidate::empty);
            entry.dist = entry.dist.min(hops);
            entry.paths.insert(PathKind::Time);
        }
        for (lid, hops) in graph.walk_temporal(target_log_id, cfg.temporal_k, true) {
            let entry = candidates.entry(lid).or_insert_with(Candidate::empty);
            entry.dist = entry.dist.min(hops);
            entry.paths.insert(PathKind::Time);
        }
    }

    // --- dedup by normalized message: keep the largest ts per group,
    // ties keep whichever was encountered first ------------------------
    let mut chosen_for_key: IndexMap<String, i64> = IndexMap::new();
    let mut ts_for_key: HashMap<String, i64> = HashMap::new();
    for &lid in candidates.keys() {
        let (ts, msg, _) = match graph.get_log(lid) {
            Some(v) => v,
            None => continue,
        };
        let key = normalize_message_for_dedup(msg, cfg.dedup_case_insensitive);
        if key.is_empty() {
            continue;
        }
        match ts_for_key.get(&key) {
            None => {
                ts_for_key.insert(key.clone(), ts);
                chosen_for_key.insert(key, lid);
            }
            Some(&cur_ts) if ts > cur_ts => {
                ts_for_key.insert(key.clone(), ts);
                chosen_for_key.insert(key, lid);
            }
            _ => {}
        }
    }

    // --- edge weight, severity fallback, scoring -------------------------
    let mut evidence = Vec::new();
    for &lid in chosen_for_key.values() {
        let cand = &candidates[&lid];
        let (ts, message, stored_severity) = graph.get_log(lid).unwrap();
        let severity = if stored_severity == 0 {
            trigger.severity_level(message)
        } else {
            stored_severity
        };
        let dist = cand.dist.max(1);

        let temporal_w = if cand.paths.contains(&PathKind::Time) {
            graph.chain_weight(target_log_id, lid, now)
        } else {
            0.0
        };
        let structural_w = if cand.paths.contains(&PathKind::Struct) && !cand.shared_entities.is_empty()
        {
            let w_target = graph
                .structural_edge_weight(target_log_id, "", now)
                .unwrap_or(0.0);
            let w_lid = graph.structural_edge_weight(lid, "", now).unwrap_or(0.0);
            w_target.min(w_lid)
        } else {
            0.0
        };
        let edge_weight = temporal_w.max(structural_w);

        let score =
            cfg.score_a * severity as f64 + cfg.score_b * (1.0 / dist as f64) + cfg.score_c * edge_weight;

        let time_offset = if cand.paths.contains(&PathKind::Time) {
            Some(ts - target_ts)
        } else {
            None
        };

        let mut paths: Vec<PathKind> = cand.paths.iter().copied().collect();
        paths.sort_by_key(|p| matches!(p, PathKind::Time));

        evidence.push(EvidenceItem {
            log_id: lid,
            ts,
            message: message.to_string(),
            severity,
            dist,
            score,
            edge_weight,
            paths,
            shared_entities: cand.shared_entities.iter().cloned().collect(),
            time_offset,
        });
    }

    evidence.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.ts.cmp(&a.ts))
    });
    if evidence.len() > cfg.evidence_budget_nmax {
        debug!(
            "truncating retrieval for log {} from {} to {} items",
            target_log_id,
            evidence.len(),
            cfg.evidence_budget_nmax
        );
    }
    evidence.truncate(cfg.evidence_budget_nmax);
    evidence
}
