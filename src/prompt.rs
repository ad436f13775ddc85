//! C9 — Prompt builder: exact concatenation order (spec.md §4.10).

use recall_common::RecallError;

use crate::evidence::EvidencePackage;
use crate::graph::LogEntityGraph;

const SYSTEM_PREFIX: &str = "You are an SRE triage assistant. You will be shown a target log line \
(id L0) plus evidence logs (L1..Ln) and entities (E1..Em) drawn from a \
log-entity graph. Respond with a single JSON object of the form \
{\"label\": \"ANOMALY\"|\"NORMAL\", \"confidence\": 0..1, \"evidence_ids\": [...], \"rationale\": \"...\"}. \
evidence_ids must reference the L/E identifiers above.";

const OUTPUT_SCHEMA: &str = "Respond with exactly one JSON object: \
{\"label\": \"ANOMALY\"|\"NORMAL\", \"confidence\": <float 0..1>, \"evidence_ids\": [\"L1\", \"E2\", ...], \"rationale\": \"<short explanation>\"}";

/// Builds the full prompt string for `target_log_id` given its already
/// packaged evidence (spec.md §4.10). Fails the same way `package` does if
/// the target has since aged out of the graph.
pub fn build(
    graph: &LogEntityGraph,
    target_log_id: i64,
    pkg: &EvidencePackage,
) -> Result<String, RecallError> {
    let (ts, message, severity) = graph
        .get_log(target_log_id)
        .ok_or(RecallError::TargetNotResident(target_log_id))?;

    let target_block = format!("L0: ts={} severity={} {}", ts, severity, message);

    let graph_pack_json = serde_json::to_string_pretty(&pkg.graph_pack)
        .map_err(|e| RecallError::Configuration(e.to_string()))?;

    let prompt = format!(
        "{}\n\n{}\n\n{}\n\n=== TOPOLOGICAL EVIDENCE (GraphPack as JSON) ===\n{}\n\n{}",
        SYSTEM_PREFIX, target_block, pkg.text_pack, graph_pack_json, OUTPUT_SCHEMA
    );
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::package;
    use crate::extractor::StatExtractor;
    use crate::filters::{EntityBlacklist, TokenDropFilter};
    use crate::retrieval::retrieve;
    use crate::settings::RecallConfig;
    use crate::trigger::TriggerEngine;

    #[test]
    fn prompt_contains_sections_in_order() {
        let cfg = RecallConfig::default();
        let mut graph = LogEntityGraph::new(&cfg);
        let mut extractor = StatExtractor::new(&cfg);
        let bl = EntityBlacklist::from_config(&cfg);
        let drop = TokenDropFilter::from_config(&cfg);
        let trigger = TriggerEngine::new(&cfg);

        for i in 0..3 {
            let msg = format!("fatal error near node-{}", i);
            let entities: Vec<String> = extractor
                .extract(1000 + i, &msg, &bl, &drop)
                .into_iter()
                .collect();
            graph.add_log(i, 1000 + i, &msg, &entities, 3);
            graph.tick(1000 + i);
        }
        let items = retrieve(&cfg, &graph, &trigger, 2);
        let pkg = package(&cfg, &graph, 2, &items).unwrap();
        let prompt = build(&graph, 2, &pkg).unwrap();

        let text_idx = prompt.find("=== TEXT EVIDENCE").unwrap();
        let graph_idx = prompt.find("=== TOPOLOGICAL EVIDENCE").unwrap();
        let schema_idx = prompt.find("Respond with exactly one JSON object").unwrap();
        assert!(text_idx < graph_idx);
        assert!(graph_idx < schema_idx);
        assert!(prompt.contains("L0: ts=1002"));
    }

    #[test]
    fn missing_target_is_an_error() {
        let cfg = RecallConfig::default();
        let graph = LogEntityGraph::new(&cfg);
        let pkg = EvidencePackage {
            target_id: "L0".to_string(),
            log_ids: Default::default(),
            entity_ids: Default::default(),
            text_pack: String::new(),
            graph_pack: crate::evidence::GraphPack {
                nodes: Vec::new(),
                edges: Vec::new(),
                summary: Vec::new(),
            },
        };
        match build(&graph, 999, &pkg) {
            Err(RecallError::TargetNotResident(id)) => assert_eq!(id, 999),
            other => panic!("expected TargetNotResident, got {:?}", other),
        }
    }
}
