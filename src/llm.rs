//! External LLM collaborator capability (spec.md §9 design note): a
//! pluggable `chat(prompt) -> string` operation plus a parser that turns
//! whatever comes back into a tagged `DecisionOutcome`. The core never
//! depends on which backend satisfies `Decider`.

use log::warn;
use recall_common::{Decision, DecisionOutcome, Label};

/// A pluggable chat-completion capability. Implementations decide how (or
/// whether) to actually reach an LLM; the core only calls `decide`.
pub trait Decider {
    fn decide(&self, prompt: &str) -> Result<String, String>;
}

/// Used when the external collaborator is disabled: every call fails
/// immediately, so no operation ever blocks (spec.md §5).
pub struct NullDecider;

impl Decider for NullDecider {
    fn decide(&self, _prompt: &str) -> Result<String, String> {
        Err("llm collaborator disabled".to_string())
    }
}

/// Returns a fixed canned response, useful for tests and offline replay.
pub struct FixedDecider {
    pub response: String,
}

impl Decider for FixedDecider {
    fn decide(&self, _prompt: &str) -> Result<String, String> {
        Ok(self.response.clone())
    }
}

/// Extracts the largest `{...}` substring, coerces `label`, clamps
/// `confidence`, and defaults missing/malformed fields (spec.md §6
/// "Decision schema").
pub fn parse_decision(raw: &str) -> DecisionOutcome {
    if raw.trim().is_empty() {
        return DecisionOutcome::Empty;
    }

    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(s), Some(e)) if e >= s => (s, e),
        _ => {
            warn!("llm response had no JSON object: {:?}", raw);
            return DecisionOutcome::ParseError {
                raw: raw.to_string(),
                error: "no JSON object found in response".to_string(),
            };
        }
    };
    let candidate = &raw[start..=end];

    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            warn!("failed to parse llm decision: {}", e);
            return DecisionOutcome::ParseError {
                raw: raw.to_string(),
                error: e.to_string(),
            };
        }
    };

    let label_str = value.get("label").and_then(|v| v.as_str()).unwrap_or("");
    let label = if label_str.to_uppercase().starts_with("ANOM") {
        Label::Anomaly
    } else {
        Label::Normal
    };

    // A well-formed object missing `confidence` defaults to 0.5, distinct
    // from the 0.0 a total parse failure produces.
    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5)
        .max(0.0)
        .min(1.0);

    let evidence_ids = match value.get("evidence_ids").and_then(|v| v.as_array()) {
        Some(arr) => arr
            .iter()
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let rationale = value
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    DecisionOutcome::Parsed(Decision {
        label,
        confidence,
        evidence_ids,
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_decision() {
        let raw = r#"Here is my answer: {"label": "anomaly", "confidence": 1.5, "evidence_ids": ["L1","E2"], "rationale": "burst of resets"} thanks"#;
        match parse_decision(raw) {
            DecisionOutcome::Parsed(d) => {
                assert_eq!(d.label, Label::Anomaly);
                assert_eq!(d.confidence, 1.0); // clamped
                assert_eq!(d.evidence_ids, vec!["L1".to_string(), "E2".to_string()]);
                assert_eq!(d.rationale, "burst of resets");
            }
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn defaults_to_normal_on_unknown_label() {
        let raw = r#"{"label": "unsure", "confidence": 0.4}"#;
        match parse_decision(raw) {
            DecisionOutcome::Parsed(d) => assert_eq!(d.label, Label::Normal),
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn missing_confidence_defaults_to_one_half() {
        let raw = r#"{"label": "NORMAL"}"#;
        match parse_decision(raw) {
            DecisionOutcome::Parsed(d) => assert_eq!(d.confidence, 0.5),
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn empty_input_is_empty_variant() {
        assert!(matches!(parse_decision(""), DecisionOutcome::Empty));
        assert!(matches!(parse_decision("   "), DecisionOutcome::Empty));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        match parse_decision("{not json") {
            DecisionOutcome::ParseError { .. } => {}
            other => panic!("expected ParseError, got {:?}", other),
        }
    }
}
