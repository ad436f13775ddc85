//! The external-LLM decision schema (spec.md §6 "Decision schema").
//!
//! The core never depends on *which* backend produces the raw string; it
//! only needs to parse whatever comes back into this shape, or fall back to
//! a well-defined default when parsing fails.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "ANOMALY")]
    Anomaly,
    #[serde(rename = "NORMAL")]
    Normal,
}

/// A successfully parsed decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub label: Label,
    pub confidence: f64,
    pub evidence_ids: Vec<String>,
    pub rationale: String,
}

/// Tagged result of attempting to parse a raw LLM response (spec.md §9
/// design note: "a separate `parse_decision` that returns a tagged variant
/// `{Parsed | ParseError | Empty}`").
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Parsed(Decision),
    ParseError { raw: String, error: String },
    Empty,
}

/// The `prediction` field of an `OutputRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
    pub evidence_ids: Vec<String>,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_raw: Option<String>,
}

impl Prediction {
    /// The default prediction used whenever the collaborator is disabled,
    /// the record wasn't triggered, or the external call failed outright.
    pub fn default_normal() -> Self {
        Prediction {
            label: Label::Normal,
            confidence: 0.0,
            evidence_ids: Vec::new(),
            rationale: String::new(),
            llm_error: None,
            llm_raw: None,
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Prediction {
            llm_error: Some(error.into()),
            ..Prediction::default_normal()
        }
    }

    pub fn from_outcome(outcome: DecisionOutcome) -> Self {
        match outcome {
            DecisionOutcome::Parsed(d) => Prediction {
                label: d.label,
                confidence: d.confidence,
                evidence_ids: d.evidence_ids,
                rationale: d.rationale,
                llm_error: None,
                llm_raw: None,
            },
            DecisionOutcome::ParseError { raw, error } => Prediction {
                llm_error: Some(error),
                llm_raw: Some(raw),
                ..Prediction::default_normal()
            },
            DecisionOutcome::Empty => Prediction::default_normal(),
        }
    }
}
