//! Input/output record shapes (spec.md §6 "External interfaces").

use serde::{Deserialize, Serialize};

use crate::decision::Prediction;

/// One line of the incoming log stream.
///
/// `log_id` is assumed monotone and `ts_sec` non-decreasing across the
/// stream (spec.md §5 "Ordering guarantees"); the core trusts this and does
/// not re-sort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub log_id: i64,
    pub ts_sec: i64,
    pub message: String,
    pub true_label: u8,
}

/// Which path(s) an evidence item was reached by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Struct,
    Time,
}

/// How a record was found to be worth a retrieval pass, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerBy {
    Severity,
    Burst,
    None,
}

/// Summary of the retrieval pass, only present when `triggered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSummary {
    pub evidence_count: usize,
    pub evidence_log_ids: Vec<i64>,
}

/// One processed record, emitted by the pipeline orchestrator (C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub log_id: i64,
    pub timestamp: i64,
    pub message: String,
    pub true_label: u8,
    pub triggered: bool,
    pub trigger_by: TriggerBy,
    pub severity: u8,
    pub entities_stat: Vec<String>,
    pub entities_stat_validated: Vec<String>,
    pub entities_sem: Vec<String>,
    pub entities_final: Vec<String>,
    pub prediction: Prediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_len: Option<usize>,
}
