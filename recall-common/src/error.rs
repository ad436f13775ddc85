//! Crate-wide error type shared by the core and its collaborators.

use thiserror::Error;

/// Errors that can be raised at construction time or at a module boundary.
///
/// Malformed LLM decisions and failed external calls are *not* represented
/// here: those are recovered into the decision record itself (see
/// `recall_common::decision::DecisionOutcome`) rather than aborting the
/// stream.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("log_id {0} is not resident in the graph")]
    TargetNotResident(i64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
