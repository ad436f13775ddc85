//! Shared wire types for the `recall` log-anomaly retrieval core, analogous
//! to `pythia_common` in the tracing system this crate is modeled on: the
//! record shapes and error type that both the core and anything embedding
//! it (a CLI, a service, a notebook harness) need to agree on.

pub mod decision;
pub mod error;
pub mod record;

pub use crate::decision::{Decision, DecisionOutcome, Label, Prediction};
pub use crate::error::RecallError;
pub use crate::record::{OutputRecord, PathKind, Record, RetrievalSummary, TriggerBy};
