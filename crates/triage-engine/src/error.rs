// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Engine error types.
//!
//! Only internal invariant violations live here. Unparseable lines,
//! unrecognized diagnostics, extraction ambiguity and graph cycles are all
//! handled locally and never surface as errors; these variants mean the
//! engine cannot stand behind its reconstruction and must fall back to the
//! original diagnostics for the whole batch.

/// A batch-fatal invariant violation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("root cause `{0}` has no provenance record")]
    MissingProvenance(String),
    #[error("root cause `{0}` has an empty dependency trace")]
    EmptyTrace(String),
    #[error("root cause `{0}` was reported with no attributed call sites")]
    EmptyCascade(String),
}
