// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Reconstruction engine for component-delegation diagnostics.
//!
//! Glues the pipeline together: wire ingestion, obligation extraction,
//! dependency-graph analysis, cascade deduplication and report assembly.
//! The engine never errors outward: anything it cannot confidently
//! reconstruct is passed through in the toolchain's original rendering, so
//! using it can only add clarity, never lose information.

mod error;
mod reconstruct;
mod session;

pub use error::EngineError;
pub use reconstruct::reconstruct;
pub use session::{LineDisposition, Session, SessionState};
