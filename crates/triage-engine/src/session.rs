// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Batch session lifecycle.
//!
//! A session accumulates one compilation's worth of NDJSON lines, then
//! produces the consolidated report in a single pass. Non-diagnostic
//! events (artifact notifications, build-finished markers) are classified
//! for immediate forwarding and never held back; diagnostics are buffered
//! until `finish_batch` because root-cause attribution needs the whole
//! graph. Lines that fail to parse are kept and surfaced at the end rather
//! than dropped.

use triage_render::{RenderedReport, ReportBlock};
use triage_wire::{ingest_line, DiagnosticRecord, IngestEvent};

use crate::reconstruct::reconstruct;

/// Where a session is in its batch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No diagnostic seen yet for the current batch.
    AwaitingBatch,
    /// At least one diagnostic buffered; more may follow.
    Ingesting,
}

/// What the caller should do with the line it just pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDisposition {
    /// Buffered; it will appear in the batch report.
    Consumed,
    /// Not a diagnostic; pass it along unchanged right now.
    Forward,
}

/// One batch accumulator. Reusable: `finish_batch` resets it for the next
/// compilation.
#[derive(Debug, Default)]
pub struct Session {
    records: Vec<DiagnosticRecord>,
    unparsed: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.records.is_empty() && self.unparsed.is_empty() {
            SessionState::AwaitingBatch
        } else {
            SessionState::Ingesting
        }
    }

    /// Feed one NDJSON line.
    pub fn push_line(&mut self, line: &str) -> LineDisposition {
        match ingest_line(line) {
            IngestEvent::Diagnostic(record) => {
                self.records.push(record);
                LineDisposition::Consumed
            }
            IngestEvent::Forward(_) => LineDisposition::Forward,
            IngestEvent::Unparsed(raw) => {
                self.unparsed.push(raw);
                LineDisposition::Consumed
            }
        }
    }

    /// Feed an already-parsed record (the embedding path).
    pub fn push_record(&mut self, record: DiagnosticRecord) {
        self.records.push(record);
    }

    /// Close the batch and reconstruct. The session is reset afterwards.
    pub fn finish_batch(&mut self) -> RenderedReport {
        let records = std::mem::take(&mut self.records);
        let unparsed = std::mem::take(&mut self.unparsed);

        let mut report = reconstruct(&records);

        // Unparseable input is surfaced, never swallowed.
        report.unparsed_lines = unparsed.len();
        for raw in &unparsed {
            report.blocks.push(ReportBlock::Verbatim {
                text: format!("{}\n", raw),
            });
        }
        if !unparsed.is_empty() {
            report.blocks.push(ReportBlock::Notice {
                text: format!(
                    "{} input line(s) could not be parsed and were passed through unchanged",
                    unparsed.len()
                ),
            });
        }

        report
    }
}
