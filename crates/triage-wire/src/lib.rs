// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Inbound wire format for build-check diagnostics.
//!
//! The underlying check command emits one JSON object per line, a
//! discriminated union keyed by `reason`. Only the diagnostic-bearing
//! variant is consumed here; every other variant is forwarded untouched to
//! whoever drives the stream. A line that fails to parse is never dropped:
//! it is handed back verbatim so the caller can fall back to it.

use serde::Deserialize;

// ============================================================================
// Core Types
// ============================================================================

/// Severity level of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
    Ice,
    /// Anything this crate does not know about. Unknown levels must not
    /// fail a line; the record simply rides along.
    #[serde(other)]
    Unknown,
}

/// A stable code identifier like `E0277`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosticCode {
    pub code: String,
}

/// One highlighted line of source text inside a span.
#[derive(Debug, Clone, Deserialize)]
pub struct SpanText {
    pub text: String,
    #[serde(default)]
    pub highlight_start: usize,
    #[serde(default)]
    pub highlight_end: usize,
}

/// A source span. Lines and columns are 1-based in the source format and
/// treated as opaque: they are reproduced unchanged in any output.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticSpan {
    pub file_name: String,
    #[serde(default)]
    pub byte_start: usize,
    #[serde(default)]
    pub byte_end: usize,
    pub line_start: usize,
    #[serde(default)]
    pub line_end: usize,
    pub column_start: usize,
    #[serde(default)]
    pub column_end: usize,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Vec<SpanText>,
}

/// One raw diagnostic from the toolchain, immutable once parsed.
///
/// `children` carries the notes/helps that encode the obligation chain in
/// free text; `rendered` is the toolchain's own full rendering, kept
/// verbatim as the passthrough fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticRecord {
    pub message: String,
    #[serde(default)]
    pub code: Option<DiagnosticCode>,
    pub level: Level,
    #[serde(default)]
    pub spans: Vec<DiagnosticSpan>,
    #[serde(default)]
    pub children: Vec<DiagnosticRecord>,
    #[serde(default)]
    pub rendered: Option<String>,
}

impl DiagnosticRecord {
    /// Returns the primary span (first span flagged primary, or first span).
    pub fn primary_span(&self) -> Option<&DiagnosticSpan> {
        self.spans
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| self.spans.first())
    }

    /// Iterate over the record's own message followed by every child
    /// message, depth-first.
    pub fn all_messages(&self) -> Vec<&str> {
        let mut out = vec![self.message.as_str()];
        for child in &self.children {
            out.extend(child.all_messages());
        }
        out
    }
}

// ============================================================================
// Ingestor
// ============================================================================

/// Result of ingesting one line of the stream.
#[derive(Debug)]
pub enum IngestEvent {
    /// A diagnostic-bearing record; consumed by the engine.
    Diagnostic(DiagnosticRecord),
    /// A well-formed line of some other kind (artifact, build-script,
    /// build-finished, ...). Forwarded unchanged.
    Forward(String),
    /// A line that did not parse. Retained verbatim, never dropped.
    Unparsed(String),
}

/// The `reason`-keyed envelope around every wire line.
#[derive(Debug, Deserialize)]
struct Envelope {
    reason: String,
    #[serde(default)]
    message: Option<DiagnosticRecord>,
}

/// Ingest one line of the wire stream.
///
/// Never fails hard: a malformed line comes back as [`IngestEvent::Unparsed`]
/// so the caller can count it and keep the text for fallback display.
pub fn ingest_line(line: &str) -> IngestEvent {
    if line.trim().is_empty() {
        return IngestEvent::Forward(line.to_string());
    }

    match serde_json::from_str::<Envelope>(line) {
        Ok(envelope) => {
            if envelope.reason == "compiler-message" {
                match envelope.message {
                    Some(record) => IngestEvent::Diagnostic(record),
                    // A compiler-message without a payload is malformed
                    None => IngestEvent::Unparsed(line.to_string()),
                }
            } else {
                IngestEvent::Forward(line.to_string())
            }
        }
        Err(_) => IngestEvent::Unparsed(line.to_string()),
    }
}
