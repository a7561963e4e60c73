// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Final report assembly.
//!
//! A report is an ordered sequence of blocks: one consolidated block per
//! root cause, one verbatim block per unrecognized diagnostic, and trailing
//! notices. Root blocks render in the familiar compiler layout
//! (`error[code]: message`, `--> file:line:col`, annotated source excerpt)
//! with the dependency trace condensed to a one-line-per-hop breadcrumb.
//! Verbatim blocks are emitted byte-identical to the toolchain's own
//! rendering: the passthrough contract.

use colored::Colorize;
use serde::Serialize;

// ============================================================================
// Report model
// ============================================================================

/// The final output for one batch.
#[derive(Debug, Serialize)]
pub struct RenderedReport {
    pub blocks: Vec<ReportBlock>,
    /// How many input lines failed to parse (surfaced, never hidden).
    pub unparsed_lines: usize,
}

/// One output block.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ReportBlock {
    RootCause(RootCauseBlock),
    /// Untouched original rendering of an unrecognized diagnostic.
    Verbatim { text: String },
    /// An engine-level remark (reconstruction failure, unparsed count).
    Notice { text: String },
}

/// Severity of a consolidated block, carried from the folded records so a
/// warning-level cascade is never promoted to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A consolidated root-cause block.
#[derive(Debug, Serialize)]
pub struct RootCauseBlock {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The translated root statement, e.g. ``missing field `height` ...``.
    pub statement: String,
    /// Every call site blocked by this root, first occurrence first.
    pub sites: Vec<SiteBlock>,
    /// Breadcrumb from the user-facing obligation down to the root.
    pub trace: Vec<String>,
    /// Fix hint, when the root shape admits one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_note: Option<String>,
    /// Exact duplicates folded into this block.
    pub folded: usize,
    /// True when the root is a merged requirement cycle (best-effort).
    pub cyclic: bool,
}

/// One annotated source location.
#[derive(Debug, Serialize)]
pub struct SiteBlock {
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// (line number, text) pairs from the wire span, reproduced unchanged.
    pub excerpt: Vec<(usize, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Highlight columns on the first excerpt line (1-based, end exclusive).
    pub highlight: Option<(usize, usize)>,
}

// ============================================================================
// Text rendering
// ============================================================================

impl RenderedReport {
    /// Plain-text rendering; the canonical form asserted by tests.
    pub fn to_text(&self) -> String {
        self.render(false)
    }

    /// Terminal rendering with severity colors. Color is stripped
    /// automatically when output is not a terminal.
    pub fn to_ansi(&self) -> String {
        self.render(true)
    }

    /// Machine-readable rendering, one JSON document per report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    // Blank separator lines only appear around consolidated blocks.
    // Consecutive verbatim blocks concatenate untouched: the passthrough
    // path must be byte-identical to the original rendering.
    fn render(&self, color: bool) -> String {
        let mut out = String::new();
        let mut prev_was_verbatim = false;
        for (i, block) in self.blocks.iter().enumerate() {
            let verbatim = matches!(block, ReportBlock::Verbatim { .. });
            if i > 0 && !(verbatim && prev_was_verbatim) {
                out.push('\n');
            }
            match block {
                ReportBlock::RootCause(root) => out.push_str(&render_root(root, color)),
                ReportBlock::Verbatim { text } => out.push_str(text),
                ReportBlock::Notice { text } => {
                    let tag = if color {
                        "note".cyan().bold().to_string()
                    } else {
                        "note".to_string()
                    };
                    out.push_str(&format!("{}: {}\n", tag, text));
                }
            }
            prev_was_verbatim = verbatim;
        }
        out
    }
}

fn render_root(root: &RootCauseBlock, color: bool) -> String {
    let mut out = String::new();

    // Header: severity[code]: statement
    let paint = |text: &str| -> String {
        if !color {
            return text.to_string();
        }
        match root.severity {
            Severity::Error => text.red().bold().to_string(),
            Severity::Warning => text.yellow().bold().to_string(),
        }
    };
    let severity = paint(root.severity.label());
    match &root.code {
        Some(code) => {
            out.push_str(&format!("{}[{}]: {}\n", severity, paint(code), root.statement));
        }
        None => out.push_str(&format!("{}: {}\n", severity, root.statement)),
    }

    let gutter = root
        .sites
        .iter()
        .flat_map(|s| s.excerpt.iter().map(|(n, _)| n.to_string().len()))
        .max()
        .unwrap_or(2)
        .max(2);

    for site in &root.sites {
        render_site(&mut out, site, gutter, color);
    }

    // Condensed dependency trace, top-level obligation first
    if root.trace.len() > 1 {
        push_meta(&mut out, gutter, "trace", color);
        for (i, hop) in root.trace.iter().enumerate() {
            if i == 0 {
                out.push_str(&format!(" {}\n", hop));
            } else {
                out.push_str(&format!(
                    "{}   -> {}\n",
                    " ".repeat(gutter + 1),
                    hop
                ));
            }
        }
    }

    if let Some(note) = &root.consumer_note {
        push_meta(&mut out, gutter, "note", color);
        out.push_str(&format!(" {}\n", note));
    }

    if let Some(fix) = &root.fix {
        push_meta(&mut out, gutter, "help", color);
        out.push_str(&format!(" {}\n", fix));
    }

    if root.cyclic {
        push_meta(&mut out, gutter, "note", color);
        out.push_str(" cyclic requirement chain detected; reporting its smallest member as the anchor\n");
    }

    if root.folded > 0 {
        push_meta(&mut out, gutter, "note", color);
        out.push_str(&format!(" (+{} related failures suppressed)\n", root.folded));
    }

    out
}

fn render_site(out: &mut String, site: &SiteBlock, gutter: usize, color: bool) {
    let arrow = if color {
        "-->".blue().to_string()
    } else {
        "-->".to_string()
    };
    out.push_str(&format!(
        "{} {} {}:{}:{}\n",
        " ".repeat(gutter.saturating_sub(1)),
        arrow,
        site.file,
        site.line,
        site.column
    ));

    if site.excerpt.is_empty() {
        return;
    }

    let pipe = if color {
        "|".blue().to_string()
    } else {
        "|".to_string()
    };
    out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), pipe));
    for (i, (line_num, text)) in site.excerpt.iter().enumerate() {
        let num = if color {
            line_num.to_string().blue().bold().to_string()
        } else {
            line_num.to_string()
        };
        out.push_str(&format!(
            "{:>width$} {} {}\n",
            num,
            pipe,
            text,
            width = gutter + if color { num.len() - line_num.to_string().len() } else { 0 },
        ));

        // Carets under the first excerpt line only
        if i == 0 {
            if let Some((start, end)) = site.highlight {
                let width = end.saturating_sub(start).max(1);
                let carets = "^".repeat(width);
                let carets = if color {
                    carets.red().bold().to_string()
                } else {
                    carets
                };
                let label = site.label.as_deref().unwrap_or("");
                out.push_str(&format!(
                    "{} {} {}{} {}\n",
                    " ".repeat(gutter + 1),
                    pipe,
                    " ".repeat(start.saturating_sub(1)),
                    carets,
                    label
                ));
            }
        }
    }
    out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), pipe));
}

fn push_meta(out: &mut String, gutter: usize, tag: &str, color: bool) {
    let eq = if color { "=".cyan().to_string() } else { "=".to_string() };
    let tag = if color {
        tag.cyan().bold().to_string()
    } else {
        tag.to_string()
    };
    out.push_str(&format!("{} {} {}:", " ".repeat(gutter + 1), eq, tag));
}
