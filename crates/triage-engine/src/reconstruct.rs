// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Batch reconstruction: records in, consolidated report out.
//!
//! This is the engine's one outbound operation. It is pure and
//! deterministic: the same set of records, in any order, produces the same
//! report. Records outside the recognized pattern family pass through with
//! their original rendering untouched. If an internal invariant fails, the
//! whole batch degrades to verbatim output with an explicit notice; the
//! user never receives less information than the toolchain gave us.

use triage_extract::{extract, translate::translate, Extraction, FieldFact, ObligationKind};
use triage_graph::analysis::{analyze, RootCause};
use triage_graph::dedup::{deduplicate, Cascade, RecordAnchor, RecordSite};
use triage_graph::ObligationGraph;
use triage_render::{RenderedReport, ReportBlock, RootCauseBlock, Severity, SiteBlock};
use triage_wire::{DiagnosticRecord, Level};

use crate::error::EngineError;

/// Reconstruct one batch. Infallible to the caller: invariant violations
/// degrade to the verbatim fallback inside.
pub fn reconstruct(records: &[DiagnosticRecord]) -> RenderedReport {
    match try_reconstruct(records) {
        Ok(report) => report,
        Err(err) => fallback(records, &err),
    }
}

fn try_reconstruct(records: &[DiagnosticRecord]) -> Result<RenderedReport, EngineError> {
    let extractions: Vec<Extraction> = records.iter().map(extract).collect();

    let mut graph = ObligationGraph::new();
    let mut anchors: Vec<RecordAnchor> = Vec::new();
    let mut recognized = vec![false; records.len()];

    for (ix, extraction) in extractions.iter().enumerate() {
        if !extraction.recognized() {
            continue;
        }
        graph.insert_extraction(extraction, ix);
        if let Some(deepest) = graph.find(&extraction.chain[0]) {
            recognized[ix] = true;
            anchors.push(RecordAnchor {
                record_ix: ix,
                deepest,
                site: primary_site(&records[ix]),
            });
        }
    }

    let roots = analyze(&graph);
    let cascades = deduplicate(&graph, &roots, &anchors);

    let mut blocks: Vec<ReportBlock> = Vec::new();
    let mut covered = vec![false; records.len()];

    for (root, cascade) in roots.iter().zip(&cascades) {
        let key = graph.key(root.node);
        if graph.node(root.node).provenance.is_empty() {
            return Err(EngineError::MissingProvenance(key));
        }
        if root.trace.is_empty() {
            return Err(EngineError::EmptyTrace(key));
        }
        if cascade.sites.is_empty() {
            return Err(EngineError::EmptyCascade(key));
        }
        for site in &cascade.sites {
            for &ix in &site.records {
                covered[ix] = true;
            }
        }
        blocks.push(ReportBlock::RootCause(build_block(
            &graph,
            root,
            cascade,
            records,
            &extractions,
        )));
    }

    // Everything unrecognized (or, defensively, recognized but not
    // attributed to any root) passes through verbatim, in batch order.
    for (ix, record) in records.iter().enumerate() {
        if !recognized[ix] || !covered[ix] {
            blocks.push(verbatim(record));
        }
    }

    Ok(RenderedReport {
        blocks,
        unparsed_lines: 0,
    })
}

/// Batch-fatal degradation: every record verbatim, plus one explicit notice.
fn fallback(records: &[DiagnosticRecord], err: &EngineError) -> RenderedReport {
    let mut blocks = vec![ReportBlock::Notice {
        text: format!(
            "diagnostic reconstruction failed ({}); showing original diagnostics",
            err
        ),
    }];
    blocks.extend(records.iter().map(verbatim));
    RenderedReport {
        blocks,
        unparsed_lines: 0,
    }
}

fn verbatim(record: &DiagnosticRecord) -> ReportBlock {
    ReportBlock::Verbatim {
        text: record
            .rendered
            .clone()
            .unwrap_or_else(|| format!("{}\n", record.message)),
    }
}

fn primary_site(record: &DiagnosticRecord) -> Option<RecordSite> {
    record.primary_span().map(|span| RecordSite {
        file: span.file_name.clone(),
        line: span.line_start,
        column: span.column_start,
    })
}

// ============================================================================
// Block assembly
// ============================================================================

fn build_block(
    graph: &ObligationGraph,
    root: &RootCause,
    cascade: &Cascade,
    records: &[DiagnosticRecord],
    extractions: &[Extraction],
) -> RootCauseBlock {
    let attributed: Vec<usize> = cascade
        .sites
        .iter()
        .flat_map(|s| s.records.iter().copied())
        .collect();

    let node = graph.node(root.node);

    // Header metadata is selected by value, never by batch position, so the
    // block is identical whichever attributed record arrived first.
    let consumer_trait = attributed
        .iter()
        .filter_map(|&ix| extractions[ix].consumer_trait.clone())
        .min();
    let field: Option<FieldFact> = attributed
        .iter()
        .filter_map(|&ix| extractions[ix].field.clone())
        .filter(|f| {
            f.name == node.obligation.capability && f.target == node.obligation.subject
        })
        .min_by_key(|f| !f.complete);
    let has_other_field_impls = attributed
        .iter()
        .any(|&ix| extractions[ix].has_other_field_impls);
    let code = attributed
        .iter()
        .filter_map(|&ix| records[ix].code.as_ref().map(|c| c.code.clone()))
        .min();
    let severity = if attributed
        .iter()
        .any(|&ix| matches!(records[ix].level, Level::Error | Level::Ice))
    {
        Severity::Error
    } else {
        Severity::Warning
    };

    let consumer = consumer_trait.as_deref();

    let statement = match node.obligation.kind {
        ObligationKind::FieldPresence => {
            let qualifier = match &field {
                Some(f) if !f.complete => " (name possibly incomplete)",
                _ => "",
            };
            format!(
                "missing field `{}`{} required through component delegation",
                node.obligation.capability, qualifier
            )
        }
        ObligationKind::TraitBound => translate(
            &format!(
                "the trait bound `{}: {}` is not satisfied",
                node.obligation.subject, node.obligation.capability
            ),
            consumer,
        ),
        ObligationKind::AssocTypeEquality => translate(
            &format!("type mismatch resolving `{}`", node.obligation.capability),
            consumer,
        ),
        ObligationKind::Unsatisfied => translate(
            &format!("the trait bound `{}` is not satisfied", node.obligation.subject),
            consumer,
        ),
    };

    let trace = root
        .trace
        .iter()
        .map(|&id| {
            let hop = graph.node(id);
            let text = match hop.obligation.kind {
                ObligationKind::FieldPresence => format!(
                    "`{}` must have the field `{}`",
                    hop.obligation.subject, hop.obligation.capability
                ),
                ObligationKind::Unsatisfied => {
                    format!("`{}` must hold", hop.obligation.subject)
                }
                ObligationKind::AssocTypeEquality => {
                    format!("`{}` must hold", hop.obligation.capability)
                }
                ObligationKind::TraitBound => format!(
                    "`{}` must implement `{}`",
                    hop.obligation.subject, hop.obligation.capability
                ),
            };
            translate(&text, consumer)
        })
        .collect();

    let fix = match (&node.obligation.kind, &field) {
        (ObligationKind::FieldPresence, Some(f)) => Some(if has_other_field_impls {
            format!("add a field `{}` to the `{}` struct", f.name, f.target)
        } else {
            format!(
                "add a field `{}` to the `{}` struct, or add `#[derive(HasField)]` if the derive is missing",
                f.name, f.target
            )
        }),
        (ObligationKind::FieldPresence, None) => Some(format!(
            "add a field `{}` to the `{}` struct",
            node.obligation.capability, node.obligation.subject
        )),
        _ => None,
    };

    let consumer_note = consumer_trait
        .as_ref()
        .map(|name| format!("this requirement is introduced by the trait bound `{}`", name));

    let sites = cascade
        .sites
        .iter()
        .map(|cs| {
            let record = cs.records.first().map(|&ix| &records[ix]);
            let span = record.and_then(|r| r.primary_span());
            SiteBlock {
                file: cs
                    .site
                    .as_ref()
                    .map(|s| s.file.clone())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                line: cs.site.as_ref().map(|s| s.line).unwrap_or(0),
                column: cs.site.as_ref().map(|s| s.column).unwrap_or(0),
                excerpt: span
                    .map(|s| {
                        s.text
                            .iter()
                            .enumerate()
                            .map(|(i, t)| (s.line_start + i, t.text.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
                label: span.and_then(|s| s.label.clone()),
                highlight: span.map(|s| (s.column_start, s.column_end)),
            }
        })
        .collect();

    RootCauseBlock {
        severity,
        code,
        statement,
        sites,
        trace,
        fix,
        consumer_note,
        folded: cascade.total_folded(),
        cyclic: root.cyclic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain_record(rendered: &str) -> DiagnosticRecord {
        serde_json::from_value(json!({
            "message": "mismatched types",
            "code": {"code": "E0308"},
            "level": "error",
            "spans": [],
            "children": [],
            "rendered": rendered
        }))
        .unwrap()
    }

    #[test]
    fn invariant_violation_degrades_whole_batch_to_verbatim() {
        let first = "error[E0308]: first original\n";
        let second = "error[E0308]: second original\n";
        let records = vec![plain_record(first), plain_record(second)];

        let report = fallback(
            &records,
            &EngineError::EmptyTrace("Rectangle :: height".to_string()),
        );

        let text = report.to_text();
        assert!(
            text.starts_with("note: diagnostic reconstruction failed"),
            "{}",
            text
        );
        assert!(text.contains("showing original diagnostics"));
        // Every record comes back untouched, none consolidated
        assert!(text.contains(first));
        assert!(text.contains(second));
        assert!(!report
            .blocks
            .iter()
            .any(|b| matches!(b, ReportBlock::RootCause(_))));
    }

    #[test]
    fn record_without_rendered_text_still_survives_fallback() {
        let record: DiagnosticRecord = serde_json::from_value(json!({
            "message": "bare message only",
            "level": "error",
            "spans": [],
            "children": []
        }))
        .unwrap();

        let report = fallback(
            &[record],
            &EngineError::MissingProvenance("Rectangle :: height".to_string()),
        );
        assert!(report.to_text().contains("bare message only"));
    }
}
