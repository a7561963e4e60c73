// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end reconstruction scenarios over rustc-style NDJSON fixtures.

use serde_json::json;
use triage_engine::{reconstruct, LineDisposition, Session};
use triage_render::ReportBlock;
use triage_wire::DiagnosticRecord;

const HEIGHT_SYMBOL: &str =
    "Symbol<6, Chars<'h', Chars<'e', Chars<'i', Chars<'g', Chars<'h', Chars<'t', Nil>>>>>>>";
const WIDTH_SYMBOL: &str =
    "Symbol<5, Chars<'w', Chars<'i', Chars<'d', Chars<'t', Chars<'h', Nil>>>>>>";

fn record(value: serde_json::Value) -> DiagnosticRecord {
    serde_json::from_value(value).unwrap()
}

fn span(file: &str, line: usize, column: usize) -> serde_json::Value {
    json!({
        "file_name": file,
        "byte_start": 100,
        "byte_end": 123,
        "line_start": line,
        "line_end": line,
        "column_start": column,
        "column_end": column + 23,
        "is_primary": true,
        "label": "unsatisfied delegation bound",
        "text": [{
            "text": "        AreaCalculatorComponent,",
            "highlight_start": column,
            "highlight_end": column + 23
        }]
    })
}

/// A missing-field failure behind a single provider layer.
fn missing_field(
    symbol: &str,
    field_trait: &str,
    provider: &str,
    provider_trait: &str,
    file: &str,
    line: usize,
) -> DiagnosticRecord {
    missing_field_at(symbol, field_trait, provider, provider_trait, file, line, 9)
}

fn missing_field_at(
    symbol: &str,
    field_trait: &str,
    provider: &str,
    provider_trait: &str,
    file: &str,
    line: usize,
    column: usize,
) -> DiagnosticRecord {
    record(json!({
        "message": format!(
            "the trait bound `Rectangle: HasField<{}>` is not satisfied",
            symbol
        ),
        "code": {"code": "E0277"},
        "level": "error",
        "spans": [span(file, line, column)],
        "children": [
            {
                "message": format!(
                    "the trait `HasField<{}>` is not implemented for `Rectangle`",
                    symbol
                ),
                "level": "help", "spans": [], "children": []
            },
            {
                "message": format!(
                    "required for `{}` to implement `{}<Rectangle>`",
                    provider, provider_trait
                ),
                "level": "note", "spans": [], "children": []
            },
            {
                "message": format!(
                    "required for `Rectangle` to implement `CanUseComponent<{}Component>`",
                    provider_trait
                ),
                "level": "note", "spans": [], "children": []
            },
            {
                "message": format!("required by a bound in `{}`", field_trait),
                "level": "note", "spans": [], "children": []
            }
        ],
        "rendered": "error[E0277]: the trait bound ... (original rendering)\n"
    }))
}

fn plain_type_mismatch(rendered: &str) -> DiagnosticRecord {
    record(json!({
        "message": "mismatched types",
        "code": {"code": "E0308"},
        "level": "error",
        "spans": [span("src/lib.rs", 4, 5)],
        "children": [],
        "rendered": rendered
    }))
}

fn root_blocks(report: &triage_render::RenderedReport) -> usize {
    report
        .blocks
        .iter()
        .filter(|b| matches!(b, ReportBlock::RootCause(_)))
        .count()
}

// ============================================================================
// Scenario A: single-layer failure
// ============================================================================

#[test]
fn scenario_a_single_layer_missing_field() {
    let diag = record(json!({
        "message": format!(
            "the trait bound `Rectangle: HasField<{}>` is not satisfied",
            HEIGHT_SYMBOL
        ),
        "code": {"code": "E0277"},
        "level": "error",
        "spans": [span("src/main.rs", 12, 9)],
        "children": [
            {
                "message": "required for `RectangleArea` to implement `AreaCalculator<Rectangle>`",
                "level": "note", "spans": [], "children": []
            },
            {
                "message": "required by a bound in `CanUseRectangle`",
                "level": "note", "spans": [], "children": []
            }
        ],
        "rendered": "error[E0277]: original\n"
    }));

    let report = reconstruct(&[diag]);
    assert_eq!(root_blocks(&report), 1);

    let text = report.to_text();
    assert!(text.starts_with("error[E0277]: missing field `height`"), "{}", text);
    assert!(text.contains("--> src/main.rs:12:9"));
    assert!(text.contains("= trace: `RectangleArea` must implement `AreaCalculator<Rectangle>`"));
    assert!(text.contains("-> `Rectangle` must have the field `height`"));
    assert!(text.contains("= help: add a field `height` to the `Rectangle` struct"));
    assert!(text.contains("introduced by the trait bound `CanUseRectangle`"));
    assert!(!text.contains("suppressed"));
}

// ============================================================================
// Scenario B: three-layer delegation chain collapses to one block
// ============================================================================

#[test]
fn scenario_b_delegation_chain_collapses_to_one_block() {
    // The deep failure carries the full chain; a second diagnostic reports
    // only the intermediate layer. Both must land under the same root.
    let deep = record(json!({
        "message": format!(
            "the trait bound `Rectangle: HasField<{}>` is not satisfied",
            HEIGHT_SYMBOL
        ),
        "code": {"code": "E0277"},
        "level": "error",
        "spans": [span("src/main.rs", 12, 9)],
        "children": [
            {
                "message": "required for `RectangleArea` to implement `AreaCalculator<Rectangle>`",
                "level": "note", "spans": [], "children": []
            },
            {
                "message": "required for `RectangleArea` to implement `IsProviderFor<AreaCalculatorComponent, Rectangle>`",
                "level": "note", "spans": [], "children": []
            },
            {
                "message": "required for `Rectangle` to implement `CanUseComponent<AreaCalculatorComponent>`",
                "level": "note", "spans": [], "children": []
            },
            {
                "message": "required by a bound in `CanUseRectangle`",
                "level": "note", "spans": [], "children": []
            }
        ],
        "rendered": "error[E0277]: deep original\n"
    }));
    let intermediate = record(json!({
        "message": "the trait bound `RectangleArea: AreaCalculator<Rectangle>` is not satisfied",
        "code": {"code": "E0277"},
        "level": "error",
        "spans": [span("src/other.rs", 30, 5)],
        "children": [
            {
                "message": "required for `RectangleArea` to implement `IsProviderFor<AreaCalculatorComponent, Rectangle>`",
                "level": "note", "spans": [], "children": []
            },
            {
                "message": "required for `Rectangle` to implement `CanUseComponent<AreaCalculatorComponent>`",
                "level": "note", "spans": [], "children": []
            }
        ],
        "rendered": "error[E0277]: intermediate original\n"
    }));

    let report = reconstruct(&[deep, intermediate]);
    assert_eq!(root_blocks(&report), 1, "intermediates must not get their own blocks");

    let text = report.to_text();
    assert!(text.contains("missing field `height`"));
    // Delegation markers are translated away in the breadcrumb trace
    assert!(text.contains("the consumer trait `CanUseRectangle`"));
    assert!(text.contains("the provider trait `AreaCalculator`"));
    assert!(!text.contains("IsProviderFor"));
    assert!(!text.contains("CanUseComponent"));
    assert!(!text.contains("Symbol<"));
    // Both call sites survive under the one heading
    assert!(text.contains("--> src/main.rs:12:9"));
    assert!(text.contains("--> src/other.rs:30:5"));

    // Trace covers all four layers of the chain
    if let Some(ReportBlock::RootCause(block)) = report
        .blocks
        .iter()
        .find(|b| matches!(b, ReportBlock::RootCause(_)))
    {
        assert_eq!(block.trace.len(), 4);
    } else {
        panic!("no root-cause block");
    }
}

// ============================================================================
// Scenario C: two independent roots stay separate
// ============================================================================

#[test]
fn scenario_c_independent_roots_get_separate_blocks() {
    let height = missing_field(
        HEIGHT_SYMBOL,
        "CanUseRectangle",
        "RectangleArea",
        "AreaCalculator",
        "src/main.rs",
        12,
    );
    let width = missing_field(
        WIDTH_SYMBOL,
        "CanUseRectangle",
        "RectanglePerimeter",
        "PerimeterCalculator",
        "src/main.rs",
        13,
    );

    let report = reconstruct(&[height, width]);
    assert_eq!(root_blocks(&report), 2);

    let text = report.to_text();
    assert!(text.contains("missing field `height`"));
    assert!(text.contains("missing field `width`"));
}

// ============================================================================
// Scenario D: unrecognized diagnostics pass through untouched
// ============================================================================

#[test]
fn scenario_d_unrecognized_batch_is_pure_passthrough() {
    let first = "error[E0308]: mismatched types\n --> src/lib.rs:4:5\n";
    let second = "warning: unused variable `x`\n --> src/lib.rs:9:9\n";
    let report = reconstruct(&[plain_type_mismatch(first), plain_type_mismatch(second)]);

    // Byte-identical concatenation of the original renderings
    assert_eq!(report.to_text(), format!("{}{}", first, second));
    assert_eq!(root_blocks(&report), 0);
}

// ============================================================================
// Scenario E: one root, many call sites
// ============================================================================

#[test]
fn scenario_e_five_sites_group_under_one_heading() {
    let records: Vec<DiagnosticRecord> = (0..5)
        .map(|i| {
            missing_field(
                HEIGHT_SYMBOL,
                "CanUseRectangle",
                "RectangleArea",
                "AreaCalculator",
                "src/main.rs",
                10 + i,
            )
        })
        .collect();

    let report = reconstruct(&records);
    assert_eq!(root_blocks(&report), 1);

    let text = report.to_text();
    assert_eq!(text.matches("error[").count(), 1);
    for i in 0..5 {
        assert!(text.contains(&format!("--> src/main.rs:{}:9", 10 + i)));
    }
    // Distinct sites are retained, not folded as duplicates
    assert!(!text.contains("suppressed"));
}

// ============================================================================
// Invariant properties
// ============================================================================

#[test]
fn exact_duplicates_fold_with_a_count() {
    let records: Vec<DiagnosticRecord> = (0..3)
        .map(|_| {
            missing_field(
                HEIGHT_SYMBOL,
                "CanUseRectangle",
                "RectangleArea",
                "AreaCalculator",
                "src/main.rs",
                12,
            )
        })
        .collect();

    let report = reconstruct(&records);
    assert_eq!(root_blocks(&report), 1);
    let text = report.to_text();
    assert_eq!(text.matches("--> src/main.rs:12:9").count(), 1);
    assert!(text.contains("(+2 related failures suppressed)"));
}

#[test]
fn no_loss_mixed_batch_keeps_unrecognized_verbatim() {
    let rendered = "error[E0308]: mismatched types (untouched)\n";
    let report = reconstruct(&[
        missing_field(
            HEIGHT_SYMBOL,
            "CanUseRectangle",
            "RectangleArea",
            "AreaCalculator",
            "src/main.rs",
            12,
        ),
        plain_type_mismatch(rendered),
    ]);

    let text = report.to_text();
    assert!(text.contains("missing field `height`"));
    assert!(text.contains(rendered));
}

#[test]
fn report_is_stable_under_input_permutation() {
    let batch = || {
        vec![
            missing_field(
                HEIGHT_SYMBOL,
                "CanUseRectangle",
                "RectangleArea",
                "AreaCalculator",
                "src/main.rs",
                12,
            ),
            missing_field(
                WIDTH_SYMBOL,
                "CanUseRectangle",
                "RectanglePerimeter",
                "PerimeterCalculator",
                "src/main.rs",
                13,
            ),
            missing_field(
                HEIGHT_SYMBOL,
                "CanUseRectangle",
                "RectangleArea",
                "AreaCalculator",
                "src/views.rs",
                40,
            ),
        ]
    };

    let forward = reconstruct(&batch());
    let mut reversed_input = batch();
    reversed_input.reverse();
    let reversed = reconstruct(&reversed_input);

    assert_eq!(forward.to_text(), reversed.to_text());
}

#[test]
fn folded_duplicates_render_the_smallest_column_in_any_order() {
    // Two records at the same file:line but different columns fold into one
    // site; the representative column must not depend on batch order.
    let wide = || {
        missing_field_at(
            HEIGHT_SYMBOL,
            "CanUseRectangle",
            "RectangleArea",
            "AreaCalculator",
            "src/main.rs",
            12,
            20,
        )
    };
    let narrow = || {
        missing_field_at(
            HEIGHT_SYMBOL,
            "CanUseRectangle",
            "RectangleArea",
            "AreaCalculator",
            "src/main.rs",
            12,
            9,
        )
    };

    let forward = reconstruct(&[narrow(), wide()]).to_text();
    let reversed = reconstruct(&[wide(), narrow()]).to_text();

    assert_eq!(forward, reversed);
    assert!(forward.contains("--> src/main.rs:12:9"), "{}", forward);
    assert!(!forward.contains("--> src/main.rs:12:20"));
    assert!(forward.contains("(+1 related failures suppressed)"));
}

#[test]
fn header_metadata_is_order_independent() {
    // Two records under one root carrying different codes: the header must
    // come out the same whichever record arrived first.
    let deep = || {
        missing_field(
            HEIGHT_SYMBOL,
            "CanUseRectangle",
            "RectangleArea",
            "AreaCalculator",
            "src/main.rs",
            12,
        )
    };
    let intermediate = || {
        record(json!({
            "message": "the trait bound `RectangleArea: AreaCalculator<Rectangle>` is not satisfied",
            "code": {"code": "E0283"},
            "level": "error",
            "spans": [span("src/other.rs", 30, 5)],
            "children": [
                {
                    "message": "required for `RectangleArea` to implement `IsProviderFor<AreaCalculatorComponent, Rectangle>`",
                    "level": "note", "spans": [], "children": []
                },
                {
                    "message": "required for `Rectangle` to implement `CanUseComponent<AreaCalculatorComponent>`",
                    "level": "note", "spans": [], "children": []
                }
            ],
            "rendered": "error[E0283]: intermediate original\n"
        }))
    };

    let forward = reconstruct(&[deep(), intermediate()]).to_text();
    let reversed = reconstruct(&[intermediate(), deep()]).to_text();

    assert_eq!(forward, reversed);
    assert!(forward.starts_with("error[E0277]:"), "{}", forward);
    assert!(forward.contains("introduced by the trait bound `CanUseRectangle`"));
}

#[test]
fn warning_level_records_keep_warning_severity() {
    let diag = record(json!({
        "message": format!(
            "the trait bound `Rectangle: HasField<{}>` is not satisfied",
            HEIGHT_SYMBOL
        ),
        "code": {"code": "E0277"},
        "level": "warning",
        "spans": [span("src/main.rs", 12, 9)],
        "children": [
            {
                "message": "required for `RectangleArea` to implement `AreaCalculator<Rectangle>`",
                "level": "note", "spans": [], "children": []
            }
        ],
        "rendered": "warning: original\n"
    }));

    let text = reconstruct(&[diag]).to_text();
    assert!(text.starts_with("warning[E0277]:"), "{}", text);
}

// ============================================================================
// Session lifecycle over raw NDJSON
// ============================================================================

#[test]
fn session_consumes_diagnostics_and_forwards_the_rest() {
    let mut session = Session::new();

    assert_eq!(
        session.push_line(r#"{"reason":"compiler-artifact","target":{"name":"demo"}}"#),
        LineDisposition::Forward
    );

    let diag_line = format!(
        r#"{{"reason":"compiler-message","message":{}}}"#,
        serde_json::to_string(&json!({
            "message": format!(
                "the trait bound `Rectangle: HasField<{}>` is not satisfied",
                HEIGHT_SYMBOL
            ),
            "code": {"code": "E0277"},
            "level": "error",
            "spans": [span("src/main.rs", 12, 9)],
            "children": [
                {
                    "message": "required for `RectangleArea` to implement `AreaCalculator<Rectangle>`",
                    "level": "note", "spans": [], "children": []
                }
            ],
            "rendered": "error[E0277]: original\n"
        }))
        .unwrap()
    );
    assert_eq!(session.push_line(&diag_line), LineDisposition::Consumed);
    assert_eq!(
        session.push_line(r#"{"reason":"build-finished","success":false}"#),
        LineDisposition::Forward
    );

    let report = session.finish_batch();
    assert!(report.to_text().contains("missing field `height`"));
}
