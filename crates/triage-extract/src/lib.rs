// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Text pattern extraction for delegation-failure diagnostics.
//!
//! Turns one raw diagnostic record into a chain of obligations and the
//! "requires" relations between them, using a small explicit set of phrase
//! templates. Matching is conservative by design: a false positive (inventing
//! a dependency that is not there) is strictly worse than a false negative
//! (falling back to the toolchain's own rendering), so unmatched text
//! produces nothing and the record is routed verbatim downstream.

pub mod templates;
pub mod translate;
pub mod typestr;

use triage_wire::{DiagnosticRecord, Level};

use crate::templates::{match_chain_link, match_obligation, match_required_by_bound};
use crate::typestr::decode_symbol;

// ============================================================================
// Core Types
// ============================================================================

/// What kind of requirement an obligation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationKind {
    TraitBound,
    FieldPresence,
    AssocTypeEquality,
    Unsatisfied,
}

/// A normalized requirement: `subject` must provide `capability`.
///
/// Identity is normalized text equality of `(subject, capability)`; two
/// mentions of the same requirement anywhere in a batch compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obligation {
    pub kind: ObligationKind,
    pub subject: String,
    pub capability: String,
}

impl Obligation {
    /// The identity key used for node merging across diagnostics.
    pub fn key(&self) -> String {
        format!("{} :: {}", self.subject, self.capability)
    }
}

/// A decoded field requirement, kept for fix-hint rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFact {
    pub name: String,
    /// False when the compiler elided characters from the encoding.
    pub complete: bool,
    pub target: String,
}

/// Everything extracted from one diagnostic record.
///
/// `chain[0]` is the deepest obligation (from the primary message); each
/// later entry is one "required for" layer further up, ending at the
/// user-facing obligation. An empty chain means the record was not
/// recognized and must pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub chain: Vec<Obligation>,
    /// Consumer trait named by a "required by a bound in" note, if any.
    pub consumer_trait: Option<String>,
    /// Field decoding for the deepest obligation, when it is field-shaped.
    pub field: Option<FieldFact>,
    /// Whether the type already has other field implementations (changes
    /// the fix hint: missing field vs missing derive).
    pub has_other_field_impls: bool,
    /// Whether a known CGP marker appears anywhere in the record.
    pub is_cgp: bool,
}

impl Extraction {
    /// A record is reconstructible only when it is in the CGP pattern
    /// family AND at least one template matched. Everything else is the
    /// passthrough path.
    pub fn recognized(&self) -> bool {
        self.is_cgp && !self.chain.is_empty()
    }

    /// (source, target) index pairs into `chain`: each layer requires the
    /// one beneath it.
    pub fn requires(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..self.chain.len()).map(|i| (i, i - 1))
    }
}

// ============================================================================
// Marker gate
// ============================================================================

/// Marker names that place a diagnostic in the delegation pattern family.
/// These come from the CGP library surface, never from user code.
const CGP_MARKERS: &[&str] = &[
    "CanUseComponent",
    "IsProviderFor",
    "HasField",
    "DelegateComponent",
    "UseDelegate",
    "cgp_component",
    "delegate_components",
    "check_components",
];

/// Gate check: does any message in the record mention a CGP marker?
pub fn is_cgp_record(record: &DiagnosticRecord) -> bool {
    record
        .all_messages()
        .iter()
        .any(|m| CGP_MARKERS.iter().any(|p| m.contains(p)))
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract obligations from one record. Pure function: no side effects, no
/// state; the same record always yields the same extraction.
pub fn extract(record: &DiagnosticRecord) -> Extraction {
    let is_cgp = is_cgp_record(record);
    if !is_cgp {
        // Outside the pattern family nothing is extracted, by contract.
        return Extraction::default();
    }

    let mut extraction = Extraction {
        is_cgp,
        ..Extraction::default()
    };

    // Deepest obligation, from the primary message.
    if let Some((_, obligation)) = match_obligation(&record.message) {
        extraction.chain.push(obligation);
    }

    for child in &record.children {
        // Help notes can carry a more specific reading of the deepest
        // obligation (the field-presence encoding) than the primary
        // message did.
        if child.level == Level::Help {
            if let Some((id, obligation)) = match_obligation(&child.message) {
                if id == "field-presence" {
                    match extraction.chain.first_mut() {
                        Some(head) if head.kind != ObligationKind::FieldPresence => {
                            *head = obligation;
                        }
                        None => extraction.chain.push(obligation),
                        _ => {}
                    }
                }
            }
            if child.message.contains("but trait `HasField")
                || child.message.contains("the following other types implement trait")
            {
                extraction.has_other_field_impls = true;
            }
        }

        // Delegation layers, in note order: each links to the previous.
        if let Some(link) = match_chain_link(&child.message) {
            let duplicate = extraction.chain.iter().any(|o| o.key() == link.key());
            if !duplicate {
                extraction.chain.push(link);
            }
        }

        if extraction.consumer_trait.is_none() {
            extraction.consumer_trait = match_required_by_bound(&child.message);
        }
    }

    // Record the decoded field fact for fix-hint rendering.
    if let Some(head) = extraction.chain.first() {
        if head.kind == ObligationKind::FieldPresence {
            let complete = record
                .all_messages()
                .iter()
                .find_map(|m| decode_symbol(m))
                .map(|d| d.complete)
                .unwrap_or(true);
            extraction.field = Some(FieldFact {
                name: head.capability.clone(),
                complete,
                target: head.subject.clone(),
            });
        }
    }

    extraction
}
