// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Phrase template table.
//!
//! Every phrase shape the extractor recognizes lives in this one table, so
//! upstream wording drift is a data change here, not a control-flow change
//! elsewhere. Templates are ordered most specific first and the first match
//! wins; when two templates could both read the same text, the weaker match
//! is discarded.

use crate::typestr::{backticked_after, decode_symbol, normalize, strip_module_path};
use crate::{Obligation, ObligationKind};

/// A phrase template: id plus a matcher over one message text.
pub struct Template {
    pub id: &'static str,
    pub apply: fn(&str) -> Option<Obligation>,
}

/// All obligation-producing templates, most specific first.
pub fn obligation_templates() -> Vec<Template> {
    vec![
        Template { id: "field-presence", apply: tpl_field_presence },
        Template { id: "trait-bound-unsatisfied", apply: tpl_trait_bound },
        Template { id: "not-implemented", apply: tpl_not_implemented },
        Template { id: "assoc-type-equality", apply: tpl_assoc_type },
    ]
}

/// Match one message against the table. First match wins.
pub fn match_obligation(text: &str) -> Option<(&'static str, Obligation)> {
    for template in obligation_templates() {
        if let Some(obligation) = (template.apply)(text) {
            return Some((template.id, obligation));
        }
    }
    None
}

/// `required for `T` to implement `Trait`` — one delegation layer.
pub fn match_chain_link(text: &str) -> Option<Obligation> {
    let subject = backticked_after(text, "required for `")?;
    let capability = backticked_after(text, "` to implement `")?;
    Some(Obligation {
        kind: ObligationKind::TraitBound,
        subject: normalize(subject),
        capability: normalize(capability),
    })
}

/// `required by a bound in `Trait`` — names the user-facing consumer trait.
pub fn match_required_by_bound(text: &str) -> Option<String> {
    backticked_after(text, "required by a bound in `").map(|s| s.to_string())
}

// ============================================================================
// Template matchers
// ============================================================================

/// Field-presence encodings: `HasField<Symbol<N, Chars<...>>>`, either in
/// trait-bound form or "is not implemented for" form. The most specific
/// template: it shadows the generic trait-bound match on the same text.
fn tpl_field_presence(text: &str) -> Option<Obligation> {
    if !text.contains("HasField") {
        return None;
    }

    let decoded = decode_symbol(text)?;

    let subject = if let Some(inner) = backticked_after(text, "the trait bound `") {
        // `Rectangle: HasField<Symbol<...>>` is not satisfied
        let colon = top_level_colon(inner)?;
        inner[..colon].trim().to_string()
    } else if let Some(target) = backticked_after(text, "is not implemented for `") {
        strip_module_path(target).to_string()
    } else {
        return None;
    };

    Some(Obligation {
        kind: ObligationKind::FieldPresence,
        subject: normalize(&subject),
        capability: decoded.name,
    })
}

/// `the trait bound `T: Trait` is not satisfied`.
fn tpl_trait_bound(text: &str) -> Option<Obligation> {
    let inner = backticked_after(text, "the trait bound `")?;
    if !text.contains("is not satisfied") {
        return None;
    }
    match top_level_colon(inner) {
        Some(colon) => Some(Obligation {
            kind: ObligationKind::TraitBound,
            subject: normalize(inner[..colon].trim()),
            capability: normalize(inner[colon + 1..].trim()),
        }),
        // No `subject: capability` split; keep the whole bound text
        None => Some(Obligation {
            kind: ObligationKind::Unsatisfied,
            subject: normalize(inner),
            capability: String::new(),
        }),
    }
}

/// `the trait `Trait` is not implemented for `T``.
fn tpl_not_implemented(text: &str) -> Option<Obligation> {
    let capability = backticked_after(text, "the trait `")?;
    let subject = backticked_after(text, "is not implemented for `")?;
    Some(Obligation {
        kind: ObligationKind::TraitBound,
        subject: normalize(strip_module_path(subject)),
        capability: normalize(capability),
    })
}

/// `type mismatch resolving `<T as Trait>::Assoc == U``.
fn tpl_assoc_type(text: &str) -> Option<Obligation> {
    let inner = backticked_after(text, "type mismatch resolving `")?;
    let subject = inner
        .strip_prefix('<')
        .and_then(|rest| rest.split(" as ").next())
        .unwrap_or(inner);
    Some(Obligation {
        kind: ObligationKind::AssocTypeEquality,
        subject: normalize(subject),
        capability: normalize(inner),
    })
}

/// Position of the subject/capability colon: a single `:` at generic depth
/// zero that is not part of a `::` path separator.
fn top_level_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth -= 1,
            b':' if depth == 0 => {
                if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                    i += 2;
                    continue;
                }
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}
