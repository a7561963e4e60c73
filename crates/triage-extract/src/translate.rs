// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cosmetic rewriting of CGP type-level encodings.
//!
//! Three structural families are recognized: type-level character strings
//! (`Symbol<N, Chars<...>>`), provider-delegation markers (`IsProviderFor`),
//! and consumer markers (`CanUseComponent`). Each rewrite is guarded by a
//! structural shape match; any type that does not match passes through
//! unchanged. The whole pass is total and idempotent: it never panics on an
//! unexpected shape, and every replacement removes the marker it matched,
//! so a second application is a no-op.

use crate::typestr::{balanced_generic, decode_symbol, symbol_extent, top_level_comma};

/// Rewrite every recognized CGP encoding in `text` into readable prose.
///
/// `consumer_trait` names the user-facing trait when a
/// "required by a bound in" note supplied one.
pub fn translate(text: &str, consumer_trait: Option<&str>) -> String {
    let mut out = decode_symbols(text);
    out = rewrite_is_provider_for(&out);
    out = rewrite_can_use_component(&out, consumer_trait);
    out
}

/// Derive the provider trait name from a component name
/// (`AreaCalculatorComponent` -> `AreaCalculator`).
pub fn provider_trait_name(component: &str) -> Option<String> {
    let stripped = component.strip_suffix("Component")?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_string())
}

/// Replace each `Symbol<N, Chars<...>>` with the decoded literal, quoted.
fn decode_symbols(text: &str) -> String {
    let mut out = text.to_string();
    while let Some(range) = symbol_extent(&out) {
        let Some(decoded) = decode_symbol(&out[range.clone()]) else {
            // Unexpected shape; leave the text alone rather than loop
            break;
        };
        out.replace_range(range, &format!("\"{}\"", decoded.name));
    }
    out
}

/// Rewrite provider-marker clauses.
///
/// The full clause `` `P` to implement `IsProviderFor<C, Ctx>` `` becomes
/// ``provider `P` cannot supply component `C` for context `Ctx` ``. A bare
/// `IsProviderFor<C, Ctx>` with no surrounding clause becomes "the provider
/// trait" named after the component.
fn rewrite_is_provider_for(text: &str) -> String {
    let mut out = text.to_string();
    while let Some(start) = out.find("IsProviderFor<") {
        let args_start = start + "IsProviderFor<".len();
        let Some(comma) = top_level_comma(&out, args_start) else {
            break;
        };
        let component = out[args_start..comma].trim().to_string();
        let Some((context, close)) = balanced_generic(&out, comma + 1) else {
            break;
        };

        // Try the full clause: for `P` to implement `IsProviderFor<...>`
        let clause = clause_extent(&out, start, close);
        match clause {
            Some((clause_start, clause_end, provider)) => {
                let replacement = format!(
                    "provider `{}` cannot supply component `{}` for context `{}`",
                    provider, component, context
                );
                out.replace_range(clause_start..clause_end, &replacement);
            }
            None => {
                let named = provider_trait_name(&component)
                    .map(|name| format!("the provider trait `{}`", name))
                    .unwrap_or_else(|| format!("the provider trait for `{}`", component));
                let (repl_start, repl_end) = strip_backticks(&out, start, close + 1);
                out.replace_range(repl_start..repl_end, &named);
            }
        }
    }
    out
}

/// Rewrite `CanUseComponent<C>` into consumer-trait prose.
fn rewrite_can_use_component(text: &str, consumer_trait: Option<&str>) -> String {
    let mut out = text.to_string();
    while let Some(start) = out.find("CanUseComponent<") {
        let args_start = start + "CanUseComponent<".len();
        let Some((component, close)) = balanced_generic(&out, args_start) else {
            break;
        };
        let replacement = match consumer_trait {
            Some(name) => format!("the consumer trait `{}`", name),
            None => format!("the consumer trait for `{}`", component),
        };
        let (repl_start, repl_end) = strip_backticks(&out, start, close + 1);
        out.replace_range(repl_start..repl_end, &replacement);
    }
    out
}

/// Locate the `` `P` to implement `Marker<...>` `` clause around a marker
/// occurrence. Returns (clause_start, clause_end, provider_name).
fn clause_extent(text: &str, marker_start: usize, args_close: usize) -> Option<(usize, usize, String)> {
    let before = &text[..marker_start];
    let infix = before.strip_suffix("`").map(|_| before)?;
    let to_implement = infix.rfind("` to implement `")?;
    let provider_open = infix[..to_implement].rfind('`')?;
    let provider = text[provider_open + 1..to_implement].to_string();
    if provider.is_empty() || provider.contains('`') {
        return None;
    }

    // Clause ends at the closing backtick after the marker's generics
    let mut end = args_close + 1;
    if text[end..].starts_with('`') {
        end += 1;
    }
    Some((provider_open, end, provider))
}

/// Widen a replacement range to swallow backticks hugging the type name, so
/// the prose replacement is not left wrapped in stray quotes.
fn strip_backticks(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut s = start;
    let mut e = end;
    if s > 0 && text[..s].ends_with('`') {
        s -= 1;
    }
    if text[e..].starts_with('`') {
        e += 1;
    }
    (s, e)
}
