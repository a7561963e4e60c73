// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! String machinery for compiler type syntax.
//!
//! Everything here operates on raw diagnostic prose: balanced-generic
//! scanning, backtick extraction, and decoding of type-level character
//! sequences (`Symbol<N, Chars<'h', Chars<'i', Nil>>>`) back into literal
//! identifiers.

/// Find the position of a comma at the top level of generic nesting,
/// starting from `start`.
pub fn top_level_comma(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => return Some(start + i),
            _ => {}
        }
    }
    None
}

/// Extract a balanced generic argument starting just after an opening `<`.
/// Returns the argument text and the index of the matching `>`.
pub fn balanced_generic(text: &str, start: usize) -> Option<(String, usize)> {
    let mut depth = 1i32;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some((text[start..start + i].trim().to_string(), start + i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the backtick-quoted segment immediately following `prefix`.
pub fn backticked_after<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let start = text.find(prefix)? + prefix.len();
    let end = text[start..].find('`')?;
    Some(&text[start..start + end])
}

/// Collapse whitespace runs to single spaces and trim. This is the
/// normalization used for obligation identity: two mentions of the same
/// requirement must compare equal however the compiler wrapped them.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Drop the module path from a single type name (`foo::bar::Baz` -> `Baz`).
pub fn strip_module_path(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

// ============================================================================
// Type-level string decoding
// ============================================================================

/// A decoded type-level character string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub name: String,
    /// False when the compiler elided characters from the chain, so the
    /// decoded name may be truncated or have gaps.
    pub complete: bool,
}

/// Decode the first `Symbol<N, Chars<...>>` encoding found in `text`.
pub fn decode_symbol(text: &str) -> Option<DecodedSymbol> {
    let start = text.find("Symbol<")?;
    let after = start + "Symbol<".len();
    let comma = top_level_comma(text, after)?;
    let expected: usize = text[after..comma].trim().parse().ok()?;

    let chars = decode_char_chain(&text[comma..]);
    if chars.is_empty() {
        return None;
    }

    let name: String = chars.into_iter().collect();
    Some(DecodedSymbol {
        complete: name.chars().count() == expected,
        name,
    })
}

/// Walk a `Chars<'x', Chars<'y', ...>>` chain and collect the spelled-out
/// characters. Placeholders the compiler substitutes for elided characters
/// (`_`) are skipped, leaving a gap the caller reports via `complete`.
fn decode_char_chain(text: &str) -> Vec<char> {
    let mut chars = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("Chars<'") {
        let tail = &rest[pos + "Chars<'".len()..];
        if let Some(ch) = tail.chars().next() {
            if ch != '\'' && ch != '_' && (ch.is_alphanumeric() || ch == '-') {
                chars.push(ch);
            }
        }
        rest = tail;
    }
    chars
}

/// The full source extent of the first `Symbol<...>` encoding in `text`,
/// as a byte range, for in-place replacement.
pub fn symbol_extent(text: &str) -> Option<std::ops::Range<usize>> {
    let start = text.find("Symbol<")?;
    let (_, close) = balanced_generic(text, start + "Symbol<".len())?;
    Some(start..close + 1)
}
