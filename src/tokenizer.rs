//! Identifier tokenizer (C1): emits the token set for one identifier,
//! honouring dotted hierarchy, backtick arity, and angle-bracket generics.
//!
//! This mirrors the shape of the host crate's own `tokenize()` in `lib.rs`
//! (split on non-alphanumerics, lower-case everything) but the rules here are
//! specific to fully-qualified API identifiers rather than free text: dotted
//! segments, backtick generic arity (`` List`1 ``), and angle-bracket
//! generics (`Dictionary<string, int>`) each decompose into a fixed set of
//! sub-tokens instead of being split on every punctuation character.

use std::collections::HashSet;

/// Tokenizes one whitespace-delimited identifier per the rules in §4.1.
/// Real index fields are multi-word (e.g. a `summary`); use
/// [`tokenize_text`] for those. This is the single-identifier primitive.
pub fn tokenize_one(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut raw = Vec::new();
    if let Some(lt) = input.find('<') {
        let base = &input[..lt];
        let suffix = &input[lt..];
        raw.push(input.to_string());
        emit_base_with_suffix(base, suffix, &mut raw);
    } else if let Some(bt) = input.find('`') {
        let base = &input[..bt];
        let suffix = &input[bt..];
        raw.push(input.to_string());
        emit_base_with_suffix(base, suffix, &mut raw);
    } else {
        emit_dotted_plain(input, &mut raw);
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    for token in raw {
        let lower = token.to_lowercase();
        if seen.insert(lower.clone()) {
            out.push(lower);
        }
    }
    out
}

/// Splits `value` on whitespace and tokenizes each piece with
/// [`tokenize_one`], concatenating the results in order. This is what the
/// identifier analyzer (C2) runs over multi-word fields such as `summary`.
pub fn tokenize_text(value: &str) -> Vec<String> {
    value.split_whitespace().flat_map(tokenize_one).collect()
}

/// Rule 3: plain dotted identifier (no `<`, no `` ` ``).
fn emit_dotted_plain(input: &str, raw: &mut Vec<String>) {
    let segments: Vec<&str> = input.split('.').collect();
    if segments.len() == 1 {
        raw.push(input.to_string());
        return;
    }
    raw.push(input.to_string());
    for seg in &segments {
        raw.push((*seg).to_string());
    }
    for (start, len) in contiguous_subruns(segments.len()) {
        raw.push(segments[start..start + len].join("."));
    }
}

/// Rules 1/2: a dotted `base` with a generic/backtick `suffix` attached.
fn emit_base_with_suffix(base: &str, suffix: &str, raw: &mut Vec<String>) {
    let segments: Vec<&str> = base.split('.').collect();
    if segments.len() == 1 {
        raw.push(base.to_string());
        return;
    }
    for seg in &segments {
        raw.push((*seg).to_string());
    }
    let last = segments.last().unwrap();
    raw.push(format!("{last}{suffix}"));
    let n = segments.len();
    for (start, len) in contiguous_subruns(n) {
        let sub = segments[start..start + len].join(".");
        let reaches_end = start + len == n;
        raw.push(sub.clone());
        if reaches_end {
            raw.push(format!("{sub}{suffix}"));
        }
    }
}

/// Every contiguous `(start, len)` window over `n` dot-separated segments
/// with `len >= 2`.
fn contiguous_subruns(n: usize) -> Vec<(usize, usize)> {
    let mut v = Vec::new();
    for len in 2..=n {
        for start in 0..=(n - len) {
            v.push((start, len));
        }
    }
    v
}
