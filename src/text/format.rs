//! Case conversion and slug helpers.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn whitespace_re() -> &'static Regex {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_slug_re() -> &'static Regex {
    static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_-]+").unwrap())
}

fn dash_run_re() -> &'static Regex {
    static DASH_RUN_RE: OnceLock<Regex> = OnceLock::new();
    DASH_RUN_RE.get_or_init(|| Regex::new(r"-{2,}").unwrap())
}

fn snake_segment_re() -> &'static Regex {
    static SNAKE_SEGMENT_RE: OnceLock<Regex> = OnceLock::new();
    SNAKE_SEGMENT_RE.get_or_init(|| Regex::new(r"_([A-Za-z0-9_])").unwrap())
}

/// URL slug: lowercase, whitespace runs become `-`, anything other than
/// letters, digits, `_` and `-` is dropped, repeated `-` collapse.
///
/// `slugify(slugify(x)) == slugify(x)` for every input.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let dashed = whitespace_re().replace_all(&lowered, "-");
    let stripped = non_slug_re().replace_all(&dashed, "");
    dash_run_re().replace_all(&stripped, "-").into_owned()
}

/// Lowercase everything, then uppercase the first character of each word.
///
/// A word starts at a word character (alphanumeric or `_`) that begins the
/// string or follows a non-word character, so `"o'neil"` becomes `"O'Neil"`.
#[must_use]
pub fn to_title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.to_lowercase().chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

/// `userName` → `user_name`.
///
/// Every ASCII uppercase letter becomes `_` plus its lowercase form, so a
/// leading capital yields a leading underscore (`UserName` → `_user_name`).
/// Not an inverse of [`snake_to_camel`] for inputs that already contain
/// underscores or leading capitals.
#[must_use]
pub fn camel_to_snake(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `user_name` → `userName`: each `_` followed by a word character is
/// replaced by that character uppercased.
#[must_use]
pub fn snake_to_camel(text: &str) -> String {
    snake_segment_re()
        .replace_all(text, |caps: &Captures| caps[1].to_ascii_uppercase())
        .into_owned()
}

/// Uppercase the first character; the rest is left alone.
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when anything was removed.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
