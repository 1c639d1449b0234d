//! PII censoring for display.
//!
//! Every function masks the interior of a "unit" (a word, an email local
//! part, a domain label, a run of phone digits) and keeps its boundary
//! characters. Masking counts `char`s, not bytes, so a censored unit has
//! the same number of characters as the input.

use std::fmt::Display;
use std::iter;
use std::sync::OnceLock;

use regex::Regex;

/// Character used to mask censored positions.
pub const MASK: char = '*';

fn phone_re() -> &'static Regex {
    static PHONE_RE: OnceLock<Regex> = OnceLock::new();
    PHONE_RE.get_or_init(|| Regex::new(r"^\+?[0-9]+$").unwrap())
}

/// Mask everything but the first and last character.
///
/// | length | result |
/// |---|---|
/// | 0 | `""` |
/// | 1 | `"*"` |
/// | 2 | first char + `*` |
/// | ≥3 | first + `*` × (len − 2) + last |
///
/// ```
/// use webapp_kit::text::censor_word;
/// assert_eq!(censor_word("hello"), "h***o");
/// assert_eq!(censor_word("ab"), "a*");
/// ```
#[must_use]
pub fn censor_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    match chars.as_slice() {
        [] => String::new(),
        [_] => MASK.to_string(),
        [first, _] => format!("{first}{MASK}"),
        [first, middle @ .., last] => {
            let mut out = String::with_capacity(word.len());
            out.push(*first);
            out.extend(iter::repeat_n(MASK, middle.len()));
            out.push(*last);
            out
        }
    }
}

/// Censor a phone number, keeping a leading `+` verbatim.
///
/// Accepts anything printable so numeric phone values work directly.
/// Input that is not `+digits` / `digits` is censored whole.
#[must_use]
pub fn censor_phone(phone: impl Display) -> String {
    let raw = phone.to_string();
    if !phone_re().is_match(&raw) {
        return censor_word(&raw);
    }
    match raw.strip_prefix('+') {
        Some(digits) => format!("+{}", censor_word(digits)),
        None => censor_word(&raw),
    }
}

/// Censor the local part and the first domain label of an email address.
///
/// The domain suffix after the first label (`.com`, `.co.uk`) is kept.
/// Single-character units stay as-is.
/// Input without exactly one `@` is returned unchanged.
#[must_use]
pub fn censor_email(email: &str) -> String {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return email.to_string();
    };

    let (label, suffix) = match domain.find('.') {
        Some(idx) => domain.split_at(idx),
        None => (domain, ""),
    };

    format!("{}@{}{suffix}", censor_interior(local), censor_interior(label))
}

/// Censor each whitespace-separated token of a name; tokens are rejoined with one space.
#[must_use]
pub fn censor_full_name(name: &str) -> String {
    name.split_whitespace()
        .map(censor_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn censor_interior(unit: &str) -> String {
    if unit.chars().count() <= 1 {
        unit.to_string()
    } else {
        censor_word(unit)
    }
}
