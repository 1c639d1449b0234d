//! Boolean input predicates.
//!
//! None of these fail: malformed input is simply `false`.

use std::sync::OnceLock;

use regex::Regex;

fn email_re() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.+-]+@[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*\.[A-Za-z]{2,6}$").unwrap()
    })
}

fn phone_re() -> &'static Regex {
    static PHONE_RE: OnceLock<Regex> = OnceLock::new();
    PHONE_RE.get_or_init(|| Regex::new(r"^[0-9]{10}$").unwrap())
}

fn alphabetic_re() -> &'static Regex {
    static ALPHABETIC_RE: OnceLock<Regex> = OnceLock::new();
    ALPHABETIC_RE.get_or_init(|| Regex::new(r"^[A-Za-z]+$").unwrap())
}

fn alphanumeric_re() -> &'static Regex {
    static ALPHANUMERIC_RE: OnceLock<Regex> = OnceLock::new();
    ALPHANUMERIC_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap())
}

/// `local@domain.tld` with a 2–6 letter TLD.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// Exactly ten ASCII digits, nothing else.
#[must_use]
pub fn is_valid_phone_number(phone: &str) -> bool {
    phone_re().is_match(phone)
}

/// Non-empty and ASCII letters only.
#[must_use]
pub fn is_alphabetic(text: &str) -> bool {
    alphabetic_re().is_match(text)
}

/// Non-empty and ASCII letters or digits only.
#[must_use]
pub fn is_alphanumeric(text: &str) -> bool {
    alphanumeric_re().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user@example.toolongtld"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user example@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_needs_exactly_ten_digits() {
        assert!(is_valid_phone_number("1234567890"));
        assert!(!is_valid_phone_number("12345"));
        assert!(!is_valid_phone_number("12345678901"));
        assert!(!is_valid_phone_number("123-456-7890"));
        assert!(!is_valid_phone_number("+123456789"));
        assert!(!is_valid_phone_number("١٢٣٤٥٦٧٨٩٠"));
    }

    #[test]
    fn alphabetic_and_alphanumeric() {
        assert!(is_alphabetic("Hello"));
        assert!(!is_alphabetic("Hello1"));
        assert!(!is_alphabetic("héllo"));
        assert!(is_alphanumeric("Hello123"));
        assert!(!is_alphanumeric("Hello 123"));
    }

    #[test]
    fn empty_string_fails_character_classes() {
        assert!(!is_alphabetic(""));
        assert!(!is_alphanumeric(""));
    }
}
