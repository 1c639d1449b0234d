//! Mobile client detection from the `User-Agent` header.

use std::sync::OnceLock;

use regex::Regex;

fn mobile_re() -> &'static Regex {
    static MOBILE_RE: OnceLock<Regex> = OnceLock::new();
    MOBILE_RE.get_or_init(|| {
        Regex::new(r"(?i)android|webos|iphone|ipad|ipod|blackberry|iemobile|opera mini").unwrap()
    })
}

/// Whether `user_agent` looks like a phone or tablet browser.
#[must_use]
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    mobile_re().is_match(user_agent)
}
