//! JSON parse-or-fallback
//!
//! Values read back from storage or response bodies may or may not be JSON.
//! [`safe_parse`] never fails: text that is not valid JSON is kept as-is.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of [`safe_parse`]
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Text was valid JSON
    Parsed(Value),
    /// Text was not JSON; the raw string is kept
    Unparsed(String),
}

impl ParseOutcome {
    /// Convert into a JSON value, wrapping unparsed text as a JSON string
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Parsed(value) => value,
            Self::Unparsed(raw) => Value::String(raw),
        }
    }

    /// String view: the raw text, or the parsed value if it is a JSON string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Parsed(Value::String(s)) | Self::Unparsed(s) => Some(s),
            Self::Parsed(_) => None,
        }
    }

    /// Deserialize the parsed value into `T`; `None` for unparsed text or a shape mismatch
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            Self::Parsed(value) => serde_json::from_value(value.clone()).ok(),
            Self::Unparsed(_) => None,
        }
    }

    /// Whether the text parsed as JSON
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Parse `text` as JSON, falling back to the raw string
#[must_use]
pub fn safe_parse(text: &str) -> ParseOutcome {
    match serde_json::from_str(text) {
        Ok(value) => ParseOutcome::Parsed(value),
        Err(_) => ParseOutcome::Unparsed(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_objects_and_scalars() {
        assert_eq!(safe_parse(r#"{"a":1}"#), ParseOutcome::Parsed(json!({"a": 1})));
        assert_eq!(safe_parse("42"), ParseOutcome::Parsed(json!(42)));
        assert_eq!(safe_parse("true"), ParseOutcome::Parsed(json!(true)));
    }

    #[test]
    fn falls_back_to_raw_text() {
        assert_eq!(
            safe_parse("plain token"),
            ParseOutcome::Unparsed("plain token".to_string())
        );
        assert_eq!(safe_parse(""), ParseOutcome::Unparsed(String::new()));
        assert_eq!(safe_parse("{broken"), ParseOutcome::Unparsed("{broken".to_string()));
    }

    #[test]
    fn as_str_sees_through_json_strings() {
        assert_eq!(safe_parse(r#""quoted""#).as_str(), Some("quoted"));
        assert_eq!(safe_parse("raw").as_str(), Some("raw"));
        assert_eq!(safe_parse("[1]").as_str(), None);
    }

    #[test]
    fn decode_typed() {
        let outcome = safe_parse(r#"{"id": 7, "name": "ada"}"#);
        let decoded: Option<serde_json::Map<String, Value>> = outcome.decode();
        assert_eq!(decoded.unwrap()["id"], json!(7));
        assert!(safe_parse("nope").decode::<u32>().is_none());
    }

    #[test]
    fn into_value_wraps_raw_text() {
        assert_eq!(safe_parse("hi").into_value(), json!("hi"));
    }
}
