//! Tolerant JSON extraction from free-text model responses.
//!
//! Model output is untrusted text. Parsing runs in two stages: a strict parse
//! after removing markdown code fences, then a bounded best-effort search for
//! a flat JSON object inside surrounding prose.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

pub type JsonObject = Map<String, Value>;

/// How an object was obtained from a response
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The whole response (minus code fences) was a JSON object
    Parsed(JsonObject),
    /// A JSON object was found embedded in surrounding text
    Recovered(JsonObject),
    /// Nothing usable; callers fall back to the raw text
    Raw,
}

impl Extraction {
    pub fn object(&self) -> Option<&JsonObject> {
        match self {
            Self::Parsed(obj) | Self::Recovered(obj) => Some(obj),
            Self::Raw => None,
        }
    }

    pub fn into_object(self) -> Option<JsonObject> {
        match self {
            Self::Parsed(obj) | Self::Recovered(obj) => Some(obj),
            Self::Raw => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw)
    }
}

pub struct ResponseParser;

impl ResponseParser {
    /// Remove a fenced code block wrapper (```` ```json ```` ... ```` ``` ````)
    /// around the whole response. Text that does not start with a fence is
    /// only trimmed.
    pub fn strip_code_fences(content: &str) -> String {
        let trimmed = content.trim();
        if !trimmed.starts_with("```") {
            return trimmed.to_string();
        }

        let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
        if lines.last().is_some_and(|line| line.trim() == "```") {
            lines.pop();
        }
        lines.join("\n").trim().to_string()
    }

    /// Remove every code fence marker anywhere in the response.
    pub fn remove_fence_markers(content: &str) -> String {
        content
            .replace("```json", "")
            .replace("```JSON", "")
            .replace("```", "")
            .trim()
            .to_string()
    }

    /// Strict parse; succeeds only if the text is exactly one JSON object.
    pub fn parse_object(content: &str) -> Option<JsonObject> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(obj)) => Some(obj),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Response is not a JSON object");
                None
            }
        }
    }

    /// Find a flat (non-nested) object containing `key` inside arbitrary text.
    pub fn recover_object_with_key(content: &str, key: &str) -> Option<JsonObject> {
        let pattern = format!(r#"(?s)\{{[^{{}}]*"{}"[^{{}}]*\}}"#, regex::escape(key));
        let re = Regex::new(&pattern).ok()?;

        let found = re
            .find_iter(content)
            .find_map(|m| Self::parse_object(m.as_str()));
        found
    }

    /// Slice from the first `{` to the last `}`
    pub fn brace_span(content: &str) -> Option<&str> {
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        (start < end).then(|| &content[start..=end])
    }

    /// Two-stage extraction of an object that is expected to carry `key`.
    pub fn extract_with_key(content: &str, key: &str) -> Extraction {
        let cleaned = Self::strip_code_fences(content);

        if let Some(obj) = Self::parse_object(&cleaned) {
            return Extraction::Parsed(obj);
        }
        match Self::recover_object_with_key(&cleaned, key) {
            Some(obj) => Extraction::Recovered(obj),
            None => Extraction::Raw,
        }
    }

    /// Extraction for nested objects: strict parse, then the outermost brace span.
    pub fn extract_object(content: &str) -> Option<JsonObject> {
        let cleaned = Self::strip_code_fences(content);

        Self::parse_object(&cleaned)
            .or_else(|| Self::brace_span(&cleaned).and_then(Self::parse_object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        let content = "```json\n{\"a\": 1}\n```";
        assert_eq!(ResponseParser::strip_code_fences(content), "{\"a\": 1}");

        let bare = "```\n{\"a\": 1}\n```\n";
        assert_eq!(ResponseParser::strip_code_fences(bare), "{\"a\": 1}");

        assert_eq!(ResponseParser::strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_strip_code_fences_without_closing_fence() {
        let content = "```json\n{\"a\": 1}";
        assert_eq!(ResponseParser::strip_code_fences(content), "{\"a\": 1}");
    }

    #[test]
    fn test_remove_fence_markers() {
        let content = "Here:\n```json\n{\"decision\": \"CONTINUE\"}\n```";
        assert_eq!(
            ResponseParser::remove_fence_markers(content),
            "Here:\n\n{\"decision\": \"CONTINUE\"}"
        );
    }

    #[test]
    fn test_parse_object_rejects_non_objects() {
        assert!(ResponseParser::parse_object("[1, 2]").is_none());
        assert!(ResponseParser::parse_object("42").is_none());
        assert!(ResponseParser::parse_object("not json").is_none());
        assert!(ResponseParser::parse_object("{\"a\": 1}").is_some());
    }

    #[test]
    fn test_recover_embedded_object() {
        let content = r#"Here is the result: {"probability_score": 42, "explanation": "ok"}"#;
        let obj = ResponseParser::recover_object_with_key(content, "probability_score").unwrap();
        assert_eq!(obj["probability_score"], json!(42));
        assert_eq!(obj["explanation"], json!("ok"));
    }

    #[test]
    fn test_recover_spans_lines() {
        let content = "Verdict below\n{\n  \"explanation\": \"multi\nline\",\n  \"probability_score\": 7\n}\nthanks";
        // Raw newline inside a JSON string is invalid, so nothing is recovered
        assert!(ResponseParser::recover_object_with_key(content, "probability_score").is_none());

        let valid = "Verdict below\n{\n  \"explanation\": \"fine\",\n  \"probability_score\": 7\n}\nthanks";
        let obj = ResponseParser::recover_object_with_key(valid, "probability_score").unwrap();
        assert_eq!(obj["probability_score"], json!(7));
    }

    #[test]
    fn test_recover_skips_unparseable_candidates() {
        let content = r#"Draft: {"probability_score": 4O} Final: {"probability_score": 40}"#;
        let obj = ResponseParser::recover_object_with_key(content, "probability_score").unwrap();
        assert_eq!(obj["probability_score"], json!(40));
    }

    #[test]
    fn test_recover_requires_key() {
        let content = r#"Result: {"score": 42}"#;
        assert!(ResponseParser::recover_object_with_key(content, "probability_score").is_none());
    }

    #[test]
    fn test_extract_with_key_stages() {
        let parsed = ResponseParser::extract_with_key(
            "```json\n{\"probability_score\": 90, \"explanation\": \"x\"}\n```",
            "probability_score",
        );
        assert!(matches!(parsed, Extraction::Parsed(_)));

        let recovered = ResponseParser::extract_with_key(
            "Sure! {\"probability_score\": 10} Hope this helps.",
            "probability_score",
        );
        assert!(matches!(recovered, Extraction::Recovered(_)));
        assert_eq!(recovered.object().unwrap()["probability_score"], json!(10));

        let raw = ResponseParser::extract_with_key("I cannot decide.", "probability_score");
        assert!(raw.is_raw());
        assert!(raw.into_object().is_none());
    }

    #[test]
    fn test_extract_object_nested() {
        let content = "Analysis:\n{\"fake_probability\": 0.8, \"flagged_artifacts\": [{\"severity\": 0.5}]}\nDone";
        let obj = ResponseParser::extract_object(content).unwrap();
        assert_eq!(obj["fake_probability"], json!(0.8));
        assert!(obj["flagged_artifacts"].is_array());
    }

    #[test]
    fn test_brace_span() {
        assert_eq!(ResponseParser::brace_span("a {b} c"), Some("{b}"));
        assert_eq!(ResponseParser::brace_span("} nothing {"), None);
        assert_eq!(ResponseParser::brace_span("none"), None);
    }
}
