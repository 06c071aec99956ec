//! Sanitizer for generator replies: strips markdown code fences and
//! attempts a strict JSON decode.
//!
//! Generators are asked for bare JSON but routinely wrap it in a fenced
//! code block. Decode errors never escape as panics or propagated
//! exceptions; they come back as a [`SanitizeError`] carrying the raw
//! reply for diagnostics.

use serde_json::Value;
use thiserror::Error;

/// A reply that could not be decoded as JSON.
#[derive(Debug, Error)]
#[error("invalid JSON from generator: {message}")]
pub struct SanitizeError {
    pub message: String,
    /// The unmodified reply, kept for diagnostics.
    pub raw: String,
}

/// Strip a single leading fence marker (optionally tagged `json`) and a
/// single trailing fence marker, then trim surrounding whitespace.
///
/// Already-clean text passes through unchanged, so the function is
/// idempotent.
pub fn strip_code_fences(text: &str) -> &str {
    let mut clean = text.trim();

    if let Some(rest) = clean.strip_prefix("```json") {
        clean = rest.trim_start();
    } else if let Some(rest) = clean.strip_prefix("```") {
        clean = rest.trim_start();
    }

    if let Some(rest) = clean.strip_suffix("```") {
        clean = rest.trim_end();
    }

    clean
}

/// Sanitize a generator reply and decode it as JSON.
pub fn parse_generator_json(reply: &str) -> Result<Value, SanitizeError> {
    let clean = strip_code_fences(reply);
    serde_json::from_str(clean).map_err(|e| SanitizeError {
        message: e.to_string(),
        raw: reply.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_json() {
        let value = parse_generator_json(r#"{"chosen_store": "SPAR"}"#).unwrap();
        assert_eq!(value, json!({"chosen_store": "SPAR"}));
    }

    #[test]
    fn strips_tagged_fence() {
        let reply = "```json\n{\"found_deals\": []}\n```";
        let value = parse_generator_json(reply).unwrap();
        assert_eq!(value, json!({"found_deals": []}));
    }

    #[test]
    fn strips_untagged_fence() {
        let reply = "```\n[1, 2, 3]\n```";
        assert_eq!(parse_generator_json(reply).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn stripping_is_idempotent_on_clean_json() {
        let clean = r#"{"a": 1}"#;
        assert_eq!(strip_code_fences(clean), clean);
        assert_eq!(strip_code_fences(strip_code_fences(clean)), clean);
    }

    #[test]
    fn decode_failure_carries_raw_reply() {
        let reply = "Sure! Here is the plan you asked for.";
        let err = parse_generator_json(reply).unwrap_err();
        assert_eq!(err.raw, reply);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn whitespace_around_fences_is_tolerated() {
        let reply = "  ```json\n  {\"ok\": true}\n```  ";
        assert_eq!(parse_generator_json(reply).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn empty_reply_is_a_decode_failure() {
        assert!(parse_generator_json("").is_err());
        assert!(parse_generator_json("``````").is_err());
    }
}
