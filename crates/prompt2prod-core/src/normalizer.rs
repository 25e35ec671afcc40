//! Response normalizer: infer provider and text from the upstream body's shape
//!
//! Detection order is fixed and the first match wins:
//!
//! 1. [`UpstreamShape::FlatGeneration`]: a top-level `response` string (Ollama)
//! 2. [`UpstreamShape::Choices`]: a non-empty top-level `choices` array (OpenAI)
//! 3. [`UpstreamShape::Unrecognized`]: anything else, stringified whole
//!
//! The provider is never taken from the request or from a field in the body.

use serde::Deserialize;
use serde_json::Value;

use crate::types::Provider;

/// Decoded view of an upstream body
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamShape<'a> {
    FlatGeneration(String),
    /// First element of the `choices` array
    Choices(&'a Value),
    Unrecognized(&'a Value),
}

#[derive(Deserialize)]
struct FlatGeneration {
    response: String,
}

/// Text and inferred provider, always well-formed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub provider: Provider,
}

impl<'a> UpstreamShape<'a> {
    pub fn detect(body: &'a Value) -> Self {
        // Derived struct visitors also accept sequences, so only objects qualify
        let flat = body
            .as_object()
            .and_then(|_| FlatGeneration::deserialize(body).ok());
        if let Some(flat) = flat {
            return Self::FlatGeneration(flat.response);
        }
        match body.get("choices").and_then(Value::as_array) {
            Some(choices) if !choices.is_empty() => Self::Choices(&choices[0]),
            _ => Self::Unrecognized(body),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::FlatGeneration(_) => Provider::Ollama,
            Self::Choices(_) => Provider::OpenAi,
            Self::Unrecognized(_) => Provider::Unknown,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::FlatGeneration(text) => text,
            Self::Choices(choice) => choice_text(choice),
            Self::Unrecognized(body) => body.to_string(),
        }
    }
}

/// `message.content` when it is a string, else `text`, else empty
fn choice_text(choice: &Value) -> String {
    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .or_else(|| choice.get("text").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Normalize any upstream body. Never fails.
pub fn normalize(body: &Value) -> Normalized {
    let shape = UpstreamShape::detect(body);
    let provider = shape.provider();
    Normalized {
        text: shape.into_text(),
        provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_generation() {
        let n = normalize(&json!({"response": "def hello():\n    pass", "model": "llama3.2:1b"}));
        assert_eq!(n.text, "def hello():\n    pass");
        assert_eq!(n.provider, Provider::Ollama);
    }

    #[test]
    fn test_choices_message_content() {
        let n = normalize(&json!({
            "choices": [{"message": {"role": "assistant", "content": "# Python Hello World"}}]
        }));
        assert_eq!(n.text, "# Python Hello World");
        assert_eq!(n.provider, Provider::OpenAi);
    }

    #[test]
    fn test_choices_only_first_element_used() {
        let n = normalize(&json!({"choices": [
            {"message": {"content": "first"}},
            {"message": {"content": "second"}}
        ]}));
        assert_eq!(n.text, "first");
    }

    #[test]
    fn test_choices_text_fallback() {
        let n = normalize(&json!({"choices": [{"text": "completion style"}]}));
        assert_eq!(n.text, "completion style");
        assert_eq!(n.provider, Provider::OpenAi);
    }

    #[test]
    fn test_choices_null_content_falls_back_to_text() {
        let n = normalize(&json!({
            "choices": [{"message": {"content": null}, "text": "fallback"}]
        }));
        assert_eq!(n.text, "fallback");
    }

    #[test]
    fn test_choices_without_text_is_empty() {
        let n = normalize(&json!({"choices": [{"finish_reason": "stop"}]}));
        assert_eq!(n.text, "");
        assert_eq!(n.provider, Provider::OpenAi);

        let n = normalize(&json!({"choices": [42]}));
        assert_eq!(n.text, "");
        assert_eq!(n.provider, Provider::OpenAi);
    }

    #[test]
    fn test_flat_generation_wins_over_choices() {
        let n = normalize(&json!({
            "response": "flat",
            "choices": [{"message": {"content": "nested"}}]
        }));
        assert_eq!(n.text, "flat");
        assert_eq!(n.provider, Provider::Ollama);
    }

    #[test]
    fn test_non_string_response_is_not_flat() {
        let n = normalize(&json!({"response": {"nested": true}, "choices": [{"text": "t"}]}));
        assert_eq!(n.provider, Provider::OpenAi);
        assert_eq!(n.text, "t");
    }

    #[test]
    fn test_empty_choices_is_unrecognized() {
        let body = json!({"choices": []});
        let n = normalize(&body);
        assert_eq!(n.provider, Provider::Unknown);
        assert_eq!(n.text, r#"{"choices":[]}"#);
    }

    #[test]
    fn test_unrecognized_is_stringified() {
        let body = json!({"error": "weird"});
        let n = normalize(&body);
        assert_eq!(n.provider, Provider::Unknown);
        assert_eq!(n.text, body.to_string());
    }

    #[test]
    fn test_non_object_bodies_never_fail() {
        for body in [json!(null), json!([1, 2]), json!("plain"), json!(7)] {
            let n = normalize(&body);
            assert_eq!(n.provider, Provider::Unknown);
            assert_eq!(n.text, body.to_string());
        }
    }

    #[test]
    fn test_array_of_strings_is_not_flat() {
        for body in [json!(["hello from an array"]), json!(["a", "b"])] {
            let n = normalize(&body);
            assert_eq!(n.provider, Provider::Unknown);
            assert_eq!(n.text, body.to_string());
            assert_eq!(UpstreamShape::detect(&body), UpstreamShape::Unrecognized(&body));
        }
    }

    #[test]
    fn test_detect_order_is_documented_variants() {
        let flat = json!({"response": "x"});
        assert_eq!(
            UpstreamShape::detect(&flat),
            UpstreamShape::FlatGeneration("x".to_string())
        );

        let choices = json!({"choices": [{"text": "y"}]});
        assert_eq!(
            UpstreamShape::detect(&choices),
            UpstreamShape::Choices(&json!({"text": "y"}))
        );

        let other = json!({});
        assert_eq!(UpstreamShape::detect(&other), UpstreamShape::Unrecognized(&other));
    }
}
