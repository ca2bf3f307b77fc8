use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::schema::StructuredOutput;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Completion Request / Response
// =============================================================================

/// Identifies the caller of a completion for cost attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTag {
    pub module: String,
    pub request_type: String,
}

impl RequestTag {
    pub fn new(module: impl Into<String>, request_type: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            request_type: request_type.into(),
        }
    }
}

/// A structured-output completion request.
///
/// `schema` is the JSON schema the response content must satisfy. Build one
/// with [`CompletionRequest::structured`] to derive it from a Rust type.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tag: RequestTag,
    pub schema_name: String,
    pub schema: serde_json::Value,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn structured<T: StructuredOutput>(messages: Vec<Message>, tag: RequestTag) -> Self {
        Self {
            messages,
            tag,
            schema_name: T::type_name(),
            schema: T::strict_schema(),
            temperature: 0.0,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: serde_json::Value,
    pub usage: Usage,
}

impl Completion {
    /// Deserialize the structured content into `T`.
    pub fn parse<T: StructuredOutput>(&self) -> Result<T> {
        serde_json::from_value(self.content.clone())
            .map_err(|e| anyhow::anyhow!("Failed to deserialize {}: {}", T::type_name(), e))
    }
}

// =============================================================================
// CompletionClient Trait
// =============================================================================

/// Anything that can answer a structured completion request.
///
/// Object safe so callers can hold `Arc<dyn CompletionClient>` and swap
/// backends (or mocks) freely.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn create_completion(&self, request: CompletionRequest) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Verdict {
        ok: bool,
    }

    #[test]
    fn structured_request_carries_schema() {
        let request = CompletionRequest::structured::<Verdict>(
            vec![Message::system("sys"), Message::user("hi")],
            RequestTag::new("test", "verdict"),
        );
        assert_eq!(request.schema_name, "Verdict");
        assert_eq!(request.temperature, 0.0);
        assert!(request.schema.get("properties").is_some());
    }

    #[test]
    fn completion_parse_reports_type_on_mismatch() {
        let completion = Completion {
            content: serde_json::json!({ "ok": "nope" }),
            usage: Usage::default(),
        };
        let err = completion.parse::<Verdict>().unwrap_err();
        assert!(err.to_string().contains("Verdict"));
    }

    #[test]
    fn usage_totals() {
        let usage = Usage {
            input_tokens: 120,
            output_tokens: 30,
        };
        assert_eq!(usage.total_tokens(), 150);
    }
}
