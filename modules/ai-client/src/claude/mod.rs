mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::{Completion, CompletionClient, CompletionRequest, MessageRole};

use client::MessagesApi;
use types::*;

const STRUCTURED_TOOL: &str = "structured_response";

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    pub(crate) model: String,
    api: MessagesApi,
    max_tokens: u32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            model: model.into(),
            api: MessagesApi::new(&api_key),
            max_tokens: 1024,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut chat = ChatRequest::new(&self.model)
            .temperature(request.temperature)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: format!("Respond with a {} object.", request.schema_name),
                input_schema: request.schema.clone(),
            });
        chat.max_tokens = self.max_tokens;

        if !system.is_empty() {
            chat = chat.system(system.join("\n\n"));
        }

        for message in &request.messages {
            chat = match message.role {
                MessageRole::System => chat,
                MessageRole::User => chat.message(WireMessage::user(&message.content)),
                MessageRole::Assistant => chat.message(WireMessage::assistant(&message.content)),
            };
        }

        chat
    }
}

// =============================================================================
// CompletionClient Implementation
// =============================================================================

#[async_trait]
impl CompletionClient for Claude {
    async fn create_completion(&self, request: CompletionRequest) -> Result<Completion> {
        let chat = self.build_request(&request);
        let response = self.api.send(&request.tag, &chat).await?;

        let content = match response.tool_input(STRUCTURED_TOOL) {
            Some(input) => input.clone(),
            None => {
                return Err(anyhow!(
                    "No structured output in Claude response (stop_reason: {}, text: {})",
                    response.stop_reason.as_deref().unwrap_or("none"),
                    response.text().unwrap_or(""),
                ))
            }
        };

        Ok(Completion {
            content,
            usage: response.usage.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Message, RequestTag};
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Answer {
        value: String,
    }

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        assert_eq!(ai.model(), "claude-haiku-4-5-20251001");
        assert_eq!(ai.max_tokens, 1024);
    }

    #[test]
    fn build_request_joins_system_turns_and_keeps_dialogue() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        let request = CompletionRequest::structured::<Answer>(
            vec![
                Message::system("first rule"),
                Message::system("second rule"),
                Message::user("question"),
                Message::assistant("draft answer"),
                Message::user("try again"),
            ],
            RequestTag::new("test", "answer"),
        );

        let chat = ai.build_request(&request);

        assert_eq!(chat.system.as_deref(), Some("first rule\n\nsecond rule"));
        assert_eq!(chat.messages.len(), 3);
        assert_eq!(chat.messages[0].role, Role::User);
        assert_eq!(chat.messages[1].role, Role::Assistant);
        assert_eq!(chat.messages[1].content, "draft answer");
        assert_eq!(chat.temperature, Some(0.0));
        assert_eq!(chat.tools.as_ref().map(Vec::len), Some(1));
    }
}
