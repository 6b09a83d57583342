//! OpenAI-compatible API provider.
//!
//! Calls `POST {endpoint}/chat/completions` for tool selection, text and
//! vision completions, and `POST {endpoint}/embeddings` for embedding
//! vectors. Works against api.openai.com or any server speaking the same
//! dialect (vLLM, LiteLLM, Ollama's `/v1` facade, …).
//!
//! Wire format notes:
//! - Tool definitions use OpenAI-style `{type: "function", function: {...}}` envelopes.
//! - Tool-call arguments arrive as a JSON-encoded *string* and are decoded here.
//! - Images travel inline as base64 `data:` URLs in mixed-content messages.
//! - Embedding vectors come back positionally aligned with the inputs.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::TaskSelector;
use super::{ToolDefinition, ToolSelection};
use crate::config::LlmConfig;

/// Connect timeout, separate from the per-request budget.
const CONNECT_TIMEOUT_SECS: u64 = 10;

// ── Chat API request types ───────────────────────────────

/// `/chat/completions` request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

/// Either a plain string or an array of typed parts (vision requests).
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Tool definition envelope (OpenAI function-calling format).
#[derive(Debug, Serialize)]
struct ToolSchema {
    #[serde(rename = "type")]
    tool_type: String,
    function: FunctionSchema,
}

/// Inner function definition within a tool envelope.
#[derive(Debug, Serialize)]
struct FunctionSchema {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ── Chat API response types ──────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object
    arguments: String,
}

// ── Embeddings API types ─────────────────────────────────

/// `/embeddings` request body.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

// ── OpenAiClient ─────────────────────────────────────────

/// Client for OpenAI-compatible chat and embeddings endpoints.
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        // Strip trailing slash for consistent URL construction
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            config,
            endpoint,
        }
    }

    /// Sends a chat request and returns the first choice's message.
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChoiceMessage> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat API returned {status}: {body}");
        }

        let resp: ChatResponse = response.json().await?;
        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow::anyhow!("chat API returned no choices"))
    }

    /// Plain text completion for a single user prompt.
    pub async fn complete_text(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Text(prompt.to_string()),
            }],
            tools: None,
            tool_choice: None,
        };

        debug!("Calling chat API ({}) for text completion", self.config.model);

        let message = self.post_chat(&request).await?;
        message
            .content
            .ok_or_else(|| anyhow::anyhow!("chat response contained no text content"))
    }

    /// Vision completion: an instruction plus one inline `data:` image URL.
    pub async fn complete_vision(&self, instruction: &str, image_url: String) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: instruction.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ]),
            }],
            tools: None,
            tool_choice: None,
        };

        debug!(
            "Calling chat API ({}) for vision completion",
            self.config.model
        );

        let message = self.post_chat(&request).await?;
        message
            .content
            .ok_or_else(|| anyhow::anyhow!("chat response contained no text content"))
    }

    /// Embeds a batch of inputs; one vector per input, in input order.
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: self.config.embedding_model.clone(),
            input: inputs.to_vec(),
        };

        let url = format!("{}/embeddings", self.endpoint);

        debug!(
            "Calling embeddings API ({}) with {} inputs",
            self.config.embedding_model,
            inputs.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("embeddings API returned {status}: {body}");
        }

        let resp: EmbeddingsResponse = response.json().await?;
        if resp.data.len() != inputs.len() {
            anyhow::bail!(
                "embeddings API returned {} vectors for {} inputs",
                resp.data.len(),
                inputs.len()
            );
        }
        Ok(resp.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl TaskSelector for OpenAiClient {
    async fn select(
        &self,
        instruction: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<ToolSelection>> {
        // Translate tool definitions into function-calling envelopes
        let tool_schemas = tools
            .iter()
            .map(|td| ToolSchema {
                tool_type: "function".to_string(),
                function: FunctionSchema {
                    name: td.name.clone(),
                    description: td.description.clone(),
                    parameters: td.input_schema.clone(),
                },
            })
            .collect();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Text(instruction.to_string()),
            }],
            tools: Some(tool_schemas),
            tool_choice: Some("auto".to_string()),
        };

        debug!(
            "Calling chat API ({}) with {} tool definitions",
            self.config.model,
            tools.len()
        );

        let message = self.post_chat(&request).await?;
        decode_selection(message)
    }

    fn description(&self) -> String {
        format!("openai-compatible ({})", self.config.model)
    }
}

/// Extracts the selected tool from a response message.
///
/// Only the first call is honored: the catalog maps one instruction to
/// one operation. A response without tool calls is a declined selection,
/// not an error; undecodable arguments are.
fn decode_selection(message: ChoiceMessage) -> Result<Option<ToolSelection>> {
    let call = match message.tool_calls.unwrap_or_default().into_iter().next() {
        Some(call) => call,
        None => return Ok(None),
    };
    let arguments: serde_json::Value = serde_json::from_str(&call.function.arguments)
        .map_err(|e| anyhow::anyhow!("tool call arguments are not valid JSON: {e}"))?;
    Ok(Some(ToolSelection {
        name: call.function.name,
        arguments,
    }))
}
