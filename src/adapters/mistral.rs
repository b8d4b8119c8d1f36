//! Mistral chat-completions client.
//!
//! The schema is offered to the model as a single function tool and
//! `tool_choice = "any"` forces the answer through it. The tool arguments are
//! then coerced into [`PcbCharacteristics`].

use crate::domain::model::{json_schema, PcbCharacteristics, SCHEMA_NAME};
use crate::domain::ports::{ConfigProvider, LanguageModel};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai";
pub const DEFAULT_MODEL: &str = "mistral-medium-latest";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

const SYSTEM_PROMPT: &str = "You are an experienced PCB engineer. Extract PCB characteristics from the provided data including: company name, board name, quantity, base material, foil thickness, layer count, board size, and panelization. If any information is missing, use empty string or 0 as appropriate.";

const TOOL_DESCRIPTION: &str = "Характеристики печатной платы, извлеченные из спецификации";

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ModelSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            endpoint: config.api_endpoint().to_string(),
            api_key: config.api_key().to_string(),
            model: config.model_name().to_string(),
            temperature: config.temperature(),
            timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Tool>,
    pub tool_choice: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// Usually a JSON-encoded string; some deployments send an object.
    pub arguments: Value,
}

pub struct MistralClient {
    client: Client,
    settings: ModelSettings,
}

impl MistralClient {
    pub fn new(settings: ModelSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.endpoint.trim_end_matches('/')
        )
    }

    pub fn build_request(&self, sheet_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: sheet_text.to_string(),
                },
            ],
            tools: vec![Tool {
                kind: "function",
                function: FunctionDefinition {
                    name: SCHEMA_NAME,
                    description: TOOL_DESCRIPTION,
                    parameters: json_schema(),
                },
            }],
            tool_choice: "any",
        }
    }
}

impl LanguageModel for MistralClient {
    async fn extract_characteristics(&self, sheet_text: &str) -> Result<PcbCharacteristics> {
        let url = self.completions_url();
        tracing::debug!("🤖 Calling model {} at {}", self.settings.model, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.build_request(sheet_text))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("🤖 Model API response status: {}", status);

        if !status.is_success() {
            let body = error_body(response.text().await);
            return Err(EtlError::ModelApiError {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        parse_chat_response(chat)
    }
}

fn error_body(read: reqwest::Result<String>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Could not read model API error body: {}", e);
            format!("<unreadable body: {}>", e)
        }
    }
}

/// Pulls the structured answer out of a chat response.
pub fn parse_chat_response(chat: ChatResponse) -> Result<PcbCharacteristics> {
    let message = chat
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| EtlError::ProcessingError {
            message: "Model response contained no choices".to_string(),
        })?;

    if let Some(call) = message.tool_calls.and_then(|calls| calls.into_iter().next()) {
        if call.function.name != SCHEMA_NAME {
            tracing::warn!("Model answered through unexpected tool '{}'", call.function.name);
        }
        let arguments = match call.function.arguments {
            Value::String(raw) => serde_json::from_str(&raw)?,
            other => other,
        };
        return Ok(PcbCharacteristics::from_json(&arguments));
    }

    match message.content {
        Some(Value::String(content)) if !content.trim().is_empty() => {
            let parsed: Value = serde_json::from_str(strip_code_fence(&content))?;
            Ok(PcbCharacteristics::from_json(&parsed))
        }
        _ => Err(EtlError::ProcessingError {
            message: "Model response contained neither a tool call nor JSON content".to_string(),
        }),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
