//! Generation collaborator client (OpenAI-compatible chat completions)
//!
//! The pipeline never talks to the service directly; every component takes a
//! `ChatClient` reference so tests can substitute a scripted fake.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::types::{Role, ToolCall, Turn};

// ============================================================================
// Client Contract
// ============================================================================

/// A tool signature advertised to the generation collaborator
/// (OpenAI function-calling format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSignature {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: Value,
}

/// One generation round: the full transcript plus the tools on offer
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub turns: &'a [Turn],
    pub tools: &'a [ToolSignature],
    /// Structured-output sub-mode: constrain the reply to a JSON object
    pub json_only: bool,
    /// Per-call temperature override; falls back to the configured default
    pub temperature: Option<f32>,
}

impl<'a> ChatRequest<'a> {
    pub fn text_only(turns: &'a [Turn]) -> Self {
        Self { turns, tools: &[], json_only: false, temperature: None }
    }
}

/// The collaborator's reply: free text, or exactly one tool invocation
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: Option<String>,
    pub tool_call: Option<ToolCall>,
}

/// Injected generation collaborator.
///
/// Calls are synchronous, blocking round-trips; a transport error or timeout
/// is returned as `Err` and the retry controller charges it against the
/// attempt budget like any other execution failure.
pub trait ChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatReply>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Request body for the chat completions API (internal)
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSignature,
}

#[derive(Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response from the chat completions API
#[derive(Deserialize, Debug)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize, Debug)]
struct ApiChoice {
    message: ApiReplyMessage,
}

#[derive(Deserialize, Debug)]
struct ApiReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Deserialize, Debug)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Deserialize, Debug)]
struct ApiFunctionCall {
    name: String,
    /// JSON-encoded arguments object, as the API delivers it
    arguments: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Blocking HTTP client for an OpenAI-compatible endpoint
pub struct HttpChatClient {
    client: Client,
    config: LlmConfig,
    api_key: Option<String>,
    verbose: bool,
}

impl HttpChatClient {
    pub fn new(config: LlmConfig, verbose: bool) -> Result<Self> {
        let api_key = config.api_key();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config, api_key, verbose })
    }
}

impl ChatClient for HttpChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
        let messages: Vec<ApiMessage> = request
            .turns
            .iter()
            .map(|t| ApiMessage { role: role_str(t.role), content: &t.content })
            .collect();

        let tools: Vec<ApiTool> = request
            .tools
            .iter()
            .map(|t| ApiTool { kind: "function", function: t })
            .collect();

        let api_request = ApiRequest {
            model: &self.config.model,
            messages,
            tools,
            response_format: request
                .json_only
                .then_some(ApiResponseFormat { kind: "json_object" }),
            temperature: request.temperature.unwrap_or(self.config.temperature),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        if self.verbose {
            eprintln!("DEBUG: Calling LLM at {}", url);
        }

        let mut builder = self.client.post(&url).json(&api_request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .map_err(|e| anyhow!("LLM request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("LLM error {}: {}", status, body));
        }

        let resp: ApiResponse = response
            .json()
            .map_err(|e| anyhow!("Failed to parse LLM response: {}", e))?;

        let message = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| anyhow!("LLM response contained no choices"))?;

        // Exactly one tool invocation is consumed per round; extra calls in
        // the same reply are ignored.
        let tool_call = message.tool_calls.into_iter().next().map(|tc| {
            let arguments = serde_json::from_str(&tc.function.arguments)
                // Undecodable arguments reach the dispatcher as-is so the
                // structural validation error is fed back to the model.
                .unwrap_or(Value::String(tc.function.arguments));
            ToolCall { name: tc.function.name, arguments }
        });

        Ok(ChatReply { content: message.content, tool_call })
    }
}

// ============================================================================
// JSON Extraction
// ============================================================================

/// Extract the first balanced JSON object from text.
///
/// Structured-output replies occasionally arrive wrapped in prose or fences;
/// brace balancing (string- and escape-aware) recovers the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let s = text.trim();
    let start = s.find('{')?;

    let mut in_str = false;
    let mut escape = false;
    let mut depth = 0;

    for (i, ch) in s[start..].char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }

        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

// ============================================================================
// Tests
// ============================================================================
