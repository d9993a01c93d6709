//! Natural-language summarization of the result envelope
//!
//! The last pipeline stage: turns bindings (or a text answer) into a
//! user-facing sentence. Protocol failures are not summarized; the caller
//! surfaces their message directly.

use anyhow::{anyhow, Result};

use crate::llm::{ChatClient, ChatRequest};
use crate::prompts::FINAL_PROMPT;
use crate::types::{ReasoningRequest, ResultEnvelope, Turn};

const SUMMARY_TEMPERATURE: f32 = 0.7;

/// Summarize a terminal envelope for the user.
///
/// Returns `None` for protocol failures; there is no result to phrase.
pub fn summarize(
    client: &dyn ChatClient,
    request: &ReasoningRequest,
    envelope: &ResultEnvelope,
) -> Result<Option<String>> {
    let result_json = match envelope {
        ResultEnvelope::ProtocolFailure { .. } => return Ok(None),
        other => serde_json::to_string_pretty(other)?,
    };

    let user_text = format!(
        "We ran inference on the context:\n{}\nand the question:\n{}\nReasoning mode used was: {}\nThe engine returned the following result:\n{}\nSummarize it in clear natural language for the user.",
        request.context,
        request.question,
        request.mode.as_str(),
        result_json
    );

    let turns = vec![Turn::system(FINAL_PROMPT), Turn::user(user_text)];
    let chat = ChatRequest {
        turns: &turns,
        tools: &[],
        json_only: false,
        temperature: Some(SUMMARY_TEMPERATURE),
    };

    let reply = client.complete(&chat)?;
    reply
        .content
        .map(|t| Some(t.trim().to_string()))
        .ok_or_else(|| anyhow!("summarizer returned no text content"))
}
