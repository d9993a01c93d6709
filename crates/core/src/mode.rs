//! Reasoning mode selection
//!
//! Runs once per request, before the retry loop. The structured-output
//! contract restricts the reply to {crisp, fuzzy, no}; anything else fails
//! closed as a protocol violation because every downstream branch assumes
//! exactly one of the three values.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;

use crate::llm::{extract_json_object, ChatClient, ChatRequest};
use crate::prompts::MODE_SELECTOR_PROMPT;
use crate::types::{ReasoningMode, Turn};

const SELECTOR_TEMPERATURE: f32 = 0.65;

/// The selector replied outside the mode enumeration.
///
/// Carried inside `anyhow::Error` so the pipeline can downcast and surface a
/// `ModeSelectionProtocol` failure instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProtocolViolation {
    pub reply: String,
}

impl fmt::Display for ModeProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode selector returned a value outside crisp/fuzzy/no: {:?}", self.reply)
    }
}

impl std::error::Error for ModeProtocolViolation {}

#[derive(Deserialize)]
struct ModeReply {
    reasoning_mode: String,
}

/// Parse a structured-output reply into a mode, failing closed.
///
/// Accepts the documented JSON shape `{"reasoning_mode": "..."}` and, as a
/// transport-level leniency, a bare enumeration token. The enumeration
/// itself is never widened: an unknown value is a violation, not a default.
fn parse_mode_reply(text: &str) -> Result<ReasoningMode> {
    let violation = || {
        anyhow::Error::new(ModeProtocolViolation { reply: text.trim().to_string() })
    };

    if let Some(json) = extract_json_object(text) {
        let reply: ModeReply = serde_json::from_str(json).map_err(|_| violation())?;
        return ReasoningMode::parse_strict(&reply.reasoning_mode).ok_or_else(violation);
    }

    // Bare token without the JSON wrapper
    let token = text.trim().trim_matches('"');
    ReasoningMode::parse_strict(token).ok_or_else(violation)
}

/// Decide the reasoning mode for a cleaned (context, question) pair
pub fn select_mode(
    client: &dyn ChatClient,
    context: &str,
    question: &str,
    verbose: bool,
) -> Result<ReasoningMode> {
    let turns = vec![
        Turn::system(MODE_SELECTOR_PROMPT),
        Turn::user(format!("Context:\n{}\n\nQuestion:\n{}", context, question)),
    ];

    let request = ChatRequest {
        turns: &turns,
        tools: &[],
        json_only: true,
        temperature: Some(SELECTOR_TEMPERATURE),
    };

    let reply = client.complete(&request)?;
    let content = reply
        .content
        .ok_or_else(|| anyhow!("mode selector returned no text content"))?;

    if verbose {
        eprintln!("DEBUG: Mode selector reply: {}", content);
    }

    parse_mode_reply(&content)
}

// ============================================================================
// Tests
// ============================================================================
