//! Text rewriting step
//!
//! Cleans raw user text into precise natural language before mode selection.
//! One round-trip per text; the rewriter never answers the question and never
//! introduces logic syntax.

use anyhow::{anyhow, Result};

use crate::llm::{ChatClient, ChatRequest};
use crate::prompts::REWRITER_PROMPT;
use crate::types::Turn;

const REWRITER_TEMPERATURE: f32 = 0.3;

/// Rewrite arbitrary user text into clearer, more precise natural language
pub fn rewrite_text(client: &dyn ChatClient, text: &str) -> Result<String> {
    let turns = vec![Turn::system(REWRITER_PROMPT), Turn::user(text)];

    let request = ChatRequest {
        turns: &turns,
        tools: &[],
        json_only: false,
        temperature: Some(REWRITER_TEMPERATURE),
    };

    let reply = client.complete(&request)?;
    reply
        .content
        .map(|t| t.trim().to_string())
        .ok_or_else(|| anyhow!("rewriter returned no text content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatReply;

    struct EchoUpper;

    impl ChatClient for EchoUpper {
        fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
            // The rewriter sends exactly system + user
            assert_eq!(request.turns.len(), 2);
            assert!(request.tools.is_empty());
            Ok(ChatReply {
                content: Some(format!("  {}  ", request.turns[1].content.to_uppercase())),
                tool_call: None,
            })
        }
    }

    #[test]
    fn test_rewrite_trims_reply() {
        let out = rewrite_text(&EchoUpper, "john is tall").unwrap();
        assert_eq!(out, "JOHN IS TALL");
    }

    struct NoContent;

    impl ChatClient for NoContent {
        fn complete(&self, _request: &ChatRequest) -> Result<ChatReply> {
            Ok(ChatReply::default())
        }
    }

    #[test]
    fn test_rewrite_empty_reply_is_error() {
        assert!(rewrite_text(&NoContent, "text").is_err());
    }
}
