//! Program synthesis: instruction assembly and generation rounds
//!
//! Builds the mode-specific instruction transcript, advertises the matching
//! solver tools, and handles the two non-looping generation shapes: the
//! no-logic direct answer and direct-code reply cleanup.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;

use crate::config::FuzzyProtocol;
use crate::dispatch::{crisp_tool_signature, fuzzy_tool_signature};
use crate::llm::{ChatClient, ChatRequest, ToolSignature};
use crate::prompts::{generator_prompt, NO_LOGIC_PROMPT};
use crate::types::{ReasoningMode, ReasoningRequest, Transcript, Turn};

const GENERATOR_TEMPERATURE: f32 = 0.4;
const NO_LOGIC_TEMPERATURE: f32 = 0.8;

// ============================================================================
// Instruction Assembly
// ============================================================================

/// Build the initial transcript for a reasoning request: the generator
/// instruction for the mode/protocol plus one user turn carrying the task.
pub fn initial_transcript(request: &ReasoningRequest, protocol: FuzzyProtocol) -> Transcript {
    let mut transcript = Transcript::new();
    transcript.push(Turn::system(generator_prompt(request.mode, protocol)));
    transcript.push(Turn::user(format!(
        "Context: {}\nQuestion: {}\nReasoning Mode: {}",
        request.context,
        request.question,
        request.mode.as_str()
    )));
    transcript
}

/// Solver tools advertised for a generation round.
///
/// Only the solver matching the decided mode is offered; under the
/// direct-code protocol (and in no-logic mode) no tools are offered at all.
pub fn tools_for_mode(mode: ReasoningMode, protocol: FuzzyProtocol) -> Vec<ToolSignature> {
    match (mode, protocol) {
        (ReasoningMode::Crisp, _) => vec![crisp_tool_signature()],
        (ReasoningMode::Fuzzy, FuzzyProtocol::ToolCall) => vec![fuzzy_tool_signature()],
        (ReasoningMode::Fuzzy, FuzzyProtocol::DirectCode) => Vec::new(),
        (ReasoningMode::No, _) => Vec::new(),
    }
}

/// Temperature for the generation rounds of a mode
pub fn generation_temperature(mode: ReasoningMode) -> f32 {
    match mode {
        ReasoningMode::No => NO_LOGIC_TEMPERATURE,
        _ => GENERATOR_TEMPERATURE,
    }
}

// ============================================================================
// No-Logic Answers
// ============================================================================

/// Answer a no-logic request: a single round-trip, no tools, no retries
pub fn answer_without_logic(
    client: &dyn ChatClient,
    request: &ReasoningRequest,
) -> Result<String> {
    let turns = vec![
        Turn::system(NO_LOGIC_PROMPT),
        Turn::user(format!(
            "The question is:\n{}\nThe context is:\n{}\nSolve it in textual manner and return the answer.",
            request.question, request.context
        )),
    ];

    let chat = ChatRequest {
        turns: &turns,
        tools: &[],
        json_only: false,
        temperature: Some(NO_LOGIC_TEMPERATURE),
    };

    let reply = client.complete(&chat)?;
    reply
        .content
        .map(|text| text.trim().to_string())
        .ok_or_else(|| anyhow!("no-logic generation returned no text content"))
}

// ============================================================================
// Direct-Code Cleanup
// ============================================================================

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[a-zA-Z0-9_+-]*\r?\n(.*?)```").expect("Invalid regex")
    })
}

/// Strip markdown fences from a direct-code reply.
///
/// The instruction demands code only, but models occasionally wrap the
/// script anyway; the fenced body is recovered rather than failing the
/// attempt on markup.
pub fn extract_code(reply: &str) -> String {
    let trimmed = reply.trim();
    if let Some(caps) = fence_regex().captures(trimmed) {
        return caps[1].trim().to_string();
    }
    trimmed.to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn request(mode: ReasoningMode) -> ReasoningRequest {
        ReasoningRequest {
            context: "Dimitri is a Student. Giorgi is a Student.".to_string(),
            question: "Who is a student?".to_string(),
            mode,
        }
    }

    #[test]
    fn test_initial_transcript_shape() {
        let t = initial_transcript(&request(ReasoningMode::Crisp), FuzzyProtocol::ToolCall);
        assert_eq!(t.len(), 2);
        assert_eq!(t.turns()[0].role, Role::System);
        assert!(t.turns()[0].content.contains("run_crisp_prolog"));
        assert_eq!(t.turns()[1].role, Role::User);
        assert!(t.turns()[1].content.contains("Reasoning Mode: crisp"));
        assert!(t.turns()[1].content.contains("Who is a student?"));
    }

    #[test]
    fn test_fuzzy_transcript_carries_builtins() {
        let t = initial_transcript(&request(ReasoningMode::Fuzzy), FuzzyProtocol::ToolCall);
        assert!(t.turns()[0].content.contains("fuzzy_and"));
        assert!(t.turns()[0].content.contains("run_fuzzy_prolog"));
    }

    #[test]
    fn test_direct_protocol_transcript_has_no_tool_talk() {
        let t = initial_transcript(&request(ReasoningMode::Fuzzy), FuzzyProtocol::DirectCode);
        assert!(t.turns()[0].content.contains("Output ONLY the code"));
    }

    #[test]
    fn test_tools_match_mode_and_protocol() {
        let crisp = tools_for_mode(ReasoningMode::Crisp, FuzzyProtocol::ToolCall);
        assert_eq!(crisp.len(), 1);
        assert_eq!(crisp[0].name, "run_crisp_prolog");

        let fuzzy = tools_for_mode(ReasoningMode::Fuzzy, FuzzyProtocol::ToolCall);
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].name, "run_fuzzy_prolog");

        assert!(tools_for_mode(ReasoningMode::Fuzzy, FuzzyProtocol::DirectCode).is_empty());
        assert!(tools_for_mode(ReasoningMode::No, FuzzyProtocol::ToolCall).is_empty());
    }

    #[test]
    fn test_extract_code_passthrough() {
        let code = "rule: IF (speed IS high) THEN (quality IS high)";
        assert_eq!(extract_code(code), code);
    }

    #[test]
    fn test_extract_code_strips_fences() {
        let reply = "```python\nfs = FuzzySystem()\nfs.inference()\n```";
        assert_eq!(extract_code(reply), "fs = FuzzySystem()\nfs.inference()");

        let bare = "```\nsome code\n```";
        assert_eq!(extract_code(bare), "some code");
    }

    #[test]
    fn test_extract_code_with_prose_around_fence() {
        let reply = "Here is the script:\n```\nline1\nline2\n```\nEnjoy!";
        assert_eq!(extract_code(reply), "line1\nline2");
    }
}
