//! Retry controller: the generation-verification-retry state machine
//!
//! One session per request. Each attempt submits the full transcript, routes
//! the reply through the dispatcher to a solver, and either terminates on
//! success or appends the solver's literal error as in-context feedback and
//! re-enters generation. The attempt budget bounds the loop; unknown tool
//! names and mode-protocol violations terminate immediately and are never
//! retried.

use anyhow::Result;

use crate::config::{FuzzyProtocol, LoopConfig};
use crate::dispatch::{resolve, validate_program_args, Resolution, SolverTool};
use crate::llm::{ChatClient, ChatReply, ChatRequest};
use crate::normalize::normalize_success;
use crate::prompts::REPAIR_CHECKLIST;
use crate::solvers::SolverBackend;
use crate::synth::{
    answer_without_logic, extract_code, generation_temperature, initial_transcript,
    tools_for_mode,
};
use crate::types::{
    ExecutionResult, FailureKind, ReasoningMode, ReasoningRequest, ResultEnvelope, ToolCall,
    Transcript, Turn,
};

// ============================================================================
// Session State
// ============================================================================

/// Loop bookkeeping for one request.
///
/// Invariants: `current_attempt` stays within `[1, max_attempts]`, the
/// transcript only grows, and the terminal envelope is set exactly once.
#[derive(Debug)]
pub struct RetrySession {
    transcript: Transcript,
    current_attempt: u32,
    max_attempts: u32,
    terminal: Option<ResultEnvelope>,
}

/// Decision after a rejected attempt
#[derive(Debug, PartialEq)]
pub enum LoopDecision {
    /// Feedback appended; re-enter generation
    Retry,
    /// Budget exhausted; the envelope carries the last error verbatim
    Exhausted(ResultEnvelope),
}

impl RetrySession {
    pub fn new(transcript: Transcript, max_attempts: u32) -> Self {
        Self {
            transcript,
            current_attempt: 1,
            max_attempts: max_attempts.max(1),
            terminal: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Terminal envelope, once the session has produced one
    pub fn terminal_result(&self) -> Option<&ResultEnvelope> {
        self.terminal.as_ref()
    }

    /// Record a rejected attempt.
    ///
    /// Appends the assistant's prior raw output verbatim (empty string if it
    /// produced none) and a user turn carrying the literal error plus the
    /// fixed repair checklist, then advances the attempt counter. Once the
    /// budget is spent the session terminates with the last error unchanged.
    pub fn reject(&mut self, raw_output: &str, error: &str) -> LoopDecision {
        if self.current_attempt >= self.max_attempts {
            let envelope = ResultEnvelope::ProtocolFailure {
                kind: FailureKind::ExhaustedRetries,
                message: error.to_string(),
            };
            self.finish(envelope.clone());
            return LoopDecision::Exhausted(envelope);
        }

        self.transcript.push(Turn::assistant(raw_output));
        self.transcript.push(Turn::user(feedback_message(error)));
        self.current_attempt += 1;
        LoopDecision::Retry
    }

    fn finish(&mut self, envelope: ResultEnvelope) {
        debug_assert!(self.terminal.is_none(), "terminal result set twice");
        self.terminal = Some(envelope);
    }
}

/// Feedback user turn: the literal solver error plus the repair checklist
fn feedback_message(error: &str) -> String {
    format!(
        "The generated program failed at runtime.\n\nError:\n{}\n\n{}",
        error, REPAIR_CHECKLIST
    )
}

// ============================================================================
// Attempt Planning (GENERATING → DISPATCHED)
// ============================================================================

/// What to do with a generation reply, decided before any executor runs
#[derive(Debug)]
enum AttemptPlan {
    /// No tool call where one was required: accept the raw text as the final
    /// answer (documented fallback laxity), or a direct-code script reply
    AcceptText(String),
    /// Resolved tool call, ready for validation and dispatch
    Dispatch { tool: SolverTool, call: ToolCall },
    /// Direct-code protocol reply, cleaned of markup
    RunScript(String),
    /// Unresolvable tool name; terminal, never retried
    UnknownTool(String),
}

fn plan_attempt(protocol_is_direct: bool, reply: &ChatReply) -> AttemptPlan {
    if protocol_is_direct {
        let code = extract_code(reply.content.as_deref().unwrap_or(""));
        return AttemptPlan::RunScript(code);
    }

    match &reply.tool_call {
        None => AttemptPlan::AcceptText(reply.content.clone().unwrap_or_default()),
        Some(call) => match resolve(&call.name) {
            Resolution::Known(tool) => AttemptPlan::Dispatch { tool, call: call.clone() },
            Resolution::Unknown(name) => AttemptPlan::UnknownTool(name),
        },
    }
}

// ============================================================================
// Session Driver
// ============================================================================

/// Run one reasoning request to a terminal envelope.
///
/// No-logic requests short-circuit to a single generation round; everything
/// else enters the bounded retry loop.
pub fn run_session(
    client: &dyn ChatClient,
    solvers: &dyn SolverBackend,
    request: &ReasoningRequest,
    config: &LoopConfig,
    verbose: bool,
) -> Result<ResultEnvelope> {
    if request.mode == ReasoningMode::No {
        let text = answer_without_logic(client, request)?;
        return Ok(ResultEnvelope::TextAnswer { text });
    }

    let protocol_is_direct = request.mode == ReasoningMode::Fuzzy
        && config.fuzzy_protocol == FuzzyProtocol::DirectCode;

    let tools = tools_for_mode(request.mode, config.fuzzy_protocol);
    let temperature = generation_temperature(request.mode);
    let mut session = RetrySession::new(
        initial_transcript(request, config.fuzzy_protocol),
        config.max_attempts,
    );

    loop {
        if verbose {
            eprintln!(
                "DEBUG: Logic generation attempt {} of {}",
                session.current_attempt(),
                config.max_attempts
            );
        }

        // GENERATING: replay the full transcript every round
        let chat = ChatRequest {
            turns: session.transcript().turns(),
            tools: &tools,
            json_only: false,
            temperature: Some(temperature),
        };

        let reply = match client.complete(&chat) {
            Ok(reply) => reply,
            // A generation timeout or transport fault consumes one attempt,
            // exactly like an execution failure
            Err(e) => {
                match session.reject("", &format!("{:#}", e)) {
                    LoopDecision::Retry => continue,
                    LoopDecision::Exhausted(envelope) => return Ok(envelope),
                }
            }
        };

        let raw_output = reply.content.clone().unwrap_or_default();

        // DISPATCHED: classify the reply and resolve the executor
        let result = match plan_attempt(protocol_is_direct, &reply) {
            AttemptPlan::AcceptText(text) => {
                if verbose {
                    eprintln!("DEBUG: No tool call produced; accepting raw text answer");
                }
                return Ok(ResultEnvelope::TextAnswer { text });
            }
            AttemptPlan::UnknownTool(name) => {
                return Ok(ResultEnvelope::ProtocolFailure {
                    kind: FailureKind::UnknownTool,
                    message: format!("unknown tool: {}", name),
                });
            }
            // EXECUTING
            AttemptPlan::Dispatch { tool, call } => {
                if verbose {
                    eprintln!("DEBUG: Calling tool '{}' with args: {}", call.name, call.arguments);
                }
                match validate_program_args(&call.arguments) {
                    Ok(pq) => match tool {
                        SolverTool::CrispSolver => solvers.run_crisp(&pq.program, &pq.query),
                        SolverTool::FuzzySolver => solvers.run_fuzzy(&pq.program, &pq.query),
                        // Not reachable via a tool name; the registry only
                        // maps names to the two solver tools
                        SolverTool::FuzzyDirectExecutor => {
                            solvers.run_fuzzy_script(&pq.program)
                        }
                    },
                    // Structurally invalid call: identical to an execution
                    // failure, fed back into the loop
                    Err(invalid) => invalid,
                }
            }
            AttemptPlan::RunScript(code) => {
                if code.is_empty() {
                    ExecutionResult::failure("generation returned no executable code")
                } else {
                    solvers.run_fuzzy_script(&code)
                }
            }
        };

        // ACCEPTED | REJECTED
        match result {
            ExecutionResult::Success { bindings, output } => {
                if verbose {
                    eprintln!("DEBUG: Execution successful");
                }
                return Ok(normalize_success(request.mode, bindings, output));
            }
            ExecutionResult::Failure { error_message } => {
                if verbose {
                    eprintln!("DEBUG: Execution failed: {}", error_message);
                }
                match session.reject(&raw_output, &error_message) {
                    LoopDecision::Retry => continue,
                    LoopDecision::Exhausted(envelope) => return Ok(envelope),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
