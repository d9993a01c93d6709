//! Domain models for the reasoning pipeline
//!
//! This module contains the core types shared across the pipeline:
//! - Reasoning modes and requests
//! - Conversation turns and the append-only transcript
//! - Tool calls, solver bindings, and execution results
//! - The normalized result envelope returned to callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Reasoning Modes
// ============================================================================

/// Reasoning mode chosen once per request, before the retry loop starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    /// Classical true/false inference via the crisp solver
    Crisp,
    /// Graded truth-degree inference via the fuzzy solver
    Fuzzy,
    /// No symbolic inference; the model answers in free text
    No,
}

impl ReasoningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningMode::Crisp => "crisp",
            ReasoningMode::Fuzzy => "fuzzy",
            ReasoningMode::No => "no",
        }
    }

    /// Strict parse over the closed enumeration. Anything else is a protocol
    /// violation and must be handled by the caller, never defaulted.
    pub fn parse_strict(s: &str) -> Option<ReasoningMode> {
        match s.trim() {
            "crisp" => Some(ReasoningMode::Crisp),
            "fuzzy" => Some(ReasoningMode::Fuzzy),
            "no" => Some(ReasoningMode::No),
            _ => None,
        }
    }

    /// Whether this mode delivers its program through a solver tool call
    pub fn requires_tool_call(&self) -> bool {
        !matches!(self, ReasoningMode::No)
    }
}

/// One (context, question) pair with its decided mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub context: String,
    pub question: String,
    pub mode: ReasoningMode,
}

// ============================================================================
// Transcript
// ============================================================================

/// Role of a turn in the generation transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Append-only ordered record of turns, replayed verbatim each round.
///
/// There is deliberately no way to remove or mutate a turn once pushed;
/// transcript length is monotonically non-decreasing for the life of a
/// session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ============================================================================
// Tool Calls and Execution Results
// ============================================================================

/// A tool invocation produced by the generation collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// One solver solution: an ordered variable→value mapping, optionally
/// carrying a truth degree (fuzzy mode only).
///
/// Degrees are passed through unchanged; weighted combinators may
/// legitimately produce values above 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub vars: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
}

impl Binding {
    pub fn new(vars: serde_json::Map<String, Value>) -> Self {
        Self { vars, degree: None }
    }
}

/// Raw executor outcome before normalization.
///
/// An empty binding list is a valid `Success` ("no solution found") and is
/// distinct from `Failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success {
        #[serde(default)]
        bindings: Vec<serde_json::Map<String, Value>>,
        /// Free-text output from the direct script executor
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Failure { error_message: String },
}

impl ExecutionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ExecutionResult::Failure { error_message: message.into() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }
}

// ============================================================================
// Result Envelope
// ============================================================================

/// Terminal failure classes surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Mode selector replied outside {crisp, fuzzy, no}; fatal, never retried
    ModeSelectionProtocol,
    /// Tool name not in the registered executor set; terminal, never retried
    UnknownTool,
    /// Attempt budget consumed without a successful execution
    ExhaustedRetries,
}

/// Normalized pipeline result returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultEnvelope {
    /// Solver bindings, in solver order
    LogicResult {
        mode: ReasoningMode,
        bindings: Vec<Binding>,
    },
    /// Free text: no-logic answers, direct-script output, or the accepted
    /// raw reply when the model skipped the required tool call
    TextAnswer { text: String },
    /// Terminal protocol or retry failure with a human-readable message
    ProtocolFailure { kind: FailureKind, message: String },
}

impl ResultEnvelope {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultEnvelope::ProtocolFailure { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_strict() {
        assert_eq!(ReasoningMode::parse_strict("crisp"), Some(ReasoningMode::Crisp));
        assert_eq!(ReasoningMode::parse_strict(" fuzzy "), Some(ReasoningMode::Fuzzy));
        assert_eq!(ReasoningMode::parse_strict("no"), Some(ReasoningMode::No));
        assert_eq!(ReasoningMode::parse_strict("maybe"), None);
        assert_eq!(ReasoningMode::parse_strict("reasoning_mode=no"), None);
        assert_eq!(ReasoningMode::parse_strict(""), None);
    }

    #[test]
    fn test_mode_serde_rejects_unknown_variant() {
        let ok: Result<ReasoningMode, _> = serde_json::from_str("\"crisp\"");
        assert_eq!(ok.unwrap(), ReasoningMode::Crisp);

        let bad: Result<ReasoningMode, _> = serde_json::from_str("\"probabilistic\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_transcript_is_append_only() {
        let mut t = Transcript::new();
        assert!(t.is_empty());
        t.push(Turn::system("instructions"));
        t.push(Turn::user("question"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.turns()[0].role, Role::System);
        assert_eq!(t.turns()[1].content, "question");
    }

    #[test]
    fn test_requires_tool_call() {
        assert!(ReasoningMode::Crisp.requires_tool_call());
        assert!(ReasoningMode::Fuzzy.requires_tool_call());
        assert!(!ReasoningMode::No.requires_tool_call());
    }

    #[test]
    fn test_empty_success_distinct_from_failure() {
        let empty = ExecutionResult::Success { bindings: vec![], output: None };
        assert!(!empty.is_failure());

        let failed = ExecutionResult::failure("undefined predicate");
        assert!(failed.is_failure());
        assert_ne!(empty, failed);
    }

    #[test]
    fn test_envelope_serialization_tagged() {
        let env = ResultEnvelope::ProtocolFailure {
            kind: FailureKind::UnknownTool,
            message: "run_quantum_prolog".to_string(),
        };
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"type\":\"protocol_failure\""));
        assert!(json.contains("\"kind\":\"unknown_tool\""));

        let recovered: ResultEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, recovered);
    }

    #[test]
    fn test_binding_degree_passthrough_above_one() {
        let mut vars = serde_json::Map::new();
        vars.insert("X".to_string(), Value::String("john".to_string()));
        let b = Binding { vars, degree: Some(1.35) };
        let json = serde_json::to_string(&b).unwrap();
        let recovered: Binding = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.degree, Some(1.35));
    }
}
