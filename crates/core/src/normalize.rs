//! Result normalization
//!
//! Converts heterogeneous executor replies into the single `ResultEnvelope`
//! shape the rest of the system consumes.

use serde_json::Value;

use crate::types::{Binding, ExecutionResult, ReasoningMode, ResultEnvelope};

/// Reserved query variable the fuzzy generator binds the truth degree to
const DEGREE_VARIABLE: &str = "T";

/// Normalize a successful execution into a result envelope.
///
/// Crisp bindings pass through as-is; fuzzy bindings additionally carry the
/// truth degree read from the reserved `T` variable, without clamping:
/// weighted combinations may legitimately exceed 1. Script output becomes an
/// opaque text answer. An empty binding list stays a success ("no solution
/// found") and is never turned into a failure.
pub fn normalize_success(
    mode: ReasoningMode,
    bindings: Vec<serde_json::Map<String, Value>>,
    output: Option<String>,
) -> ResultEnvelope {
    if let Some(text) = output {
        return ResultEnvelope::TextAnswer { text };
    }

    let bindings = bindings
        .into_iter()
        .map(|vars| {
            let degree = match mode {
                ReasoningMode::Fuzzy => vars.get(DEGREE_VARIABLE).and_then(Value::as_f64),
                _ => None,
            };
            Binding { vars, degree }
        })
        .collect();

    ResultEnvelope::LogicResult { mode, bindings }
}

/// Normalize any execution result; failures keep their message verbatim so
/// the retry controller can feed it back or surface it unchanged.
pub fn normalize(mode: ReasoningMode, result: ExecutionResult) -> Result<ResultEnvelope, String> {
    match result {
        ExecutionResult::Success { bindings, output } => {
            Ok(normalize_success(mode, bindings, output))
        }
        ExecutionResult::Failure { error_message } => Err(error_message),
    }
}

// ============================================================================
// Tests
// ============================================================================
