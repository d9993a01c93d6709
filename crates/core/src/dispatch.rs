//! Tool dispatch over a closed executor registry
//!
//! Tool names resolve through a total function: every string maps to either a
//! known executor variant or a definite `Unknown`, never a panic or a probe.
//! Argument validation happens before dispatch; a structurally invalid call
//! is reported as an ordinary execution failure so the retry loop can feed it
//! back to the generator.

use serde_json::Value;

use crate::llm::ToolSignature;
use crate::types::ExecutionResult;

/// Registered tool name for the crisp solver
pub const CRISP_TOOL: &str = "run_crisp_prolog";
/// Registered tool name for the fuzzy solver
pub const FUZZY_TOOL: &str = "run_fuzzy_prolog";

// ============================================================================
// Registry
// ============================================================================

/// The closed set of executors a generated program can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverTool {
    CrispSolver,
    FuzzySolver,
    /// Runs generator-authored scripts; reached only through the direct-code
    /// protocol, never through a tool name
    FuzzyDirectExecutor,
}

/// Outcome of name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Known(SolverTool),
    Unknown(String),
}

/// Total resolution over the registry: unrecognized names yield `Unknown`
pub fn resolve(name: &str) -> Resolution {
    match name {
        CRISP_TOOL => Resolution::Known(SolverTool::CrispSolver),
        FUZZY_TOOL => Resolution::Known(SolverTool::FuzzySolver),
        other => Resolution::Unknown(other.to_string()),
    }
}

// ============================================================================
// Argument Validation
// ============================================================================

/// Validated program + query payload for the solver tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramQuery {
    pub program: String,
    pub query: String,
}

/// Structurally validate solver tool arguments before dispatch.
///
/// Returns the error as an `ExecutionResult::Failure` so the caller treats
/// it exactly like a solver-reported failure.
pub fn validate_program_args(arguments: &Value) -> Result<ProgramQuery, ExecutionResult> {
    let obj = match arguments.as_object() {
        Some(obj) => obj,
        None => {
            return Err(ExecutionResult::failure(
                "tool arguments must be a JSON object with 'program' and 'query' keys",
            ))
        }
    };

    let field = |key: &str| -> Result<String, ExecutionResult> {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => Err(ExecutionResult::failure(format!(
                "tool argument '{}' is empty",
                key
            ))),
            Some(other) => Err(ExecutionResult::failure(format!(
                "tool argument '{}' must be a string, got: {}",
                key, other
            ))),
            None => Err(ExecutionResult::failure(format!(
                "tool call is missing required argument '{}'",
                key
            ))),
        }
    };

    Ok(ProgramQuery { program: field("program")?, query: field("query")? })
}

// ============================================================================
// Advertised Signatures
// ============================================================================

fn program_query_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "program": {
                "type": "string",
                "description": "Complete Prolog program: all facts and rules"
            },
            "query": {
                "type": "string",
                "description": "Single query to execute against the program"
            }
        },
        "required": ["program", "query"]
    })
}

/// Tool signatures advertised to the generation collaborator for a round
pub fn crisp_tool_signature() -> ToolSignature {
    ToolSignature {
        name: CRISP_TOOL.to_string(),
        description: "Execute a crisp Prolog program and query; returns variable bindings"
            .to_string(),
        parameters: program_query_schema(),
    }
}

pub fn fuzzy_tool_signature() -> ToolSignature {
    ToolSignature {
        name: FUZZY_TOOL.to_string(),
        description:
            "Execute a fuzzy Prolog program and query; returns variable bindings with truth degrees"
                .to_string(),
        parameters: program_query_schema(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_tools() {
        assert_eq!(resolve("run_crisp_prolog"), Resolution::Known(SolverTool::CrispSolver));
        assert_eq!(resolve("run_fuzzy_prolog"), Resolution::Known(SolverTool::FuzzySolver));
    }

    #[test]
    fn test_resolve_is_total_over_unknown_names() {
        for name in ["run_quantum_prolog", "", "RUN_CRISP_PROLOG", "crisp"] {
            match resolve(name) {
                Resolution::Unknown(n) => assert_eq!(n, name),
                other => panic!("expected Unknown for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_args() {
        let args = serde_json::json!({
            "program": "student(dimitri).\nstudent(giorgi).",
            "query": "student(X)"
        });
        let pq = validate_program_args(&args).unwrap();
        assert!(pq.program.contains("student(dimitri)"));
        assert_eq!(pq.query, "student(X)");
    }

    #[test]
    fn test_validate_missing_key_is_failure_not_panic() {
        let args = serde_json::json!({ "program": "p." });
        let err = validate_program_args(&args).unwrap_err();
        match err {
            ExecutionResult::Failure { error_message } => {
                assert!(error_message.contains("query"));
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_wrong_shape() {
        // Arguments that failed JSON decoding arrive as a plain string
        let err = validate_program_args(&Value::String("not json".into())).unwrap_err();
        assert!(err.is_failure());

        let err = validate_program_args(&serde_json::json!({
            "program": 42,
            "query": "q(X)"
        }))
        .unwrap_err();
        match err {
            ExecutionResult::Failure { error_message } => {
                assert!(error_message.contains("program"));
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_empty_strings_rejected() {
        let err = validate_program_args(&serde_json::json!({
            "program": "  ",
            "query": "q(X)"
        }))
        .unwrap_err();
        assert!(err.is_failure());
    }

    #[test]
    fn test_signatures_match_registry_names() {
        assert_eq!(crisp_tool_signature().name, CRISP_TOOL);
        assert_eq!(fuzzy_tool_signature().name, FUZZY_TOOL);
        let schema = crisp_tool_signature().parameters;
        assert_eq!(schema["required"][0], "program");
        assert_eq!(schema["required"][1], "query");
    }
}
