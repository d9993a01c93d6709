//! Execution adapters for the external solver services
//!
//! The crisp solver, fuzzy solver, and direct script runner are opaque remote
//! executors. Every method here is total: transport faults, timeouts, and
//! malformed replies are captured and converted to the shared
//! `ExecutionResult::Failure` shape, never propagated as uncaught faults.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::SolverConfig;
use crate::types::ExecutionResult;

// ============================================================================
// Backend Contract
// ============================================================================

/// Injected executor set.
///
/// An empty binding list is a successful "no solution found", not an error;
/// implementations must preserve that distinction.
pub trait SolverBackend {
    fn run_crisp(&self, program: &str, query: &str) -> ExecutionResult;
    fn run_fuzzy(&self, program: &str, query: &str) -> ExecutionResult;
    fn run_fuzzy_script(&self, code: &str) -> ExecutionResult;
}

// ============================================================================
// Wire Format
// ============================================================================

/// Reply shape shared by the crisp and fuzzy solver services
#[derive(Deserialize, Debug)]
struct SolverReply {
    #[serde(default)]
    bindings: Option<Vec<serde_json::Map<String, Value>>>,
    /// Error marker; presence means the execution failed
    #[serde(default)]
    error: Option<String>,
    /// Human-readable failure description
    #[serde(default)]
    message: Option<String>,
}

/// Reply shape of the direct script runner
#[derive(Deserialize, Debug)]
struct ScriptReply {
    success: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn solver_reply_to_result(reply: SolverReply) -> ExecutionResult {
    if reply.error.is_some() || reply.message.is_some() {
        let message = reply
            .message
            .or(reply.error)
            .unwrap_or_else(|| "solver reported an unspecified error".to_string());
        return ExecutionResult::failure(message);
    }

    ExecutionResult::Success {
        bindings: reply.bindings.unwrap_or_default(),
        output: None,
    }
}

fn script_reply_to_result(reply: ScriptReply) -> ExecutionResult {
    if reply.success {
        ExecutionResult::Success {
            bindings: Vec::new(),
            output: reply.result,
        }
    } else {
        ExecutionResult::failure(
            reply
                .error
                .unwrap_or_else(|| "script runner reported an unspecified error".to_string()),
        )
    }
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Blocking HTTP clients for the solver services
pub struct HttpSolverBackend {
    client: Client,
    config: SolverConfig,
    verbose: bool,
}

impl HttpSolverBackend {
    pub fn new(config: SolverConfig, verbose: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config, verbose })
    }

    fn post(&self, url: &str, body: Value) -> Result<String> {
        if self.verbose {
            eprintln!("DEBUG: Dispatching to solver at {}", url);
        }

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .with_context(|| format!("solver request to {} failed", url))?;

        let status = response.status();
        let text = response.text().context("failed to read solver response")?;

        if !status.is_success() {
            anyhow::bail!("solver error {}: {}", status, text);
        }

        Ok(text)
    }

    fn run_program(&self, url: &str, program: &str, query: &str) -> ExecutionResult {
        let body = serde_json::json!({ "program": program, "query": query });

        let text = match self.post(url, body) {
            Ok(text) => text,
            // Transport faults and timeouts consume a retry attempt like any
            // other execution failure.
            Err(e) => return ExecutionResult::failure(format!("{:#}", e)),
        };

        match serde_json::from_str::<SolverReply>(&text) {
            Ok(reply) => solver_reply_to_result(reply),
            Err(e) => ExecutionResult::failure(format!("malformed solver reply: {}", e)),
        }
    }
}

impl SolverBackend for HttpSolverBackend {
    fn run_crisp(&self, program: &str, query: &str) -> ExecutionResult {
        self.run_program(&self.config.crisp_url, program, query)
    }

    fn run_fuzzy(&self, program: &str, query: &str) -> ExecutionResult {
        self.run_program(&self.config.fuzzy_url, program, query)
    }

    fn run_fuzzy_script(&self, code: &str) -> ExecutionResult {
        let body = serde_json::json!({ "code": code });

        let text = match self.post(&self.config.script_url, body) {
            Ok(text) => text,
            Err(e) => return ExecutionResult::failure(format!("{:#}", e)),
        };

        match serde_json::from_str::<ScriptReply>(&text) {
            Ok(reply) => script_reply_to_result(reply),
            Err(e) => ExecutionResult::failure(format!("malformed script runner reply: {}", e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_reply_success_with_bindings() {
        let reply: SolverReply = serde_json::from_str(
            r#"{"bindings": [{"X": "dimitri"}, {"X": "giorgi"}]}"#,
        )
        .unwrap();
        match solver_reply_to_result(reply) {
            ExecutionResult::Success { bindings, output } => {
                assert_eq!(bindings.len(), 2);
                assert_eq!(bindings[0]["X"], "dimitri");
                assert!(output.is_none());
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn test_solver_reply_empty_bindings_is_success() {
        let reply: SolverReply = serde_json::from_str(r#"{"bindings": []}"#).unwrap();
        let result = solver_reply_to_result(reply);
        assert_eq!(
            result,
            ExecutionResult::Success { bindings: vec![], output: None }
        );
        assert!(!result.is_failure());
    }

    #[test]
    fn test_solver_reply_error_marker_wins() {
        let reply: SolverReply = serde_json::from_str(
            r#"{"error": "execution_error", "message": "predicate good/1 undefined"}"#,
        )
        .unwrap();
        match solver_reply_to_result(reply) {
            ExecutionResult::Failure { error_message } => {
                assert_eq!(error_message, "predicate good/1 undefined");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_solver_reply_error_without_message() {
        let reply: SolverReply =
            serde_json::from_str(r#"{"error": "syntax error near ':-'"}"#).unwrap();
        match solver_reply_to_result(reply) {
            ExecutionResult::Failure { error_message } => {
                assert_eq!(error_message, "syntax error near ':-'");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_script_reply_success_carries_output() {
        let reply: ScriptReply =
            serde_json::from_str(r#"{"success": true, "result": "quality: 0.72"}"#).unwrap();
        match script_reply_to_result(reply) {
            ExecutionResult::Success { output, bindings } => {
                assert_eq!(output.as_deref(), Some("quality: 0.72"));
                assert!(bindings.is_empty());
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn test_script_reply_failure() {
        let reply: ScriptReply = serde_json::from_str(
            r#"{"success": false, "error": "undefined variable: speed"}"#,
        )
        .unwrap();
        match script_reply_to_result(reply) {
            ExecutionResult::Failure { error_message } => {
                assert_eq!(error_message, "undefined variable: speed");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }
}
