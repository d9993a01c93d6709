//! Full request path: rewrite → mode selection → retry loop → summary
//!
//! The pipeline owns no remote state; both collaborators are injected so the
//! whole path runs against scripted fakes in tests.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Settings;
use crate::llm::ChatClient;
use crate::mode::{select_mode, ModeProtocolViolation};
use crate::rewrite::rewrite_text;
use crate::session::run_session;
use crate::solvers::SolverBackend;
use crate::summary::summarize;
use crate::types::{FailureKind, ReasoningMode, ReasoningRequest, ResultEnvelope};

/// Outcome of one full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub mode: Option<ReasoningMode>,
    pub clean_context: String,
    pub clean_question: String,
    pub envelope: ResultEnvelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Drives one request through every stage
pub struct Pipeline<'a> {
    client: &'a dyn ChatClient,
    solvers: &'a dyn SolverBackend,
    settings: &'a Settings,
    verbose: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        client: &'a dyn ChatClient,
        solvers: &'a dyn SolverBackend,
        settings: &'a Settings,
        verbose: bool,
    ) -> Self {
        Self { client, solvers, settings, verbose }
    }

    /// Run the full pipeline for one (context, question) pair.
    ///
    /// `forced_mode` bypasses the selector (CLI override); otherwise the
    /// selector runs once, before the loop. A selector reply outside the
    /// mode enumeration terminates with a `ModeSelectionProtocol` failure,
    /// since in-context repair cannot fix a contract violation.
    pub fn run(
        &self,
        raw_context: &str,
        raw_question: &str,
        forced_mode: Option<ReasoningMode>,
    ) -> Result<PipelineOutcome> {
        let (clean_context, clean_question) = if self.settings.pipeline.rewrite {
            let context = rewrite_text(self.client, raw_context)
                .context("context rewriting failed")?;
            let question = rewrite_text(self.client, raw_question)
                .context("question rewriting failed")?;
            (context, question)
        } else {
            (raw_context.to_string(), raw_question.to_string())
        };

        let mode = match forced_mode {
            Some(mode) => mode,
            None => {
                match select_mode(self.client, &clean_context, &clean_question, self.verbose) {
                    Ok(mode) => mode,
                    Err(e) => {
                        if let Some(violation) = e.downcast_ref::<ModeProtocolViolation>() {
                            // Fatal, never retried, never defaulted
                            return Ok(PipelineOutcome {
                                mode: None,
                                clean_context,
                                clean_question,
                                envelope: ResultEnvelope::ProtocolFailure {
                                    kind: FailureKind::ModeSelectionProtocol,
                                    message: violation.to_string(),
                                },
                                summary: None,
                            });
                        }
                        return Err(e.context("mode selection failed"));
                    }
                }
            }
        };

        if self.verbose {
            eprintln!("DEBUG: Reasoning mode: {}", mode.as_str());
        }

        let request = ReasoningRequest {
            context: clean_context.clone(),
            question: clean_question.clone(),
            mode,
        };

        let envelope = run_session(
            self.client,
            self.solvers,
            &request,
            &self.settings.pipeline,
            self.verbose,
        )?;

        let summary = if self.settings.pipeline.summarize {
            summarize(self.client, &request, &envelope)
                .context("summarization failed")?
        } else {
            None
        };

        Ok(PipelineOutcome {
            mode: Some(mode),
            clean_context,
            clean_question,
            envelope,
            summary,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatReply, ChatRequest};
    use crate::types::{ExecutionResult, ToolCall};
    use std::cell::RefCell;

    /// Scripted collaborator returning canned replies in order
    struct FakeChat {
        replies: RefCell<Vec<ChatReply>>,
    }

    impl FakeChat {
        fn new(replies: Vec<ChatReply>) -> Self {
            Self { replies: RefCell::new(replies) }
        }

        fn text(text: &str) -> ChatReply {
            ChatReply { content: Some(text.to_string()), tool_call: None }
        }

        fn tool(name: &str) -> ChatReply {
            ChatReply {
                content: None,
                tool_call: Some(ToolCall {
                    name: name.to_string(),
                    arguments: serde_json::json!({
                        "program": "student(dimitri).\nstudent(giorgi).",
                        "query": "student(X)"
                    }),
                }),
            }
        }
    }

    impl ChatClient for FakeChat {
        fn complete(&self, _request: &ChatRequest) -> anyhow::Result<ChatReply> {
            let mut replies = self.replies.borrow_mut();
            anyhow::ensure!(!replies.is_empty(), "fake chat ran out of replies");
            Ok(replies.remove(0))
        }
    }

    struct FakeSolvers;

    impl SolverBackend for FakeSolvers {
        fn run_crisp(&self, _program: &str, _query: &str) -> ExecutionResult {
            let mut binding = serde_json::Map::new();
            binding.insert("X".to_string(), serde_json::json!("dimitri"));
            ExecutionResult::Success { bindings: vec![binding], output: None }
        }

        fn run_fuzzy(&self, _program: &str, _query: &str) -> ExecutionResult {
            ExecutionResult::failure("unexpected fuzzy call")
        }

        fn run_fuzzy_script(&self, _code: &str) -> ExecutionResult {
            ExecutionResult::failure("unexpected script call")
        }
    }

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_full_run_with_rewrite_and_summary() {
        // rewrite context, rewrite question, select mode, generate, summarize
        let client = FakeChat::new(vec![
            FakeChat::text("Dimitri is a Student. Giorgi is a Student."),
            FakeChat::text("Who is a student?"),
            FakeChat::text(r#"{"reasoning_mode": "crisp"}"#),
            FakeChat::tool("run_crisp_prolog"),
            FakeChat::text("Dimitri is a student."),
        ]);

        let cfg = settings();
        let pipeline = Pipeline::new(&client, &FakeSolvers, &cfg, false);
        let outcome = pipeline
            .run("dimitri n giorgi r students", "who's a student??", None)
            .unwrap();

        assert_eq!(outcome.mode, Some(ReasoningMode::Crisp));
        assert_eq!(outcome.clean_question, "Who is a student?");
        assert!(matches!(outcome.envelope, ResultEnvelope::LogicResult { .. }));
        assert_eq!(outcome.summary.as_deref(), Some("Dimitri is a student."));
    }

    #[test]
    fn test_forced_mode_skips_selector() {
        let mut cfg = settings();
        cfg.pipeline.rewrite = false;
        cfg.pipeline.summarize = false;

        // Only the generation round is consumed
        let client = FakeChat::new(vec![FakeChat::tool("run_crisp_prolog")]);

        let pipeline = Pipeline::new(&client, &FakeSolvers, &cfg, false);
        let outcome = pipeline
            .run("ctx", "question", Some(ReasoningMode::Crisp))
            .unwrap();

        assert_eq!(outcome.mode, Some(ReasoningMode::Crisp));
        assert_eq!(outcome.clean_context, "ctx");
        assert!(client.replies.borrow().is_empty());
    }

    #[test]
    fn test_mode_protocol_violation_fails_closed() {
        let mut cfg = settings();
        cfg.pipeline.rewrite = false;

        let client = FakeChat::new(vec![
            FakeChat::text(r#"{"reasoning_mode": "quantum"}"#),
            // Must never be consumed
            FakeChat::tool("run_crisp_prolog"),
        ]);

        let pipeline = Pipeline::new(&client, &FakeSolvers, &cfg, false);
        let outcome = pipeline.run("ctx", "question", None).unwrap();

        assert_eq!(outcome.mode, None);
        match outcome.envelope {
            ResultEnvelope::ProtocolFailure { kind, message } => {
                assert_eq!(kind, FailureKind::ModeSelectionProtocol);
                assert!(message.contains("quantum"));
            }
            other => panic!("expected ProtocolFailure, got {:?}", other),
        }
        assert!(outcome.summary.is_none());
        // The generation reply was not consumed
        assert_eq!(client.replies.borrow().len(), 1);
    }

    #[test]
    fn test_no_mode_passthrough() {
        let mut cfg = settings();
        cfg.pipeline.rewrite = false;
        cfg.pipeline.summarize = false;

        let client = FakeChat::new(vec![
            FakeChat::text(r#"{"reasoning_mode": "no"}"#),
            FakeChat::text("The answer is 42."),
        ]);

        let pipeline = Pipeline::new(&client, &FakeSolvers, &cfg, false);
        let outcome = pipeline.run("numbers", "sum?", None).unwrap();

        assert_eq!(outcome.mode, Some(ReasoningMode::No));
        assert_eq!(
            outcome.envelope,
            ResultEnvelope::TextAnswer { text: "The answer is 42.".to_string() }
        );
    }
}
