//! Neuro-symbolic reasoning pipeline core library
//!
//! This crate provides the core functionality for the reasoner:
//! - Reasoning mode selection (crisp / fuzzy / no-logic)
//! - Program synthesis via the generation collaborator
//! - Tool dispatch over the closed solver registry
//! - The bounded generation-verification-retry loop
//! - Result normalization, text rewriting, and summarization

pub mod types;

pub mod config;
pub mod dispatch;
pub mod llm;
pub mod mode;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod rewrite;
pub mod session;
pub mod solvers;
pub mod summary;
pub mod synth;

// Re-export commonly used types at crate root
pub use types::{
    Binding, ExecutionResult, FailureKind, ReasoningMode, ReasoningRequest, ResultEnvelope,
    Role, ToolCall, Transcript, Turn,
};

pub use config::{FuzzyProtocol, Settings};
pub use llm::{ChatClient, ChatReply, ChatRequest, HttpChatClient, ToolSignature};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use session::run_session;
pub use solvers::{HttpSolverBackend, SolverBackend};
