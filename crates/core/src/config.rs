//! Pipeline configuration loaded from reasoner.toml
//!
//! All sections are optional; missing values fall back to defaults so the
//! pipeline runs against a local OpenAI-compatible endpoint out of the box.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default config file path (relative to working directory)
pub const CONFIG_FILE: &str = "reasoner.toml";

// ============================================================================
// Sections
// ============================================================================

/// Generation collaborator settings ([llm] section)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String { "http://localhost:8000/v1".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_temperature() -> f32 { 0.4 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Solver service endpoints ([solvers] section)
#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_crisp_url")]
    pub crisp_url: String,
    #[serde(default = "default_fuzzy_url")]
    pub fuzzy_url: String,
    #[serde(default = "default_script_url")]
    pub script_url: String,
    #[serde(default = "default_solver_timeout")]
    pub timeout_secs: u64,
}

fn default_crisp_url() -> String { "http://localhost:7501/crisp".to_string() }
fn default_fuzzy_url() -> String { "http://localhost:7501/fuzzy".to_string() }
fn default_script_url() -> String { "http://localhost:7502/run".to_string() }
fn default_solver_timeout() -> u64 { 30 }

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            crisp_url: default_crisp_url(),
            fuzzy_url: default_fuzzy_url(),
            script_url: default_script_url(),
            timeout_secs: default_solver_timeout(),
        }
    }
}

/// Which protocol fuzzy mode uses to deliver generated programs.
///
/// The two protocols are mutually exclusive and fixed by configuration;
/// nothing infers the protocol at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyProtocol {
    /// Program + query delivered through the fuzzy solver tool
    ToolCall,
    /// Complete executable script sent to the direct script runner
    DirectCode,
}

impl Default for FuzzyProtocol {
    fn default() -> Self {
        FuzzyProtocol::ToolCall
    }
}

/// Retry loop and pipeline-stage settings ([pipeline] section)
#[derive(Debug, Clone, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub fuzzy_protocol: FuzzyProtocol,
    /// Run the text rewriting step before mode selection
    #[serde(default = "default_rewrite")]
    pub rewrite: bool,
    /// Run the natural-language summarizer after the loop
    #[serde(default = "default_summarize")]
    pub summarize: bool,
}

fn default_max_attempts() -> u32 { 3 }
fn default_rewrite() -> bool { true }
fn default_summarize() -> bool { true }

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            fuzzy_protocol: FuzzyProtocol::default(),
            rewrite: default_rewrite(),
            summarize: default_summarize(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration (reasoner.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub solvers: SolverConfig,
    #[serde(default)]
    pub pipeline: LoopConfig,
}

impl Settings {
    /// Load settings from an explicit path, or from `reasoner.toml` in the
    /// working directory. A missing default file yields built-in defaults;
    /// a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Settings> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}

// ============================================================================
// Tests
// ============================================================================
