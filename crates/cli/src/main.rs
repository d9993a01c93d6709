//! Neuro-symbolic reasoning pipeline CLI
//!
//! A thin wrapper around reasoner-core: one-shot (context, question) runs and
//! batch evaluation over a JSON case file.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use reasoner_core::{HttpChatClient, HttpSolverBackend, Pipeline, ReasoningMode, Settings};

mod eval;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "reasoner")]
#[command(about = "Convert a (context, question) pair into a verified symbolic-reasoning result")]
struct Args {
    /// Context describing the facts, in natural language
    #[arg(long)]
    context: Option<String>,

    /// Question in natural language
    #[arg(long)]
    question: Option<String>,

    /// Force the reasoning mode instead of asking the selector
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Path to the configuration file (defaults to ./reasoner.toml)
    #[arg(long = "config")]
    config_path: Option<PathBuf>,

    /// Run batch evaluation over a JSON case file instead of a single query
    #[arg(long = "eval")]
    eval_path: Option<PathBuf>,

    /// Skip the text rewriting step
    #[arg(long = "no-rewrite")]
    no_rewrite: bool,

    /// Skip the natural-language summary
    #[arg(long = "no-summary")]
    no_summary: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum ModeArg {
    Crisp,
    Fuzzy,
    No,
}

impl From<ModeArg> for ReasoningMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Crisp => ReasoningMode::Crisp,
            ModeArg::Fuzzy => ReasoningMode::Fuzzy,
            ModeArg::No => ReasoningMode::No,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut settings = Settings::load(args.config_path.as_deref())?;
    if args.no_rewrite {
        settings.pipeline.rewrite = false;
    }
    if args.no_summary {
        settings.pipeline.summarize = false;
    }

    if args.verbose {
        eprintln!("DEBUG: LLM endpoint: {}", settings.llm.base_url);
        eprintln!(
            "DEBUG: max_attempts={} fuzzy_protocol={:?}",
            settings.pipeline.max_attempts, settings.pipeline.fuzzy_protocol
        );
    }

    let client = HttpChatClient::new(settings.llm.clone(), args.verbose)?;
    let solvers = HttpSolverBackend::new(settings.solvers.clone(), args.verbose)?;

    // Batch evaluation mode
    if let Some(ref eval_path) = args.eval_path {
        let report = eval::evaluate_file(eval_path, &client, &solvers, &settings, args.verbose)?;
        eval::print_report(&report);

        let out_path = eval::report_path(eval_path);
        std::fs::write(&out_path, serde_json::to_string_pretty(&report)?)?;
        println!("\nResults saved to: {}", out_path.display());
        return Ok(());
    }

    // One-shot mode
    let (context, question) = match (args.context, args.question) {
        (Some(c), Some(q)) => (c, q),
        _ => bail!("provide --context and --question, or --eval <file>"),
    };

    let pipeline = Pipeline::new(&client, &solvers, &settings, args.verbose);
    let outcome = pipeline.run(&context, &question, args.mode.map(Into::into))?;

    if let Some(mode) = outcome.mode {
        println!("Reasoning mode: {}", mode.as_str());
    }
    println!("\nResult:");
    println!("{}", serde_json::to_string_pretty(&outcome.envelope)?);

    if let Some(ref summary) = outcome.summary {
        println!("\nSummary:");
        println!("{}", summary);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_arg_conversion() {
        assert_eq!(ReasoningMode::from(ModeArg::Crisp), ReasoningMode::Crisp);
        assert_eq!(ReasoningMode::from(ModeArg::Fuzzy), ReasoningMode::Fuzzy);
        assert_eq!(ReasoningMode::from(ModeArg::No), ReasoningMode::No);
    }

    #[test]
    fn test_args_parse_one_shot() {
        let args = Args::parse_from([
            "reasoner",
            "--context",
            "Dimitri is a Student.",
            "--question",
            "Who is a student?",
            "--mode",
            "crisp",
            "-v",
        ]);
        assert_eq!(args.context.as_deref(), Some("Dimitri is a Student."));
        assert!(matches!(args.mode, Some(ModeArg::Crisp)));
        assert!(args.verbose);
        assert!(args.eval_path.is_none());
    }

    #[test]
    fn test_args_parse_eval() {
        let args = Args::parse_from(["reasoner", "--eval", "cases.json", "--no-rewrite"]);
        assert_eq!(args.eval_path, Some(PathBuf::from("cases.json")));
        assert!(args.no_rewrite);
    }
}
