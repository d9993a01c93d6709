//! Batch evaluation over file-sourced test cases
//!
//! Loads a JSON array of (context, question, expected-answer) cases, runs the
//! full pipeline on each, scores the generated summary with the judge prompt,
//! and produces an aggregate accuracy report.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use reasoner_core::llm::extract_json_object;
use reasoner_core::prompts::JUDGE_PROMPT;
use reasoner_core::{
    ChatClient, ChatRequest, Pipeline, Settings, SolverBackend, Turn,
};

const JUDGE_TEMPERATURE: f32 = 0.9;

// ============================================================================
// Case and Report Shapes
// ============================================================================

/// One test case from the input file
#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
    pub id: String,
    pub raw_context: String,
    pub raw_question: String,
    /// Expected answer the judge compares against
    pub answer: String,
}

/// Per-case outcome
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub generated_summary: Option<String>,
    pub expected_answer: String,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counters
#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub accuracy: f64,
    pub generated_at: String,
}

/// Full report written next to the input file
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub summary: EvalSummary,
    pub results: Vec<CaseResult>,
}

// ============================================================================
// Judging
// ============================================================================

#[derive(Deserialize)]
struct JudgeReply {
    score: u8,
}

/// Score a generated summary against the expected answer: 1 pass, 0 fail
fn judge(client: &dyn ChatClient, summary: &str, expected: &str) -> Result<u8> {
    let turns = vec![
        Turn::system(JUDGE_PROMPT),
        Turn::user(format!(
            "Generated Summary:\n{}\n\nExpected Answer:\n{}",
            summary, expected
        )),
    ];

    let request = ChatRequest {
        turns: &turns,
        tools: &[],
        json_only: true,
        temperature: Some(JUDGE_TEMPERATURE),
    };

    let reply = client.complete(&request)?;
    let content = reply
        .content
        .ok_or_else(|| anyhow!("judge returned no text content"))?;

    let json = extract_json_object(&content)
        .ok_or_else(|| anyhow!("judge reply is not JSON: {}", content))?;
    let parsed: JudgeReply =
        serde_json::from_str(json).with_context(|| format!("malformed judge reply: {}", content))?;

    if parsed.score > 1 {
        bail!("judge score outside 0/1: {}", parsed.score);
    }
    Ok(parsed.score)
}

// ============================================================================
// Evaluation Loop
// ============================================================================

/// Run every case through the pipeline and score it.
///
/// A case that errors out scores 0 and records the error instead of aborting
/// the batch.
pub fn evaluate_cases(
    cases: Vec<EvalCase>,
    client: &dyn ChatClient,
    solvers: &dyn SolverBackend,
    settings: &Settings,
    verbose: bool,
) -> EvalReport {
    // The judge needs prose to compare, so summarization stays on for eval
    let mut settings = settings.clone();
    settings.pipeline.summarize = true;

    let pipeline = Pipeline::new(client, solvers, &settings, verbose);
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        println!("Processing case: {}", case.id);

        let result = run_case(&pipeline, client, &case);
        match &result {
            Ok((summary, score)) => {
                println!("  score: {} ({})", score, if *score == 1 { "PASS" } else { "FAIL" });
                results.push(CaseResult {
                    id: case.id,
                    generated_summary: Some(summary.clone()),
                    expected_answer: case.answer,
                    score: *score,
                    error: None,
                });
            }
            Err(e) => {
                eprintln!("WARNING: Case {} failed: {:#}", case.id, e);
                results.push(CaseResult {
                    id: case.id,
                    generated_summary: None,
                    expected_answer: case.answer,
                    score: 0,
                    error: Some(format!("{:#}", e)),
                });
            }
        }
    }

    let total = results.len();
    let passed = results.iter().filter(|r| r.score == 1).count();
    let failed = total - passed;
    let accuracy = if total > 0 {
        passed as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    EvalReport {
        summary: EvalSummary {
            total,
            passed,
            failed,
            accuracy,
            generated_at: chrono::Local::now().to_rfc3339(),
        },
        results,
    }
}

fn run_case(
    pipeline: &Pipeline<'_>,
    client: &dyn ChatClient,
    case: &EvalCase,
) -> Result<(String, u8)> {
    let outcome = pipeline.run(&case.raw_context, &case.raw_question, None)?;

    let summary = match outcome.summary {
        Some(summary) => summary,
        // Protocol failures produce no summary; the case fails with the
        // terminal message on record
        None => bail!("pipeline terminated without a summary: {:?}", outcome.envelope),
    };

    let score = judge(client, &summary, &case.answer)?;
    Ok((summary, score))
}

/// Load cases and evaluate the whole file
pub fn evaluate_file(
    path: &Path,
    client: &dyn ChatClient,
    solvers: &dyn SolverBackend,
    settings: &Settings,
    verbose: bool,
) -> Result<EvalReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read case file: {}", path.display()))?;
    let cases: Vec<EvalCase> =
        serde_json::from_str(&content).context("Failed to parse case file JSON")?;

    println!("Loaded {} test case(s) from {}", cases.len(), path.display());
    Ok(evaluate_cases(cases, client, solvers, settings, verbose))
}

/// Report path next to the input: cases.json -> cases_results.json
pub fn report_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("eval");
    input.with_file_name(format!("{}_results.json", stem))
}

/// Print the aggregate block
pub fn print_report(report: &EvalReport) {
    println!("\n============================================================");
    println!("EVALUATION SUMMARY");
    println!("============================================================");
    println!("Total cases: {}", report.summary.total);
    println!("Passed:      {}", report.summary.passed);
    println!("Failed:      {}", report.summary.failed);
    println!("Accuracy:    {:.2}%", report.summary.accuracy);
    println!("============================================================");
}

// ============================================================================
// Tests
// ============================================================================
