use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use uuid::Uuid;

use markbook::core::config::Settings;
use markbook::core::telemetry::init_tracing;
use markbook::core::time::{format_primitive, primitive_now_utc};
use markbook::grading::aggregate::{summarize, AttemptSummary};
use markbook::grading::grade::validate_exam;
use markbook::model::attempt::Attempt;
use markbook::model::question::Exam;

#[derive(Debug, Serialize)]
struct RegradeReport {
    exam_id: Uuid,
    exam_title: String,
    generated_at: String,
    attempts: Vec<AttemptReport>,
    failures: usize,
}

#[derive(Debug, Serialize)]
struct AttemptReport {
    attempt_id: Uuid,
    student_id: Uuid,
    summary: AttemptSummary,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;
    init_tracing(&settings)?;

    let (exam_path, attempts_path, report_path) = parse_args(&settings)?;

    let payload =
        fs::read_to_string(&exam_path).with_context(|| format!("Failed to read {exam_path}"))?;
    let exam: Exam = serde_json::from_str(&payload)
        .with_context(|| format!("Invalid exam JSON in {exam_path}"))?;
    validate_exam(&exam)?;

    let payload = fs::read_to_string(&attempts_path)
        .with_context(|| format!("Failed to read {attempts_path}"))?;
    let attempts: Vec<Attempt> = serde_json::from_str(&payload)
        .with_context(|| format!("Invalid attempts JSON in {attempts_path}"))?;

    tracing::info!(
        exam_id = %exam.id,
        questions = exam.total_questions(),
        attempts = attempts.len(),
        "Re-grading attempts against the current exam"
    );

    let mut rows = Vec::with_capacity(attempts.len());
    let mut failures = 0usize;
    for attempt in &attempts {
        match summarize(&exam, attempt) {
            Ok(summary) => {
                println!(
                    "OK {} {}/{} correct ({}%)",
                    attempt.id,
                    summary.total_correct,
                    summary.total_questions,
                    summary.total_percentage
                );
                rows.push(AttemptReport {
                    attempt_id: attempt.id,
                    student_id: attempt.student_id,
                    summary,
                });
            }
            Err(error) => {
                failures += 1;
                eprintln!("Failed to re-grade attempt {}: {error}", attempt.id);
            }
        }
    }

    let report = RegradeReport {
        exam_id: exam.id,
        exam_title: exam.title.clone(),
        generated_at: format_primitive(primitive_now_utc()),
        attempts: rows,
        failures,
    };
    let rendered = serde_json::to_string_pretty(&report).context("Failed to render report")?;
    fs::write(&report_path, rendered).with_context(|| format!("Failed to write {report_path}"))?;

    tracing::info!(
        report = %report_path,
        regraded = report.attempts.len(),
        failures,
        "Re-grading report written"
    );

    if failures > 0 {
        Err(anyhow!("re-grading failed for {failures} attempt(s)"))
    } else {
        Ok(())
    }
}

fn parse_args(settings: &Settings) -> Result<(String, String, String)> {
    let mut exam_path = settings.regrade().exam_path.clone();
    let mut attempts_path = settings.regrade().attempts_path.clone();
    let mut report_path = settings.regrade().report_path.clone();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exam" => {
                exam_path = args.next().ok_or_else(|| anyhow!("--exam missing value"))?;
            }
            "--attempts" => {
                attempts_path = args.next().ok_or_else(|| anyhow!("--attempts missing value"))?;
            }
            "--out" => {
                report_path = args.next().ok_or_else(|| anyhow!("--out missing value"))?;
            }
            _ => return Err(anyhow!("Unknown argument: {arg}")),
        }
    }

    Ok((exam_path, attempts_path, report_path))
}
