use serde::Serialize;
use uuid::Uuid;

use crate::grading::aggregate::result_for;
use crate::grading::grade::GradeError;
use crate::model::answer::StudentAnswer;
use crate::model::attempt::Attempt;
use crate::model::question::{Exam, Question, Section};
use crate::review::format::{format_key, format_student_answer};

const EXCERPT_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Pending,
}

/// One row of the per-question review table: both answers rendered as text,
/// next to the verdict and score.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub number: usize,
    pub question_id: Uuid,
    pub prompt_excerpt: String,
    pub student_answer: String,
    pub correct_answer: String,
    pub verdict: Verdict,
    pub score: u32,
    pub max_score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section_id: Uuid,
    pub title: String,
    pub rows: Vec<ReviewRow>,
}

pub fn build_section_reports(
    exam: &Exam,
    attempt: &Attempt,
) -> Result<Vec<SectionReport>, GradeError> {
    exam.sections.iter().map(|section| build_section_report(section, attempt)).collect()
}

fn build_section_report(
    section: &Section,
    attempt: &Attempt,
) -> Result<SectionReport, GradeError> {
    let mut rows = Vec::with_capacity(section.questions.len());
    for (position, question) in section.questions.iter().enumerate() {
        rows.push(build_row(position + 1, question, attempt)?);
    }
    Ok(SectionReport { section_id: section.id, title: section.title.clone(), rows })
}

fn build_row(
    number: usize,
    question: &Question,
    attempt: &Attempt,
) -> Result<ReviewRow, GradeError> {
    let result = result_for(question, attempt)?;
    let fallback = StudentAnswer::unanswered_for(question.qtype);
    let answer = attempt.answer_for(question.id).unwrap_or(&fallback);

    let verdict = if result.is_pending() {
        Verdict::Pending
    } else if result.counts_correct(question.max_score) {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    };

    Ok(ReviewRow {
        number,
        question_id: question.id,
        prompt_excerpt: excerpt(&question.prompt.text),
        student_answer: format_student_answer(question.qtype, answer, &question.options),
        correct_answer: format_key(question),
        verdict,
        score: result.score(),
        max_score: question.max_score,
    })
}

/// Prompt text flattened to one line and cut at a character budget, so rows
/// stay scannable even for passage-length prompts.
fn excerpt(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= EXCERPT_CHARS {
        return flattened;
    }
    let mut cut: String = flattened.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}
