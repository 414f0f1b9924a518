use serde::Serialize;
use uuid::Uuid;

use crate::grading::grade::{grade, GradeError, GradedResult};
use crate::model::answer::StudentAnswer;
use crate::model::attempt::Attempt;
use crate::model::question::{Exam, Question, Section};
use crate::model::types::SkillArea;

/// Full recomputed standing of one attempt. Built fresh from the stored
/// answers on every call, so a corrected answer is reflected everywhere at
/// once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSummary {
    pub total_correct: u32,
    pub total_questions: u32,
    pub total_percentage: u32,
    pub total_score: u32,
    pub max_score: u32,
    pub pending: u32,
    pub sections: Vec<SectionSummary>,
    pub listening_parts: Option<ListeningParts>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub section_id: Uuid,
    pub title: String,
    pub skill: SkillArea,
    pub correct: u32,
    pub total: u32,
    pub percentage: u32,
    pub score: u32,
    pub max_score: u32,
    pub pending: u32,
}

/// Per-part correct counts for the first listening section that declares
/// part spans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ListeningParts {
    pub s1: PartScore,
    pub s2: PartScore,
    pub s3: PartScore,
    pub s4: PartScore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PartScore {
    pub correct: u32,
    pub total: u32,
}

/// Result for one question in an attempt. An assigned manual score wins;
/// otherwise the stored answer, or the unanswered sentinel when nothing was
/// recorded, is auto-graded.
pub fn result_for(question: &Question, attempt: &Attempt) -> Result<GradedResult, GradeError> {
    if question.qtype.is_manual() {
        if let Some(score) = attempt.manual_scores.get(&question.id) {
            return Ok(GradedResult::Manual { score: *score });
        }
    }
    match attempt.answer_for(question.id) {
        Some(answer) => grade(question, answer),
        None => grade(question, &StudentAnswer::unanswered_for(question.qtype)),
    }
}

pub fn summarize(exam: &Exam, attempt: &Attempt) -> Result<AttemptSummary, GradeError> {
    let mut sections = Vec::with_capacity(exam.sections.len());
    for section in &exam.sections {
        sections.push(summarize_section(section, attempt)?);
    }

    let total_correct: u32 = sections.iter().map(|section| section.correct).sum();
    let total_questions: u32 = sections.iter().map(|section| section.total).sum();
    let total_score: u32 = sections.iter().map(|section| section.score).sum();
    let max_score: u32 = sections.iter().map(|section| section.max_score).sum();
    let pending: u32 = sections.iter().map(|section| section.pending).sum();

    let listening_parts = match exam
        .sections
        .iter()
        .find(|section| section.skill == SkillArea::Listening && !section.parts.is_empty())
    {
        Some(section) => Some(listening_breakdown(section, attempt)?),
        None => None,
    };

    Ok(AttemptSummary {
        total_correct,
        total_questions,
        total_percentage: percentage(total_correct, total_questions),
        total_score,
        max_score,
        pending,
        sections,
        listening_parts,
    })
}

fn summarize_section(section: &Section, attempt: &Attempt) -> Result<SectionSummary, GradeError> {
    let mut correct = 0u32;
    let mut score = 0u32;
    let mut max_score = 0u32;
    let mut pending = 0u32;

    for question in &section.questions {
        let result = result_for(question, attempt)?;
        if result.counts_correct(question.max_score) {
            correct += 1;
        }
        if result.is_pending() {
            pending += 1;
        }
        score += result.score();
        max_score += question.max_score;
    }

    let total = section.questions.len() as u32;
    Ok(SectionSummary {
        section_id: section.id,
        title: section.title.clone(),
        skill: section.skill,
        correct,
        total,
        percentage: percentage(correct, total),
        score,
        max_score,
        pending,
    })
}

/// Correct counts per declared part span, in span order. Spans beyond the
/// fourth are ignored; a section with fewer spans leaves the rest at zero.
fn listening_breakdown(
    section: &Section,
    attempt: &Attempt,
) -> Result<ListeningParts, GradeError> {
    let mut parts = [PartScore::default(); 4];
    let mut start = 0usize;

    for (slot, span) in section.parts.iter().take(4).enumerate() {
        let mut correct = 0u32;
        let mut total = 0u32;
        for question in section.questions.iter().skip(start).take(span.question_count) {
            if result_for(question, attempt)?.counts_correct(question.max_score) {
                correct += 1;
            }
            total += 1;
        }
        parts[slot] = PartScore { correct, total };
        start += span.question_count;
    }

    Ok(ListeningParts { s1: parts[0], s2: parts[1], s3: parts[2], s4: parts[3] })
}

fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(correct) / f64::from(total)) * 100.0).round() as u32
}
