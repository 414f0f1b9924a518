use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::answer::StudentAnswer;
use crate::model::question::{AnswerKey, Exam, KeyAlternatives, Question};
use crate::model::types::QuestionType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradeError {
    #[error("question {id}: {qtype} requires an answer key")]
    MissingKey { id: Uuid, qtype: &'static str },
    #[error("question {id}: answer key shape does not match {qtype}")]
    KeyMismatch { id: Uuid, qtype: &'static str },
}

/// Outcome of grading one question. Auto-graded questions carry the
/// correctness verdict; manual ones stay pending until a reviewer scores
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GradedResult {
    Auto { is_correct: bool, score: u32 },
    Pending,
    Manual { score: u32 },
}

impl GradedResult {
    pub fn score(&self) -> u32 {
        match self {
            Self::Auto { score, .. } | Self::Manual { score } => *score,
            Self::Pending => 0,
        }
    }

    /// Whether the question counts towards the correct-answer tally. A
    /// manually scored question counts only at full credit.
    pub fn counts_correct(&self, max_score: u32) -> bool {
        match self {
            Self::Auto { is_correct, .. } => *is_correct,
            Self::Manual { score } => max_score > 0 && *score >= max_score,
            Self::Pending => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Grades one normalized answer against the question's key.
///
/// Unanswered and malformed answers grade as plain incorrect; the only
/// failures are structural key problems, which the caller should treat as
/// exam configuration errors.
pub fn grade(question: &Question, answer: &StudentAnswer) -> Result<GradedResult, GradeError> {
    let max_score = question.max_score;
    let graded = match question.qtype {
        QuestionType::Essay | QuestionType::SpeakingRecording => GradedResult::Pending,
        QuestionType::Tf => {
            let key = checked_key(question)?;
            let is_correct = matches!(
                (key, answer),
                (AnswerKey::Boolean { value }, StudentAnswer::Bool { value: given })
                    if value == given
            );
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::TfNg => {
            let key = checked_key(question)?;
            let is_correct = matches!(
                (key, answer),
                (AnswerKey::TfNg { value }, StudentAnswer::TfNg { value: given })
                    if value == given
            );
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => {
            let key = checked_key(question)?;
            let is_correct = matches!(
                (key, answer),
                (AnswerKey::Choice { index }, StudentAnswer::Choice { index: given })
                    if index == given
            );
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::McqMulti => {
            let key = checked_key(question)?;
            let is_correct = match (key, answer) {
                (AnswerKey::Choices { indices }, StudentAnswer::Choices { indices: given }) => {
                    same_index_set(indices, given)
                }
                _ => false,
            };
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::OrderSentence => {
            let key = checked_key(question)?;
            let is_correct = match (key, answer) {
                (AnswerKey::Order { order }, StudentAnswer::Order { positions }) => {
                    !order.is_empty() && order == positions
                }
                _ => false,
            };
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::DndGap => {
            let key = checked_key(question)?;
            let is_correct = match (key, answer) {
                (AnswerKey::Gaps { blanks }, StudentAnswer::Blanks { entries }) => {
                    gaps_all_match(question, blanks, entries)
                }
                _ => false,
            };
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::ShortText => {
            let key = checked_key(question)?;
            let is_correct = match (key, answer) {
                (AnswerKey::Text { answers }, StudentAnswer::Text { value }) => {
                    answers.iter().any(|accepted| text_matches(accepted, value))
                }
                _ => false,
            };
            all_or_nothing(is_correct, max_score)
        }
        QuestionType::FillInBlank => {
            let key = checked_key(question)?;
            match (key, answer) {
                (
                    AnswerKey::Blanks { answers, case_sensitive },
                    StudentAnswer::Blanks { entries },
                ) => blanks_partial_credit(answers, *case_sensitive, entries),
                _ => GradedResult::Auto { is_correct: false, score: 0 },
            }
        }
    };
    Ok(graded)
}

/// Checks every question's key up front so structural problems surface at
/// load time instead of mid-grading.
pub fn validate_exam(exam: &Exam) -> Result<(), GradeError> {
    for question in exam.questions() {
        validate_question(question)?;
    }
    Ok(())
}

pub fn validate_question(question: &Question) -> Result<(), GradeError> {
    if question.qtype.is_manual() {
        if question.answer_key.is_some() {
            return Err(GradeError::KeyMismatch {
                id: question.id,
                qtype: question.qtype.as_str(),
            });
        }
        return Ok(());
    }
    checked_key(question).map(|_| ())
}

fn checked_key(question: &Question) -> Result<&AnswerKey, GradeError> {
    let key = question.answer_key.as_ref().ok_or(GradeError::MissingKey {
        id: question.id,
        qtype: question.qtype.as_str(),
    })?;
    if !key.matches_type(question.qtype) {
        return Err(GradeError::KeyMismatch { id: question.id, qtype: question.qtype.as_str() });
    }
    Ok(key)
}

fn all_or_nothing(is_correct: bool, max_score: u32) -> GradedResult {
    GradedResult::Auto { is_correct, score: if is_correct { max_score } else { 0 } }
}

/// One point per matched blank. Fully correct only when every blank matched
/// and the key is not empty.
fn blanks_partial_credit(
    answers: &[KeyAlternatives],
    case_sensitive: bool,
    entries: &BTreeMap<String, String>,
) -> GradedResult {
    let mut matched = 0u32;
    for (position, accepted) in answers.iter().enumerate() {
        let Some(given) = entries.get(&position.to_string()) else { continue };
        if given.trim().is_empty() {
            continue;
        }
        if accepted
            .alternatives()
            .iter()
            .any(|expected| blank_matches(expected, given, case_sensitive))
        {
            matched += 1;
        }
    }
    let is_correct = !answers.is_empty() && matched as usize == answers.len();
    GradedResult::Auto { is_correct, score: matched }
}

/// All gaps must match for credit. Single-gap sentences are keyed either
/// bare ("3") or with an explicit part ("3-0"); both spellings are accepted.
fn gaps_all_match(
    question: &Question,
    blanks: &[String],
    entries: &BTreeMap<String, String>,
) -> bool {
    if blanks.is_empty() {
        return false;
    }
    let gap_keys = question.gap_keys();
    if gap_keys.len() != blanks.len() {
        return false;
    }
    gap_keys.iter().zip(blanks).all(|(gap_key, expected)| {
        lookup_gap(entries, gap_key)
            .map(|given| text_matches(expected, given))
            .unwrap_or(false)
    })
}

fn lookup_gap<'a>(entries: &'a BTreeMap<String, String>, gap_key: &str) -> Option<&'a str> {
    if let Some(value) = entries.get(gap_key) {
        return Some(value.as_str());
    }
    if !gap_key.contains('-') {
        return entries.get(&format!("{gap_key}-0")).map(String::as_str);
    }
    None
}

fn text_matches(expected: &str, given: &str) -> bool {
    expected.trim().to_lowercase() == given.trim().to_lowercase()
}

fn blank_matches(expected: &str, given: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        expected.trim() == given.trim()
    } else {
        squash(expected) == squash(given)
    }
}

/// Whitespace-insensitive comparison form: "90 %" and "90%" are the same
/// answer.
fn squash(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect::<String>().to_lowercase()
}

fn same_index_set(expected: &[usize], given: &[usize]) -> bool {
    if expected.is_empty() {
        return false;
    }
    let mut lhs = expected.to_vec();
    lhs.sort_unstable();
    lhs.dedup();
    let mut rhs = given.to_vec();
    rhs.sort_unstable();
    rhs.dedup();
    lhs == rhs
}
