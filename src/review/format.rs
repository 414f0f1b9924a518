use std::collections::BTreeMap;

use crate::model::answer::{ordered_blank_entries, StudentAnswer};
use crate::model::question::{Question, QuestionOptions};
use crate::model::types::QuestionType;

pub const NO_ANSWER: &str = "No answer";
pub const NO_RECORDING: &str = "No recording";

/// Renders a stored answer for the review table. Choice indexes are turned
/// back into their display text; blank or missing answers become the
/// per-type sentinel.
pub fn format_student_answer(
    qtype: QuestionType,
    answer: &StudentAnswer,
    options: &QuestionOptions,
) -> String {
    if answer.is_blank() {
        return missing_label(qtype).to_string();
    }

    match qtype {
        QuestionType::Tf => match answer {
            StudentAnswer::Bool { value } => if *value { "True" } else { "False" }.to_string(),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::TfNg => match answer {
            StudentAnswer::TfNg { value } => value.label().to_string(),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => {
            match answer {
                StudentAnswer::Choice { index } => choice_label(options, *index),
                _ => NO_ANSWER.to_string(),
            }
        }
        QuestionType::McqMulti => match answer {
            StudentAnswer::Choices { indices } => indices
                .iter()
                .map(|index| choice_label(options, *index))
                .collect::<Vec<_>>()
                .join(", "),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::OrderSentence => match answer {
            StudentAnswer::Order { positions } => positions
                .iter()
                .map(|position| choice_label(options, *position))
                .collect::<Vec<_>>()
                .join(" → "),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::DndGap | QuestionType::FillInBlank => match answer {
            StudentAnswer::Blanks { entries } => format_blanks(entries),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::ShortText | QuestionType::Essay => match answer {
            StudentAnswer::Text { value } => value.trim().to_string(),
            _ => NO_ANSWER.to_string(),
        },
        QuestionType::SpeakingRecording => match answer {
            StudentAnswer::Recording { .. } => String::new(),
            _ => NO_RECORDING.to_string(),
        },
    }
}

/// The correct-answer column: the key projected through the same per-type
/// rendering as the student's answer.
pub fn format_key(question: &Question) -> String {
    match &question.answer_key {
        Some(key) => format_student_answer(question.qtype, &key.project(), &question.options),
        None => NO_ANSWER.to_string(),
    }
}

fn missing_label(qtype: QuestionType) -> &'static str {
    if qtype == QuestionType::SpeakingRecording {
        NO_RECORDING
    } else {
        NO_ANSWER
    }
}

fn choice_label(options: &QuestionOptions, index: usize) -> String {
    options.choices.get(index).cloned().unwrap_or_else(|| format!("Option {index}"))
}

fn format_blanks(entries: &BTreeMap<String, String>) -> String {
    ordered_blank_entries(entries)
        .into_iter()
        .enumerate()
        .map(|(position, (_, value))| {
            let shown = if value.trim().is_empty() { "(empty)" } else { value.trim() };
            format!("{}. {}", position + 1, shown)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
