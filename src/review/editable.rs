use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::answer::StudentAnswer;
use crate::model::question::QuestionOptions;
use crate::model::types::{QuestionType, TfNgValue};

/// What the review UI edits for one question. Each question type maps to
/// exactly one form shape; empty forms stand for "no answer".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormValue {
    Toggle { value: Option<bool> },
    TfNgChoice { value: Option<TfNgValue> },
    Selection { index: Option<usize> },
    MultiSelection { indices: Vec<usize> },
    Ordering { positions: Vec<usize> },
    Text { value: String },
    Fields { entries: BTreeMap<String, String> },
    Recording { audio_url: String, duration_sec: Option<u32> },
}

/// Projects a stored answer into its editable form. Legacy text stored for a
/// choice question is resolved back to its index here so the form shows a
/// selection instead of free text.
pub fn to_editable(
    qtype: QuestionType,
    stored: &StudentAnswer,
    options: &QuestionOptions,
) -> FormValue {
    match qtype {
        QuestionType::Tf => FormValue::Toggle {
            value: match stored {
                StudentAnswer::Bool { value } => Some(*value),
                _ => None,
            },
        },
        QuestionType::TfNg => FormValue::TfNgChoice {
            value: match stored {
                StudentAnswer::TfNg { value } => Some(*value),
                _ => None,
            },
        },
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => {
            FormValue::Selection {
                index: match stored {
                    StudentAnswer::Choice { index } => Some(*index),
                    StudentAnswer::Text { value } => {
                        options.choices.iter().position(|choice| choice == value)
                    }
                    _ => None,
                },
            }
        }
        QuestionType::McqMulti => FormValue::MultiSelection {
            indices: match stored {
                StudentAnswer::Choices { indices } => indices.clone(),
                _ => Vec::new(),
            },
        },
        QuestionType::OrderSentence => FormValue::Ordering {
            positions: match stored {
                StudentAnswer::Order { positions } => positions.clone(),
                _ => Vec::new(),
            },
        },
        QuestionType::DndGap | QuestionType::FillInBlank => FormValue::Fields {
            entries: match stored {
                StudentAnswer::Blanks { entries } => entries.clone(),
                _ => BTreeMap::new(),
            },
        },
        QuestionType::ShortText | QuestionType::Essay => FormValue::Text {
            value: match stored {
                StudentAnswer::Text { value } => value.clone(),
                _ => String::new(),
            },
        },
        QuestionType::SpeakingRecording => match stored {
            StudentAnswer::Recording { audio_url, duration_sec } => FormValue::Recording {
                audio_url: audio_url.clone(),
                duration_sec: *duration_sec,
            },
            _ => FormValue::Recording { audio_url: String::new(), duration_sec: None },
        },
    }
}

/// Folds an edited form back into the canonical stored shape. A form of the
/// wrong kind for the question degrades to the unanswered sentinel rather
/// than storing an invalid shape.
pub fn from_editable(
    qtype: QuestionType,
    form: &FormValue,
    _options: &QuestionOptions,
) -> StudentAnswer {
    match qtype {
        QuestionType::Tf => match form {
            FormValue::Toggle { value: Some(value) } => StudentAnswer::Bool { value: *value },
            _ => StudentAnswer::Unanswered,
        },
        QuestionType::TfNg => match form {
            FormValue::TfNgChoice { value: Some(value) } => {
                StudentAnswer::TfNg { value: *value }
            }
            _ => StudentAnswer::Unanswered,
        },
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => {
            match form {
                FormValue::Selection { index: Some(index) } => {
                    StudentAnswer::Choice { index: *index }
                }
                _ => StudentAnswer::Unanswered,
            }
        }
        QuestionType::McqMulti => match form {
            FormValue::MultiSelection { indices } => {
                let mut indices = indices.clone();
                indices.sort_unstable();
                indices.dedup();
                StudentAnswer::Choices { indices }
            }
            _ => StudentAnswer::unanswered_for(qtype),
        },
        QuestionType::OrderSentence => match form {
            FormValue::Ordering { positions } => {
                StudentAnswer::Order { positions: positions.clone() }
            }
            _ => StudentAnswer::unanswered_for(qtype),
        },
        QuestionType::DndGap | QuestionType::FillInBlank => match form {
            FormValue::Fields { entries } => StudentAnswer::Blanks { entries: entries.clone() },
            _ => StudentAnswer::unanswered_for(qtype),
        },
        QuestionType::ShortText | QuestionType::Essay => match form {
            FormValue::Text { value } if !value.trim().is_empty() => {
                StudentAnswer::Text { value: value.clone() }
            }
            _ => StudentAnswer::Unanswered,
        },
        QuestionType::SpeakingRecording => match form {
            FormValue::Recording { audio_url, duration_sec } if !audio_url.is_empty() => {
                StudentAnswer::Recording {
                    audio_url: audio_url.clone(),
                    duration_sec: *duration_sec,
                }
            }
            _ => StudentAnswer::Unanswered,
        },
    }
}
