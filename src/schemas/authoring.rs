use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::model::question::{
    count_blank_markers, AnswerKey, Exam, KeyAlternatives, PartSpan, Prompt, Question,
    QuestionOptions, Section,
};
use crate::model::types::{QuestionType, SkillArea, TfNgValue};

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error(transparent)]
    Invalid(#[from] validator::ValidationErrors),
    #[error("question {index}: {qtype} requires an answer key")]
    MissingKey { index: usize, qtype: &'static str },
    #[error("question {index}: {qtype} does not take an answer key")]
    UnexpectedKey { index: usize, qtype: &'static str },
    #[error("question {index}: answer key shape does not match {qtype}")]
    KeyShape { index: usize, qtype: &'static str },
    #[error("question {index}: answer key must not be empty")]
    EmptyKey { index: usize },
    #[error("question {index}: choice index {value} is out of range for {choices} choices")]
    IndexOutOfRange { index: usize, value: usize, choices: usize },
    #[error("question {index}: order key must be a permutation of the {count} tokens")]
    NotAPermutation { index: usize, count: usize },
    #[error("question {index}: max score {max_score} must equal the blank count {blanks}")]
    MaxScoreMismatch { index: usize, max_score: u32, blanks: usize },
    #[error("question {index}: key has {found} answers but the prompt has {expected} blanks")]
    AnswerCountMismatch { index: usize, expected: usize, found: usize },
    #[error("question {index}: key has {found} gap entries but the prompt has {expected} gaps")]
    GapCountMismatch { index: usize, expected: usize, found: usize },
    #[error("section \"{title}\": parts cover {covered} questions but the section has {total}")]
    PartSpanMismatch { title: String, covered: usize, total: usize },
    #[error("only fill-in-blank questions can be split by line")]
    NotSplittable,
    #[error("multiline key has {found} answers but the text has {expected} blanks")]
    SplitCountMismatch { expected: usize, found: usize },
}

/// Wire shape of an exam as authored. `build` validates it and produces the
/// typed exam with parsed answer keys and fresh ids.
#[derive(Debug, Deserialize, Validate)]
pub struct ExamDraft {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "sections must not be empty"), nested)]
    pub sections: Vec<SectionDraft>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SectionDraft {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub skill: SkillArea,
    #[serde(default)]
    #[validate(nested)]
    pub parts: Vec<PartSpanDraft>,
    #[serde(default)]
    #[serde(alias = "audioUrl")]
    pub audio_url: Option<String>,
    #[validate(length(min = 1, message = "questions must not be empty"), nested)]
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct PartSpanDraft {
    #[validate(length(min = 1, message = "label must not be empty"))]
    pub label: String,
    #[serde(alias = "questionCount")]
    #[validate(range(min = 1, message = "question_count must be positive"))]
    pub question_count: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuestionDraft {
    #[serde(alias = "type")]
    pub qtype: QuestionType,
    #[validate(nested)]
    pub prompt: PromptDraft,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub bank: Vec<String>,
    #[serde(default)]
    #[serde(alias = "answerKey")]
    pub answer_key: Option<Value>,
    #[serde(default = "default_max_score")]
    #[serde(alias = "maxScore")]
    #[validate(range(min = 1, message = "max_score must be positive"))]
    pub max_score: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PromptDraft {
    #[validate(length(min = 1, message = "prompt text must not be empty"))]
    pub text: String,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "passageRef")]
    pub passage_ref: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

fn default_max_score() -> u32 {
    1
}

impl ExamDraft {
    pub fn build(self) -> Result<Exam, AuthoringError> {
        self.validate()?;
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in self.sections {
            sections.push(section.build()?);
        }
        Ok(Exam { id: Uuid::new_v4(), title: self.title, sections })
    }
}

impl SectionDraft {
    fn build(self) -> Result<Section, AuthoringError> {
        let covered: usize = self.parts.iter().map(|part| part.question_count).sum();
        if !self.parts.is_empty() && covered != self.questions.len() {
            return Err(AuthoringError::PartSpanMismatch {
                title: self.title.clone(),
                covered,
                total: self.questions.len(),
            });
        }

        let mut questions = Vec::with_capacity(self.questions.len());
        for (index, question) in self.questions.into_iter().enumerate() {
            questions.push(question.build(index)?);
        }

        let parts = self
            .parts
            .into_iter()
            .map(|part| PartSpan { label: part.label, question_count: part.question_count })
            .collect();

        Ok(Section {
            id: Uuid::new_v4(),
            title: self.title,
            skill: self.skill,
            parts,
            audio_url: self.audio_url,
            questions,
        })
    }
}

impl QuestionDraft {
    fn build(self, index: usize) -> Result<Question, AuthoringError> {
        let qtype = self.qtype;
        let answer_key = match (&self.answer_key, qtype.is_manual()) {
            (Some(_), true) => {
                return Err(AuthoringError::UnexpectedKey { index, qtype: qtype.as_str() })
            }
            (None, true) => None,
            (None, false) => {
                return Err(AuthoringError::MissingKey { index, qtype: qtype.as_str() })
            }
            (Some(raw), false) => Some(parse_answer_key(index, qtype, raw)?),
        };

        let question = Question {
            id: Uuid::new_v4(),
            qtype,
            prompt: Prompt {
                text: self.prompt.text,
                image_url: self.prompt.image_url,
                passage_ref: self.prompt.passage_ref,
                instructions: self.prompt.instructions,
            },
            options: QuestionOptions { choices: self.choices, bank: self.bank },
            answer_key,
            max_score: self.max_score,
        };
        check_question(index, &question)?;
        Ok(question)
    }
}

/// Parses the per-type plain key shape: `{"value"}`, `{"index"}`,
/// `{"indices"}`, `{"order"}`, `{"blanks"}` or `{"answers"}`.
fn parse_answer_key(
    index: usize,
    qtype: QuestionType,
    raw: &Value,
) -> Result<AnswerKey, AuthoringError> {
    let shape = || AuthoringError::KeyShape { index, qtype: qtype.as_str() };
    match qtype {
        QuestionType::Tf => raw
            .get("value")
            .and_then(Value::as_bool)
            .map(|value| AnswerKey::Boolean { value })
            .ok_or_else(shape),
        QuestionType::TfNg => raw
            .get("value")
            .and_then(Value::as_str)
            .and_then(TfNgValue::from_raw)
            .map(|value| AnswerKey::TfNg { value })
            .ok_or_else(shape),
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => raw
            .get("index")
            .and_then(Value::as_u64)
            .map(|value| AnswerKey::Choice { index: value as usize })
            .ok_or_else(shape),
        QuestionType::McqMulti => {
            let mut indices = index_list(raw.get("indices")).ok_or_else(shape)?;
            indices.sort_unstable();
            indices.dedup();
            Ok(AnswerKey::Choices { indices })
        }
        QuestionType::OrderSentence => {
            let order = index_list(raw.get("order")).ok_or_else(shape)?;
            Ok(AnswerKey::Order { order })
        }
        QuestionType::DndGap => {
            let blanks = string_list(raw.get("blanks")).ok_or_else(shape)?;
            Ok(AnswerKey::Gaps { blanks })
        }
        QuestionType::ShortText => {
            let answers = string_list(raw.get("answers")).ok_or_else(shape)?;
            Ok(AnswerKey::Text { answers })
        }
        QuestionType::FillInBlank => {
            let answers = raw
                .get("answers")
                .and_then(|value| {
                    serde_json::from_value::<Vec<KeyAlternatives>>(value.clone()).ok()
                })
                .ok_or_else(shape)?;
            let case_sensitive = raw
                .get("caseSensitive")
                .or_else(|| raw.get("case_sensitive"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(AnswerKey::Blanks { answers, case_sensitive })
        }
        QuestionType::Essay | QuestionType::SpeakingRecording => {
            Err(AuthoringError::UnexpectedKey { index, qtype: qtype.as_str() })
        }
    }
}

fn index_list(value: Option<&Value>) -> Option<Vec<usize>> {
    value?
        .as_array()?
        .iter()
        .map(|item| item.as_u64().map(|index| index as usize))
        .collect()
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?.as_array()?.iter().map(|item| item.as_str().map(str::to_string)).collect()
}

fn check_question(index: usize, question: &Question) -> Result<(), AuthoringError> {
    let choices = question.options.choices.len();
    match &question.answer_key {
        None | Some(AnswerKey::Boolean { .. }) | Some(AnswerKey::TfNg { .. }) => Ok(()),
        Some(AnswerKey::Choice { index: value }) => {
            if *value >= choices {
                return Err(AuthoringError::IndexOutOfRange { index, value: *value, choices });
            }
            Ok(())
        }
        Some(AnswerKey::Choices { indices }) => {
            if indices.is_empty() {
                return Err(AuthoringError::EmptyKey { index });
            }
            for value in indices {
                if *value >= choices {
                    return Err(AuthoringError::IndexOutOfRange {
                        index,
                        value: *value,
                        choices,
                    });
                }
            }
            Ok(())
        }
        Some(AnswerKey::Order { order }) => {
            if order.is_empty() {
                return Err(AuthoringError::EmptyKey { index });
            }
            if !is_permutation(order, choices) {
                return Err(AuthoringError::NotAPermutation { index, count: choices });
            }
            Ok(())
        }
        Some(AnswerKey::Gaps { blanks }) => {
            if blanks.is_empty() {
                return Err(AuthoringError::EmptyKey { index });
            }
            let expected = question.gap_keys().len();
            if blanks.len() != expected {
                return Err(AuthoringError::GapCountMismatch {
                    index,
                    expected,
                    found: blanks.len(),
                });
            }
            Ok(())
        }
        Some(AnswerKey::Text { answers }) => {
            if answers.is_empty() {
                return Err(AuthoringError::EmptyKey { index });
            }
            Ok(())
        }
        Some(AnswerKey::Blanks { answers, .. }) => {
            if answers.is_empty() {
                return Err(AuthoringError::EmptyKey { index });
            }
            let blanks = question.prompt.blank_count();
            if answers.len() != blanks {
                return Err(AuthoringError::AnswerCountMismatch {
                    index,
                    expected: blanks,
                    found: answers.len(),
                });
            }
            if question.max_score as usize != blanks {
                return Err(AuthoringError::MaxScoreMismatch {
                    index,
                    max_score: question.max_score,
                    blanks,
                });
            }
            Ok(())
        }
    }
}

fn is_permutation(order: &[usize], count: usize) -> bool {
    if order.len() != count {
        return false;
    }
    let mut seen = vec![false; count];
    for &position in order {
        if position >= count || seen[position] {
            return false;
        }
        seen[position] = true;
    }
    true
}

/// Splits a pasted multi-line fill-in-blank draft into one draft per gapped
/// line. Answers are assigned to lines left to right by each line's blank
/// count; lines without gaps are dropped.
pub fn split_multiline_blanks(
    draft: &QuestionDraft,
) -> Result<Vec<QuestionDraft>, AuthoringError> {
    if draft.qtype != QuestionType::FillInBlank {
        return Err(AuthoringError::NotSplittable);
    }
    let raw_key = draft
        .answer_key
        .as_ref()
        .ok_or(AuthoringError::MissingKey { index: 0, qtype: draft.qtype.as_str() })?;
    let answers = raw_key
        .get("answers")
        .and_then(|value| serde_json::from_value::<Vec<KeyAlternatives>>(value.clone()).ok())
        .ok_or(AuthoringError::KeyShape { index: 0, qtype: draft.qtype.as_str() })?;
    let case_sensitive = raw_key
        .get("caseSensitive")
        .or_else(|| raw_key.get("case_sensitive"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let total_blanks = count_blank_markers(&draft.prompt.text);
    if answers.len() != total_blanks {
        return Err(AuthoringError::SplitCountMismatch {
            expected: total_blanks,
            found: answers.len(),
        });
    }

    let mut remaining = answers.into_iter();
    let mut drafts = Vec::new();
    for line in draft.prompt.text.lines() {
        let line = line.trim();
        let blanks = count_blank_markers(line);
        if blanks == 0 {
            continue;
        }
        let line_answers: Vec<KeyAlternatives> = remaining.by_ref().take(blanks).collect();
        drafts.push(QuestionDraft {
            qtype: QuestionType::FillInBlank,
            prompt: PromptDraft {
                text: line.to_string(),
                image_url: None,
                passage_ref: None,
                instructions: draft.prompt.instructions.clone(),
            },
            choices: Vec::new(),
            bank: Vec::new(),
            answer_key: Some(json!({ "answers": line_answers, "caseSensitive": case_sensitive })),
            max_score: blanks as u32,
        });
    }
    Ok(drafts)
}
