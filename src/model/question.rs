use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::answer::StudentAnswer;
use crate::model::types::{QuestionType, SkillArea, TfNgValue};

/// One accepted answer for a blank: either a single string or a list of
/// interchangeable spellings ("90%", "90 %").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyAlternatives {
    One(String),
    Many(Vec<String>),
}

impl KeyAlternatives {
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// The alternative shown when the key is rendered for review.
    pub fn first(&self) -> &str {
        match self {
            Self::One(value) => value.as_str(),
            Self::Many(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// Canonical answer key per question type. Manual types (essay, speaking)
/// carry no key at all; `Question::answer_key` is `None` for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    Boolean { value: bool },
    TfNg { value: TfNgValue },
    Choice { index: usize },
    Choices { indices: Vec<usize> },
    Order { order: Vec<usize> },
    Gaps { blanks: Vec<String> },
    Text { answers: Vec<String> },
    Blanks { answers: Vec<KeyAlternatives>, case_sensitive: bool },
}

impl AnswerKey {
    pub fn matches_type(&self, qtype: QuestionType) -> bool {
        matches!(
            (qtype, self),
            (QuestionType::Tf, Self::Boolean { .. })
                | (QuestionType::TfNg, Self::TfNg { .. })
                | (QuestionType::McqSingle, Self::Choice { .. })
                | (QuestionType::Select, Self::Choice { .. })
                | (QuestionType::InlineSelect, Self::Choice { .. })
                | (QuestionType::McqMulti, Self::Choices { .. })
                | (QuestionType::OrderSentence, Self::Order { .. })
                | (QuestionType::DndGap, Self::Gaps { .. })
                | (QuestionType::ShortText, Self::Text { .. })
                | (QuestionType::FillInBlank, Self::Blanks { .. })
        )
    }

    /// Projects the key to the student-answer shape so the review table can
    /// render both columns through the same per-type formatting rules.
    pub fn project(&self) -> StudentAnswer {
        match self {
            Self::Boolean { value } => StudentAnswer::Bool { value: *value },
            Self::TfNg { value } => StudentAnswer::TfNg { value: *value },
            Self::Choice { index } => StudentAnswer::Choice { index: *index },
            Self::Choices { indices } => StudentAnswer::Choices { indices: indices.clone() },
            Self::Order { order } => StudentAnswer::Order { positions: order.clone() },
            Self::Gaps { blanks } => StudentAnswer::Blanks {
                entries: positional_entries(blanks.iter().map(String::clone)),
            },
            Self::Text { answers } => {
                StudentAnswer::Text { value: answers.first().cloned().unwrap_or_default() }
            }
            Self::Blanks { answers, .. } => StudentAnswer::Blanks {
                entries: positional_entries(answers.iter().map(|alt| alt.first().to_string())),
            },
        }
    }
}

fn positional_entries(values: impl Iterator<Item = String>) -> BTreeMap<String, String> {
    values.enumerate().map(|(index, value)| (index.to_string(), value)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub passage_ref: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Prompt {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), image_url: None, passage_ref: None, instructions: None }
    }

    /// Number of blank markers in the prompt. A marker is a run of three or
    /// more underscores; several may sit on one line.
    pub fn blank_count(&self) -> usize {
        count_blank_markers(&self.text)
    }
}

pub(crate) fn count_blank_markers(text: &str) -> usize {
    let mut markers = 0;
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '_' {
            run += 1;
        } else {
            if run >= 3 {
                markers += 1;
            }
            run = 0;
        }
    }
    if run >= 3 {
        markers += 1;
    }
    markers
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionOptions {
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub bank: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub qtype: QuestionType,
    pub prompt: Prompt,
    #[serde(default)]
    pub options: QuestionOptions,
    #[serde(default)]
    pub answer_key: Option<AnswerKey>,
    pub max_score: u32,
}

impl Question {
    /// Blank identifiers for a gap question in document order. Each prompt
    /// line is one sentence; a sentence with a single gap is keyed by its
    /// line index alone, a sentence with several gaps by "line-part".
    pub fn gap_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for (sentence, line) in self.prompt.text.lines().enumerate() {
            let gaps = count_blank_markers(line);
            if gaps == 1 {
                keys.push(sentence.to_string());
            } else {
                for part in 0..gaps {
                    keys.push(format!("{sentence}-{part}"));
                }
            }
        }
        keys
    }
}

/// Contiguous run of questions inside a section, e.g. one IELTS Listening
/// part. Spans cover the section's questions in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpan {
    pub label: String,
    pub question_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub skill: SkillArea,
    #[serde(default)]
    pub parts: Vec<PartSpan>,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub sections: Vec<Section>,
}

impl Exam {
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|section| section.questions.iter())
    }

    pub fn total_questions(&self) -> usize {
        self.sections.iter().map(|section| section.questions.len()).sum()
    }

    pub fn question_by_id(&self, question_id: Uuid) -> Option<(&Section, &Question)> {
        self.sections.iter().find_map(|section| {
            section
                .questions
                .iter()
                .find(|question| question.id == question_id)
                .map(|question| (section, question))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap_question(text: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            qtype: QuestionType::DndGap,
            prompt: Prompt::from_text(text),
            options: QuestionOptions::default(),
            answer_key: None,
            max_score: 1,
        }
    }

    #[test]
    fn blank_markers_need_three_underscores() {
        assert_eq!(count_blank_markers("a __ b"), 0);
        assert_eq!(count_blank_markers("a ___ b"), 1);
        assert_eq!(count_blank_markers("a ______ b"), 1);
        assert_eq!(count_blank_markers("The ___ left at ___."), 2);
        assert_eq!(count_blank_markers("ends with ___"), 1);
    }

    #[test]
    fn gap_keys_for_single_gap_sentences() {
        let question = gap_question("He ___ early.\nShe ___ late.");
        assert_eq!(question.gap_keys(), vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn gap_keys_for_multi_gap_sentences() {
        let question = gap_question("He ___ at ___ today.\nNo gaps here.\nShe ___ now.");
        assert_eq!(
            question.gap_keys(),
            vec!["0-0".to_string(), "0-1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn key_shape_must_match_type() {
        let key = AnswerKey::Choice { index: 1 };
        assert!(key.matches_type(QuestionType::McqSingle));
        assert!(key.matches_type(QuestionType::InlineSelect));
        assert!(!key.matches_type(QuestionType::McqMulti));
        assert!(!key.matches_type(QuestionType::Tf));
    }

    #[test]
    fn key_projection_uses_first_alternative() {
        let key = AnswerKey::Blanks {
            answers: vec![
                KeyAlternatives::One("train".to_string()),
                KeyAlternatives::Many(vec!["90%".to_string(), "90 %".to_string()]),
            ],
            case_sensitive: false,
        };

        let StudentAnswer::Blanks { entries } = key.project() else {
            panic!("expected blanks projection");
        };
        assert_eq!(entries.get("0").map(String::as_str), Some("train"));
        assert_eq!(entries.get("1").map(String::as_str), Some("90%"));
    }

    #[test]
    fn key_alternatives_accept_both_wire_shapes() {
        let parsed: Vec<KeyAlternatives> =
            serde_json::from_str(r#"["train", ["90%", "90 %"]]"#).expect("alternatives");
        assert_eq!(parsed[0].alternatives(), vec!["train"]);
        assert_eq!(parsed[1].alternatives(), vec!["90%", "90 %"]);
    }
}
