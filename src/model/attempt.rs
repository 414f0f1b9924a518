use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::grading::normalize::normalize;
use crate::model::answer::StudentAnswer;
use crate::model::question::Question;
use crate::model::types::AttemptStatus;

#[derive(Debug, Error, PartialEq)]
pub enum AttemptError {
    #[error("attempt is not in progress")]
    NotInProgress,
    #[error("attempt has not been submitted")]
    NotSubmitted,
    #[error("question {0} is not manually scored")]
    NotManuallyScored(Uuid),
    #[error("score {score} exceeds max score {max_score}")]
    ScoreAboveMax { score: u32, max_score: u32 },
}

/// One student's run at an exam. Answers arrive as raw JSON during the
/// attempt and are normalized on the way in; after submission only the
/// review correction flow may change them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub status: AttemptStatus,
    #[serde(default)]
    pub answers: HashMap<Uuid, StudentAnswer>,
    #[serde(default)]
    pub manual_scores: HashMap<Uuid, u32>,
    pub started_at: PrimitiveDateTime,
    #[serde(default)]
    pub submitted_at: Option<PrimitiveDateTime>,
}

impl Attempt {
    pub fn new(exam_id: Uuid, student_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            student_id,
            status: AttemptStatus::InProgress,
            answers: HashMap::new(),
            manual_scores: HashMap::new(),
            started_at: primitive_now_utc(),
            submitted_at: None,
        }
    }

    /// Stores the latest raw answer for a question, replacing any earlier
    /// one. Rejected once the attempt has been submitted.
    pub fn record_answer(&mut self, question: &Question, raw: &Value) -> Result<(), AttemptError> {
        if self.status != AttemptStatus::InProgress {
            return Err(AttemptError::NotInProgress);
        }

        let answer = normalize(question.qtype, raw, &question.options);
        self.answers.insert(question.id, answer);
        Ok(())
    }

    pub fn submit(&mut self) -> Result<(), AttemptError> {
        if self.status != AttemptStatus::InProgress {
            return Err(AttemptError::NotInProgress);
        }

        self.status = AttemptStatus::Submitted;
        self.submitted_at = Some(primitive_now_utc());
        Ok(())
    }

    /// Teacher-assigned score for an essay or speaking question. Bounded by
    /// the question's max score, mirroring score overrides in review.
    pub fn assign_manual_score(
        &mut self,
        question: &Question,
        score: u32,
    ) -> Result<(), AttemptError> {
        if self.status == AttemptStatus::InProgress {
            return Err(AttemptError::NotSubmitted);
        }
        if !question.qtype.is_manual() {
            return Err(AttemptError::NotManuallyScored(question.id));
        }
        if score > question.max_score {
            return Err(AttemptError::ScoreAboveMax { score, max_score: question.max_score });
        }

        self.manual_scores.insert(question.id, score);
        Ok(())
    }

    pub fn answer_for(&self, question_id: Uuid) -> Option<&StudentAnswer> {
        self.answers.get(&question_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::question::{AnswerKey, Prompt, QuestionOptions};
    use crate::model::types::QuestionType;

    fn mcq(choices: &[&str], key: usize) -> Question {
        Question {
            id: Uuid::new_v4(),
            qtype: QuestionType::McqSingle,
            prompt: Prompt::from_text("Pick one"),
            options: QuestionOptions {
                choices: choices.iter().map(|choice| choice.to_string()).collect(),
                bank: Vec::new(),
            },
            answer_key: Some(AnswerKey::Choice { index: key }),
            max_score: 1,
        }
    }

    fn essay() -> Question {
        Question {
            id: Uuid::new_v4(),
            qtype: QuestionType::Essay,
            prompt: Prompt::from_text("Discuss"),
            options: QuestionOptions::default(),
            answer_key: None,
            max_score: 9,
        }
    }

    #[test]
    fn record_answer_normalizes_raw_input() {
        let question = mcq(&["Red", "Blue", "Green"], 1);
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());

        attempt.record_answer(&question, &json!("Blue")).expect("record");
        assert_eq!(attempt.answer_for(question.id), Some(&StudentAnswer::Choice { index: 1 }));
    }

    #[test]
    fn record_answer_rejected_after_submit() {
        let question = mcq(&["Red", "Blue"], 0);
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());
        attempt.submit().expect("submit");

        let result = attempt.record_answer(&question, &json!(0));
        assert_eq!(result, Err(AttemptError::NotInProgress));
    }

    #[test]
    fn submit_is_single_shot() {
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());
        attempt.submit().expect("submit");
        assert_eq!(attempt.status, AttemptStatus::Submitted);
        assert!(attempt.submitted_at.is_some());
        assert_eq!(attempt.submit(), Err(AttemptError::NotInProgress));
    }

    #[test]
    fn manual_score_requires_submission() {
        let question = essay();
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(attempt.assign_manual_score(&question, 5), Err(AttemptError::NotSubmitted));

        attempt.submit().expect("submit");
        attempt.assign_manual_score(&question, 5).expect("assign");
        assert_eq!(attempt.manual_scores.get(&question.id), Some(&5));
    }

    #[test]
    fn manual_score_is_bounded_by_max() {
        let question = essay();
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());
        attempt.submit().expect("submit");

        let result = attempt.assign_manual_score(&question, 10);
        assert_eq!(result, Err(AttemptError::ScoreAboveMax { score: 10, max_score: 9 }));
    }

    #[test]
    fn manual_score_rejected_for_auto_graded_question() {
        let question = mcq(&["Red"], 0);
        let mut attempt = Attempt::new(Uuid::new_v4(), Uuid::new_v4());
        attempt.submit().expect("submit");

        let result = attempt.assign_manual_score(&question, 1);
        assert_eq!(result, Err(AttemptError::NotManuallyScored(question.id)));
    }
}
