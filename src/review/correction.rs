use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::grading::aggregate::{result_for, summarize, AttemptSummary};
use crate::grading::grade::{GradeError, GradedResult};
use crate::model::answer::StudentAnswer;
use crate::model::attempt::{Attempt, AttemptError};
use crate::model::question::{Exam, Question};
use crate::model::types::AttemptStatus;
use crate::review::editable::{from_editable, to_editable, FormValue};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("attempt {0} is not in review")]
    AttemptNotFound(Uuid),
    #[error("question {0} is not part of the exam")]
    QuestionNotFound(Uuid),
    #[error("attempt {0} has not been submitted")]
    NotSubmitted(Uuid),
    #[error("attempt {0} still has manual grading pending")]
    ManualGradingPending(Uuid),
    #[error("attempt lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

/// One opened answer-correction form. Editing is read-copy-update: the form
/// is a snapshot, and saving folds the edited form back into the attempt.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub form: FormValue,
    pub opened_at: PrimitiveDateTime,
}

/// What a saved correction or manual score produced: the question's new
/// result plus the fully recomputed summary.
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub question_id: Uuid,
    pub result: GradedResult,
    pub summary: AttemptSummary,
}

/// Submitted attempts under teacher review, keyed by attempt. Each attempt
/// sits behind its own lock so concurrent corrections to one attempt are
/// serialized while different attempts proceed independently.
pub struct ReviewStore {
    exam: Exam,
    attempts: HashMap<Uuid, Mutex<Attempt>>,
}

impl ReviewStore {
    pub fn new(exam: Exam) -> Self {
        Self { exam, attempts: HashMap::new() }
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    /// Takes a submitted attempt into review. In-progress attempts are
    /// rejected; answers may only be corrected after submission.
    pub fn admit(&mut self, attempt: Attempt) -> Result<(), ReviewError> {
        if attempt.status == AttemptStatus::InProgress {
            return Err(ReviewError::NotSubmitted(attempt.id));
        }
        self.attempts.insert(attempt.id, Mutex::new(attempt));
        Ok(())
    }

    /// Opens the editable form for one question of one attempt.
    pub fn open_edit(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
    ) -> Result<EditSession, ReviewError> {
        let question = self.question(question_id)?;
        let attempt = self.lock(attempt_id)?;

        let fallback = StudentAnswer::unanswered_for(question.qtype);
        let stored = attempt.answer_for(question_id).unwrap_or(&fallback);
        let form = to_editable(question.qtype, stored, &question.options);

        Ok(EditSession { attempt_id, question_id, form, opened_at: primitive_now_utc() })
    }

    /// Saves an edited form: overwrites that one answer, re-grades it and
    /// recomputes the whole summary under the attempt's lock.
    pub fn save_edit(
        &self,
        session: &EditSession,
        edited: FormValue,
    ) -> Result<CorrectionOutcome, ReviewError> {
        let question = self.question(session.question_id)?;
        let mut attempt = self.lock(session.attempt_id)?;

        let corrected = from_editable(question.qtype, &edited, &question.options);
        attempt.answers.insert(question.id, corrected);

        let result = result_for(question, &attempt)?;
        let summary = summarize(&self.exam, &attempt)?;
        tracing::info!(
            attempt_id = %session.attempt_id,
            question_id = %session.question_id,
            "Answer corrected in review"
        );

        Ok(CorrectionOutcome { question_id: question.id, result, summary })
    }

    /// Assigns a reviewer score to an essay or speaking question.
    pub fn set_manual_score(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        score: u32,
    ) -> Result<CorrectionOutcome, ReviewError> {
        let question = self.question(question_id)?;
        let mut attempt = self.lock(attempt_id)?;

        attempt.assign_manual_score(question, score)?;

        let result = result_for(question, &attempt)?;
        let summary = summarize(&self.exam, &attempt)?;
        tracing::info!(
            attempt_id = %attempt_id,
            question_id = %question_id,
            score,
            "Manual score assigned"
        );

        Ok(CorrectionOutcome { question_id, result, summary })
    }

    pub fn summary(&self, attempt_id: Uuid) -> Result<AttemptSummary, ReviewError> {
        let attempt = self.lock(attempt_id)?;
        Ok(summarize(&self.exam, &attempt)?)
    }

    /// Closes review for an attempt. Refused while any manual question is
    /// still waiting for a score.
    pub fn finalize(&self, attempt_id: Uuid) -> Result<AttemptSummary, ReviewError> {
        let mut attempt = self.lock(attempt_id)?;
        let summary = summarize(&self.exam, &attempt)?;
        if summary.pending > 0 {
            return Err(ReviewError::ManualGradingPending(attempt_id));
        }
        attempt.status = AttemptStatus::Graded;
        Ok(summary)
    }

    fn question(&self, question_id: Uuid) -> Result<&Question, ReviewError> {
        self.exam
            .question_by_id(question_id)
            .map(|(_, question)| question)
            .ok_or(ReviewError::QuestionNotFound(question_id))
    }

    fn lock(&self, attempt_id: Uuid) -> Result<MutexGuard<'_, Attempt>, ReviewError> {
        self.attempts
            .get(&attempt_id)
            .ok_or(ReviewError::AttemptNotFound(attempt_id))?
            .lock()
            .map_err(|_| ReviewError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{essay, exam_of, mcq_single, submitted_attempt};

    fn store_with_attempt() -> (ReviewStore, Uuid, Vec<Uuid>) {
        let questions = (0..4).map(|_| mcq_single(&["Red", "Blue"], 1)).collect::<Vec<_>>();
        let ids = questions.iter().map(|question| question.id).collect::<Vec<_>>();
        let exam = exam_of(questions);
        let attempt = submitted_attempt(
            &exam,
            &[(ids[0], json!(1)), (ids[1], json!(1)), (ids[2], json!(1)), (ids[3], json!(0))],
        );
        let attempt_id = attempt.id;

        let mut store = ReviewStore::new(exam);
        store.admit(attempt).expect("admit");
        (store, attempt_id, ids)
    }

    #[test]
    fn correcting_an_answer_updates_the_summary() {
        let (store, attempt_id, ids) = store_with_attempt();
        assert_eq!(store.summary(attempt_id).expect("summary").total_percentage, 75);

        let session = store.open_edit(attempt_id, ids[3]).expect("open edit");
        assert_eq!(session.form, FormValue::Selection { index: Some(0) });

        let outcome = store
            .save_edit(&session, FormValue::Selection { index: Some(1) })
            .expect("save edit");
        assert_eq!(outcome.result, GradedResult::Auto { is_correct: true, score: 1 });
        assert_eq!(outcome.summary.total_percentage, 100);
        assert_eq!(outcome.summary.total_correct, 4);

        assert_eq!(store.summary(attempt_id).expect("summary").total_percentage, 100);
    }

    #[test]
    fn clearing_an_answer_through_the_form() {
        let (store, attempt_id, ids) = store_with_attempt();
        let session = store.open_edit(attempt_id, ids[0]).expect("open edit");
        let outcome =
            store.save_edit(&session, FormValue::Selection { index: None }).expect("save edit");
        assert_eq!(outcome.result, GradedResult::Auto { is_correct: false, score: 0 });
        assert_eq!(outcome.summary.total_correct, 2);
    }

    #[test]
    fn in_progress_attempts_are_not_admitted() {
        let exam = exam_of(vec![mcq_single(&["Red", "Blue"], 1)]);
        let attempt = Attempt::new(exam.id, Uuid::new_v4());
        let mut store = ReviewStore::new(exam);
        assert!(matches!(store.admit(attempt), Err(ReviewError::NotSubmitted(_))));
    }

    #[test]
    fn unknown_attempts_and_questions_are_reported() {
        let (store, attempt_id, _) = store_with_attempt();
        assert!(matches!(
            store.open_edit(attempt_id, Uuid::new_v4()),
            Err(ReviewError::QuestionNotFound(_))
        ));
        assert!(matches!(
            store.open_edit(Uuid::new_v4(), store.exam().questions().next().expect("question").id),
            Err(ReviewError::AttemptNotFound(_))
        ));
    }

    #[test]
    fn finalize_requires_all_manual_scores() {
        let writing = essay(9);
        let writing_id = writing.id;
        let exam = exam_of(vec![writing]);
        let attempt = submitted_attempt(&exam, &[(writing_id, json!("An essay."))]);
        let attempt_id = attempt.id;

        let mut store = ReviewStore::new(exam);
        store.admit(attempt).expect("admit");

        assert!(matches!(
            store.finalize(attempt_id),
            Err(ReviewError::ManualGradingPending(_))
        ));

        let outcome = store.set_manual_score(attempt_id, writing_id, 7).expect("score");
        assert_eq!(outcome.result, GradedResult::Manual { score: 7 });

        let summary = store.finalize(attempt_id).expect("finalize");
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.total_score, 7);
    }

    #[test]
    fn manual_scores_are_bounded_by_the_question() {
        let writing = essay(9);
        let writing_id = writing.id;
        let exam = exam_of(vec![writing]);
        let attempt = submitted_attempt(&exam, &[]);
        let attempt_id = attempt.id;

        let mut store = ReviewStore::new(exam);
        store.admit(attempt).expect("admit");

        assert!(matches!(
            store.set_manual_score(attempt_id, writing_id, 10),
            Err(ReviewError::Attempt(AttemptError::ScoreAboveMax { .. }))
        ));
    }

    #[test]
    fn concurrent_corrections_to_one_attempt_serialize() {
        let (store, attempt_id, ids) = store_with_attempt();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let session = store.open_edit(attempt_id, ids[3]).expect("open edit");
                    store
                        .save_edit(&session, FormValue::Selection { index: Some(1) })
                        .expect("save edit");
                });
            }
        });

        let summary = store.summary(attempt_id).expect("summary");
        assert_eq!(summary.total_percentage, 100);
    }
}
