use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use crate::model::attempt::Attempt;
use crate::model::question::{
    AnswerKey, Exam, KeyAlternatives, PartSpan, Prompt, Question, QuestionOptions, Section,
};
use crate::model::types::{QuestionType, SkillArea, TfNgValue};

pub(crate) fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(crate) fn question(
    qtype: QuestionType,
    answer_key: Option<AnswerKey>,
    max_score: u32,
) -> Question {
    Question {
        id: Uuid::new_v4(),
        qtype,
        prompt: Prompt::from_text("Prompt text"),
        options: QuestionOptions::default(),
        answer_key,
        max_score,
    }
}

pub(crate) fn with_choices(mut question: Question, choices: &[&str]) -> Question {
    question.options.choices = to_strings(choices);
    question
}

pub(crate) fn with_prompt(mut question: Question, text: &str) -> Question {
    question.prompt = Prompt::from_text(text);
    question
}

pub(crate) fn mcq_single(choices: &[&str], key: usize) -> Question {
    let base = question(QuestionType::McqSingle, Some(AnswerKey::Choice { index: key }), 1);
    with_choices(base, choices)
}

pub(crate) fn mcq_multi(choices: &[&str], key: &[usize]) -> Question {
    let base =
        question(QuestionType::McqMulti, Some(AnswerKey::Choices { indices: key.to_vec() }), 1);
    with_choices(base, choices)
}

pub(crate) fn tf(key: bool) -> Question {
    question(QuestionType::Tf, Some(AnswerKey::Boolean { value: key }), 1)
}

pub(crate) fn tf_ng(key: TfNgValue) -> Question {
    question(QuestionType::TfNg, Some(AnswerKey::TfNg { value: key }), 1)
}

pub(crate) fn short_text(accepted: &[&str]) -> Question {
    question(QuestionType::ShortText, Some(AnswerKey::Text { answers: to_strings(accepted) }), 1)
}

pub(crate) fn one(value: &str) -> KeyAlternatives {
    KeyAlternatives::One(value.to_string())
}

pub(crate) fn many(values: &[&str]) -> KeyAlternatives {
    KeyAlternatives::Many(to_strings(values))
}

/// Fill-in-blank worth one point per blank, the authored invariant.
pub(crate) fn fill_in_blank(
    text: &str,
    answers: Vec<KeyAlternatives>,
    case_sensitive: bool,
) -> Question {
    let max_score = answers.len() as u32;
    let key = AnswerKey::Blanks { answers, case_sensitive };
    with_prompt(question(QuestionType::FillInBlank, Some(key), max_score), text)
}

pub(crate) fn dnd_gap(text: &str, bank: &[&str], blanks: &[&str]) -> Question {
    let key = AnswerKey::Gaps { blanks: to_strings(blanks) };
    let mut question = with_prompt(question(QuestionType::DndGap, Some(key), 1), text);
    question.options.bank = to_strings(bank);
    question
}

pub(crate) fn order_sentence(tokens: &[&str], key: &[usize]) -> Question {
    let base =
        question(QuestionType::OrderSentence, Some(AnswerKey::Order { order: key.to_vec() }), 1);
    with_choices(base, tokens)
}

pub(crate) fn essay(max_score: u32) -> Question {
    question(QuestionType::Essay, None, max_score)
}

pub(crate) fn speaking(max_score: u32) -> Question {
    question(QuestionType::SpeakingRecording, None, max_score)
}

pub(crate) fn section(skill: SkillArea, questions: Vec<Question>) -> Section {
    Section {
        id: Uuid::new_v4(),
        title: format!("{skill:?}"),
        skill,
        parts: Vec::new(),
        audio_url: None,
        questions,
    }
}

pub(crate) fn listening_section(spans: &[usize], questions: Vec<Question>) -> Section {
    let mut section = section(SkillArea::Listening, questions);
    section.parts = spans
        .iter()
        .enumerate()
        .map(|(index, count)| PartSpan {
            label: format!("Part {}", index + 1),
            question_count: *count,
        })
        .collect();
    section
}

pub(crate) fn exam(sections: Vec<Section>) -> Exam {
    Exam { id: Uuid::new_v4(), title: "Mock exam".to_string(), sections }
}

pub(crate) fn exam_of(questions: Vec<Question>) -> Exam {
    exam(vec![section(SkillArea::Reading, questions)])
}

/// An attempt past submission with the given raw answers recorded through
/// the normal intake path.
pub(crate) fn submitted_attempt(exam: &Exam, answers: &[(Uuid, Value)]) -> Attempt {
    let mut attempt = Attempt::new(exam.id, Uuid::new_v4());
    for (question_id, raw) in answers {
        let (_, question) = exam.question_by_id(*question_id).expect("question in exam");
        attempt.record_answer(question, raw).expect("record answer");
    }
    attempt.submit().expect("submit attempt");
    attempt
}

pub(crate) fn blank_entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
}
