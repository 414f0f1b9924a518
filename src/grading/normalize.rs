use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::answer::StudentAnswer;
use crate::model::question::QuestionOptions;
use crate::model::types::{QuestionType, TfNgValue};

/// Folds a raw client submission into the canonical per-type answer shape.
/// Never fails: anything that cannot be read as an answer of the question's
/// type degrades to the type's unanswered sentinel.
pub fn normalize(qtype: QuestionType, raw: &Value, options: &QuestionOptions) -> StudentAnswer {
    if raw.is_null() {
        return StudentAnswer::unanswered_for(qtype);
    }

    let normalized = match qtype {
        QuestionType::Tf => normalize_bool(raw),
        QuestionType::TfNg => normalize_tf_ng(raw),
        QuestionType::McqSingle | QuestionType::Select | QuestionType::InlineSelect => {
            normalize_choice(raw, options)
        }
        QuestionType::McqMulti => normalize_multi_choice(raw, options),
        QuestionType::OrderSentence => normalize_order(raw),
        QuestionType::DndGap | QuestionType::FillInBlank => normalize_blank_map(raw),
        QuestionType::ShortText | QuestionType::Essay => normalize_text(raw),
        QuestionType::SpeakingRecording => normalize_recording(raw),
    };

    match normalized {
        Some(answer) => answer,
        None => {
            tracing::warn!(
                qtype = qtype.as_str(),
                "Raw answer did not match any accepted shape; storing as unanswered"
            );
            StudentAnswer::unanswered_for(qtype)
        }
    }
}

fn normalize_bool(raw: &Value) -> Option<StudentAnswer> {
    if let Some(value) = raw.as_bool() {
        return Some(StudentAnswer::Bool { value });
    }
    match raw.as_str()?.trim().to_lowercase().as_str() {
        "true" => Some(StudentAnswer::Bool { value: true }),
        "false" => Some(StudentAnswer::Bool { value: false }),
        _ => None,
    }
}

fn normalize_tf_ng(raw: &Value) -> Option<StudentAnswer> {
    if let Some(value) = raw.as_bool() {
        let value = if value { TfNgValue::True } else { TfNgValue::False };
        return Some(StudentAnswer::TfNg { value });
    }
    let value = TfNgValue::from_raw(raw.as_str()?)?;
    Some(StudentAnswer::TfNg { value })
}

fn normalize_choice(raw: &Value, options: &QuestionOptions) -> Option<StudentAnswer> {
    let index = resolve_choice(raw, options)?;
    Some(StudentAnswer::Choice { index })
}

fn normalize_multi_choice(raw: &Value, options: &QuestionOptions) -> Option<StudentAnswer> {
    let items = raw.as_array()?;
    let mut indices = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match resolve_choice(item, options) {
            Some(index) => indices.push(index),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, "Dropping unresolvable selections from a multi-choice answer");
    }
    indices.sort_unstable();
    indices.dedup();
    Some(StudentAnswer::Choices { indices })
}

/// Selections arrive either as an index or as the choice's display text.
/// Text resolves to the first exactly matching choice. Indexes pass through
/// unchecked; grading treats an out-of-range index as plain incorrect.
fn resolve_choice(raw: &Value, options: &QuestionOptions) -> Option<usize> {
    if let Some(index) = as_index(raw) {
        return Some(index);
    }
    let text = raw.as_str()?;
    options.choices.iter().position(|choice| choice == text)
}

fn as_index(raw: &Value) -> Option<usize> {
    if let Some(index) = raw.as_u64() {
        return usize::try_from(index).ok();
    }
    match raw.as_f64() {
        Some(value) if value >= 0.0 && value.fract() == 0.0 => Some(value as usize),
        _ => None,
    }
}

fn normalize_order(raw: &Value) -> Option<StudentAnswer> {
    let positions = raw.as_array()?.iter().map(as_index).collect::<Option<Vec<_>>>()?;
    Some(StudentAnswer::Order { positions })
}

fn normalize_blank_map(raw: &Value) -> Option<StudentAnswer> {
    let fields = raw.as_object()?;
    let mut entries = BTreeMap::new();
    for (key, value) in fields {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => continue,
        };
        entries.insert(key.trim().to_string(), text);
    }
    Some(StudentAnswer::Blanks { entries })
}

fn normalize_text(raw: &Value) -> Option<StudentAnswer> {
    if raw.is_number() {
        return Some(StudentAnswer::Text { value: raw.to_string() });
    }
    let text = raw.as_str()?;
    if text.trim().is_empty() {
        return Some(StudentAnswer::Unanswered);
    }
    // Stored verbatim; trimming happens at comparison and display time only.
    Some(StudentAnswer::Text { value: text.to_string() })
}

fn normalize_recording(raw: &Value) -> Option<StudentAnswer> {
    if let Some(url) = raw.as_str() {
        if url.is_empty() {
            return Some(StudentAnswer::Unanswered);
        }
        return Some(StudentAnswer::Recording { audio_url: url.to_string(), duration_sec: None });
    }

    let fields = raw.as_object()?;
    let audio_url = fields
        .get("audioUrl")
        .or_else(|| fields.get("audio_url"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if audio_url.is_empty() {
        return Some(StudentAnswer::Unanswered);
    }
    let duration_sec = fields
        .get("durationSec")
        .or_else(|| fields.get("duration_sec"))
        .and_then(Value::as_u64)
        .and_then(|seconds| u32::try_from(seconds).ok());
    Some(StudentAnswer::Recording { audio_url: audio_url.to_string(), duration_sec })
}
