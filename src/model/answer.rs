use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::types::{QuestionType, TfNgValue};

/// Canonical stored form of one student answer. Raw submissions are folded
/// into this shape by the normalizer and everything downstream matches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StudentAnswer {
    Unanswered,
    Bool { value: bool },
    TfNg { value: TfNgValue },
    Choice { index: usize },
    Choices { indices: Vec<usize> },
    Order { positions: Vec<usize> },
    Text { value: String },
    Blanks { entries: BTreeMap<String, String> },
    Recording { audio_url: String, duration_sec: Option<u32> },
}

impl StudentAnswer {
    /// The sentinel a malformed or missing submission degrades to. Map and
    /// list types keep their empty container so review stays shape-stable.
    pub fn unanswered_for(qtype: QuestionType) -> Self {
        match qtype {
            QuestionType::McqMulti => Self::Choices { indices: Vec::new() },
            QuestionType::OrderSentence => Self::Order { positions: Vec::new() },
            QuestionType::DndGap | QuestionType::FillInBlank => {
                Self::Blanks { entries: BTreeMap::new() }
            }
            _ => Self::Unanswered,
        }
    }

    /// True when there is nothing gradable or displayable in the answer.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Unanswered => true,
            Self::Bool { .. } | Self::TfNg { .. } | Self::Choice { .. } => false,
            Self::Choices { indices } => indices.is_empty(),
            Self::Order { positions } => positions.is_empty(),
            Self::Text { value } => value.trim().is_empty(),
            Self::Blanks { entries } => entries.values().all(|value| value.trim().is_empty()),
            Self::Recording { audio_url, .. } => audio_url.is_empty(),
        }
    }

    /// Projects the canonical form back to the loose wire shape the platform
    /// exchanges with clients: bare index, bare string, plain map.
    pub fn as_raw(&self) -> Value {
        match self {
            Self::Unanswered => Value::Null,
            Self::Bool { value } => json!(value),
            Self::TfNg { value } => json!(value),
            Self::Choice { index } => json!(index),
            Self::Choices { indices } => json!(indices),
            Self::Order { positions } => json!(positions),
            Self::Text { value } => json!(value),
            Self::Blanks { entries } => json!(entries),
            Self::Recording { audio_url, duration_sec } => {
                json!({ "audioUrl": audio_url, "durationSec": duration_sec })
            }
        }
    }
}

/// Sort key for blank identifiers. Keys are either a bare sentence index
/// ("3") or sentence and part ("3-1"); document order is numeric on both
/// components, so "10-0" sorts after "2-1".
pub fn blank_key_order(key: &str) -> (u64, u64) {
    let mut parts = key.splitn(2, '-');
    let sentence =
        parts.next().and_then(|part| part.trim().parse::<u64>().ok()).unwrap_or(u64::MAX);
    let part = parts.next().and_then(|part| part.trim().parse::<u64>().ok()).unwrap_or(0);
    (sentence, part)
}

/// Blank entries in document order rather than the map's lexicographic order.
pub fn ordered_blank_entries(entries: &BTreeMap<String, String>) -> Vec<(&String, &String)> {
    let mut ordered: Vec<(&String, &String)> = entries.iter().collect();
    ordered.sort_by_key(|(key, _)| blank_key_order(key));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_sort_numerically() {
        assert!(blank_key_order("2-1") < blank_key_order("10-0"));
        assert!(blank_key_order("2") < blank_key_order("2-1"));
        assert!(blank_key_order("0") < blank_key_order("1"));
    }

    #[test]
    fn malformed_blank_key_sorts_last() {
        assert!(blank_key_order("banana") > blank_key_order("99-99"));
    }

    #[test]
    fn ordered_entries_follow_document_order() {
        let mut entries = BTreeMap::new();
        entries.insert("10-0".to_string(), "c".to_string());
        entries.insert("2-1".to_string(), "b".to_string());
        entries.insert("2-0".to_string(), "a".to_string());

        let ordered: Vec<&str> =
            ordered_blank_entries(&entries).into_iter().map(|(_, value)| value.as_str()).collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn unanswered_sentinels_keep_container_shape() {
        assert_eq!(
            StudentAnswer::unanswered_for(QuestionType::FillInBlank),
            StudentAnswer::Blanks { entries: BTreeMap::new() }
        );
        assert_eq!(
            StudentAnswer::unanswered_for(QuestionType::McqMulti),
            StudentAnswer::Choices { indices: Vec::new() }
        );
        assert_eq!(StudentAnswer::unanswered_for(QuestionType::Tf), StudentAnswer::Unanswered);
    }

    #[test]
    fn blank_detection() {
        assert!(StudentAnswer::Unanswered.is_blank());
        assert!(StudentAnswer::Text { value: "   ".to_string() }.is_blank());
        assert!(!StudentAnswer::Choice { index: 0 }.is_blank());

        let mut entries = BTreeMap::new();
        entries.insert("0".to_string(), String::new());
        assert!(StudentAnswer::Blanks { entries: entries.clone() }.is_blank());
        entries.insert("1".to_string(), "ninety".to_string());
        assert!(!StudentAnswer::Blanks { entries }.is_blank());
    }

    #[test]
    fn raw_projection_uses_wire_shapes() {
        assert_eq!(StudentAnswer::Choice { index: 2 }.as_raw(), json!(2));
        assert_eq!(StudentAnswer::Text { value: "Paris".to_string() }.as_raw(), json!("Paris"));
        assert_eq!(StudentAnswer::Unanswered.as_raw(), Value::Null);
        assert_eq!(
            StudentAnswer::TfNg { value: TfNgValue::NotGiven }.as_raw(),
            json!("NOT_GIVEN")
        );
    }
}
