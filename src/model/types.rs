use serde::{Deserialize, Serialize};

/// Every question type the platform knows how to store, grade and render.
/// Consumers match on this exhaustively, so adding a variant forces every
/// per-type code path to be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    McqSingle,
    McqMulti,
    Tf,
    TfNg,
    Select,
    InlineSelect,
    OrderSentence,
    DndGap,
    ShortText,
    Essay,
    FillInBlank,
    SpeakingRecording,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::McqSingle => "MCQ_SINGLE",
            Self::McqMulti => "MCQ_MULTI",
            Self::Tf => "TF",
            Self::TfNg => "TF_NG",
            Self::Select => "SELECT",
            Self::InlineSelect => "INLINE_SELECT",
            Self::OrderSentence => "ORDER_SENTENCE",
            Self::DndGap => "DND_GAP",
            Self::ShortText => "SHORT_TEXT",
            Self::Essay => "ESSAY",
            Self::FillInBlank => "FILL_IN_BLANK",
            Self::SpeakingRecording => "SPEAKING_RECORDING",
        }
    }

    /// Types that carry no auto-gradable key and wait for a human score.
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Essay | Self::SpeakingRecording)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TfNgValue {
    True,
    False,
    NotGiven,
}

impl TfNgValue {
    /// Accepts the wire tag in any case, the spaced "NOT GIVEN" form included.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            "NOT_GIVEN" | "NOT GIVEN" => Some(Self::NotGiven),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::NotGiven => "Not Given",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillArea {
    Listening,
    Reading,
    Writing,
    Speaking,
}
