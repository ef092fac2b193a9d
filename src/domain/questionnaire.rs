///! Static survey document: question definitions, UI copy and deck settings.
///! Loaded once at startup and shared read-only between visitors.
use crate::domain::models::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Gate option id that unlocks the follow-up fields.
pub const GATE_YES: &str = "yes";

/// Key of the join decision in a gate answer; follow-ups cannot reuse it.
pub const GATE_JOIN_KEY: &str = "join";

/// Longest swipe feedback display a document may ask for.
pub const MAX_FEEDBACK_MS: u64 = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read survey document {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid survey document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("survey document declares no questions")]
    NoQuestions,
    #[error("duplicate question id {0}")]
    DuplicateQuestion(String),
    #[error("question {question} repeats option id {option}")]
    DuplicateOption { question: String, option: String },
    #[error("question {question} names exclusive option {option} that is not one of its options")]
    UnknownExclusive { question: String, option: String },
    #[error("question {0} must rank at least one option")]
    InvalidRank(String),
    #[error("gate question {0} has no \"yes\" option")]
    GateWithoutYes(String),
    #[error("gate question {question} uses reserved follow-up id {field}")]
    ReservedFollowUp { question: String, field: String },
    #[error("feedback_ms {0} is above the {max} ms limit", max = MAX_FEEDBACK_MS)]
    FeedbackTooLong(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDocument {
    pub survey: SurveySection,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub deck: DeckSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveySection {
    #[serde(default)]
    pub meta: SurveyMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub assets_base: String,
    #[serde(default = "default_end_cta")]
    pub end_cta: String,
}

impl Default for SurveyMeta {
    fn default() -> Self {
        Self {
            title: String::new(),
            assets_base: String::new(),
            end_cta: default_end_cta(),
        }
    }
}

fn default_end_cta() -> String {
    "Submit".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Closed set of question kinds, tagged by the document's `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleSelect {
        options: Vec<QuestionOption>,
    },
    MultiSelect {
        options: Vec<QuestionOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_select: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclusive_option_id: Option<String>,
    },
    ImageSelect {
        options: Vec<QuestionOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layout: Option<String>,
    },
    ShortTextOneWord {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_chars: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    RankTopN {
        options: Vec<QuestionOption>,
        n: usize,
    },
    GateOptIn {
        options: Vec<QuestionOption>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        follow_ups_if_yes: Vec<FollowUp>,
    },
}

impl QuestionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::SingleSelect { .. } => "single_select",
            QuestionKind::MultiSelect { .. } => "multi_select",
            QuestionKind::ImageSelect { .. } => "image_select",
            QuestionKind::ShortTextOneWord { .. } => "short_text_one_word",
            QuestionKind::RankTopN { .. } => "rank_top_n",
            QuestionKind::GateOptIn { .. } => "gate_opt_in",
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match self {
            QuestionKind::SingleSelect { options }
            | QuestionKind::MultiSelect { options, .. }
            | QuestionKind::ImageSelect { options, .. }
            | QuestionKind::RankTopN { options, .. }
            | QuestionKind::GateOptIn { options, .. } => options,
            QuestionKind::ShortTextOneWord { .. } => &[],
        }
    }
}

impl Question {
    pub fn has_option(&self, option_id: &str) -> bool {
        self.kind.options().iter().any(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<OptionImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionImage {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FollowUpKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpKind {
    Email,
    #[default]
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSettings {
    #[serde(default = "default_image_base")]
    pub image_base: String,
    #[serde(default = "default_fallback_index")]
    pub fallback_index: PathBuf,
    #[serde(default)]
    pub choices: ChoiceLabels,
    #[serde(default = "default_feedback_ms")]
    pub feedback_ms: u64,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            image_base: default_image_base(),
            fallback_index: default_fallback_index(),
            choices: ChoiceLabels::default(),
            feedback_ms: default_feedback_ms(),
        }
    }
}

fn default_image_base() -> String {
    "/designs/".to_string()
}

fn default_fallback_index() -> PathBuf {
    PathBuf::from("static/designs/index.json")
}

fn default_feedback_ms() -> u64 {
    700
}

/// Gesture → choice label. Left/right are mandatory, up/down optional
/// (a two-way deck simply ignores vertical swipes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceLabels {
    pub right: String,
    pub left: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

impl Default for ChoiceLabels {
    fn default() -> Self {
        Self {
            right: "like".to_string(),
            left: "pass".to_string(),
            up: Some("love".to_string()),
            down: Some("not_sure".to_string()),
        }
    }
}

impl DeckSettings {
    /// Card image references without a root or scheme live under `image_base`.
    pub fn image_url(&self, reference: &str) -> String {
        if reference.is_empty() || reference.starts_with('/') || reference.contains("://") {
            return reference.to_string();
        }
        if self.image_base.ends_with('/') {
            format!("{}{}", self.image_base, reference)
        } else {
            format!("{}/{}", self.image_base, reference)
        }
    }
}

impl ChoiceLabels {
    pub fn label_for(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Right => Some(self.right.as_str()),
            Direction::Left => Some(self.left.as_str()),
            Direction::Up => self.up.as_deref(),
            Direction::Down => self.down.as_deref(),
        }
    }
}

impl SurveyDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let doc: SurveyDocument = serde_json::from_str(raw)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions.is_empty() {
            return Err(ConfigError::NoQuestions);
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(ConfigError::DuplicateQuestion(question.id.clone()));
            }

            let mut option_ids = HashSet::new();
            for option in question.kind.options() {
                if !option_ids.insert(option.id.as_str()) {
                    return Err(ConfigError::DuplicateOption {
                        question: question.id.clone(),
                        option: option.id.clone(),
                    });
                }
            }

            match &question.kind {
                QuestionKind::MultiSelect {
                    exclusive_option_id: Some(exclusive),
                    ..
                } if !question.has_option(exclusive) => {
                    return Err(ConfigError::UnknownExclusive {
                        question: question.id.clone(),
                        option: exclusive.clone(),
                    });
                }
                QuestionKind::RankTopN { n: 0, .. } => {
                    return Err(ConfigError::InvalidRank(question.id.clone()));
                }
                QuestionKind::GateOptIn { .. } if !question.has_option(GATE_YES) => {
                    return Err(ConfigError::GateWithoutYes(question.id.clone()));
                }
                QuestionKind::GateOptIn {
                    follow_ups_if_yes, ..
                } => {
                    if let Some(field) = follow_ups_if_yes.iter().find(|f| f.id == GATE_JOIN_KEY) {
                        return Err(ConfigError::ReservedFollowUp {
                            question: question.id.clone(),
                            field: field.id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        if self.deck.feedback_ms > MAX_FEEDBACK_MS {
            return Err(ConfigError::FeedbackTooLong(self.deck.feedback_ms));
        }

        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Resolves an option image against the document's asset base.
    pub fn asset_url(&self, image: &OptionImage) -> String {
        format!("{}{}", self.survey.meta.assets_base, image.src)
    }
}
