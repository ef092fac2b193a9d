use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned participant identifier. The only piece of survey state
/// kept after submission; every swipe record is joined on it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Consolidated survey submission, inserted once per completed survey.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewParticipant {
    pub email: Option<String>,
    pub goals: Vec<String>,
    pub marketing_opt_in: bool,
}

/// A rateable design shown in the swipe deck.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One completed gesture. Append-only on the data service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwipeRecord {
    pub participant_id: ParticipantId,
    pub design_id: String,
    pub choice: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unknown gestures map to `None` and are ignored by the deck.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }

    /// The "unsure" gesture puts the card back at the tail of the queue.
    pub fn requeues(&self) -> bool {
        matches!(self, Direction::Down)
    }
}
