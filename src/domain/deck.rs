use crate::domain::models::{Card, Direction, ParticipantId, SwipeRecord};
use crate::domain::questionnaire::{ChoiceLabels, DeckSettings, MAX_FEEDBACK_MS};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("card {given} is not the card on top of the deck")]
    StaleCard { given: String },
    #[error("deck is finished")]
    Finished,
}

/// Short-lived swipe feedback. `token` is the gesture timestamp so a client
/// can tell consecutive identical choices apart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Feedback {
    pub choice: String,
    pub direction: Direction,
    pub token: i64,
    #[serde(skip)]
    expires_at: DateTime<Utc>,
}

pub struct SwipeDeck {
    participant: ParticipantId,
    original: Vec<Card>,
    queue: VecDeque<Card>,
    choices: ChoiceLabels,
    feedback_ttl: Duration,
    feedback: Option<Feedback>,
}

impl SwipeDeck {
    /// `cards` must already be in presentation order.
    pub fn new(participant: ParticipantId, cards: Vec<Card>, settings: &DeckSettings) -> Self {
        Self {
            participant,
            queue: cards.iter().cloned().collect(),
            original: cards,
            choices: settings.choices.clone(),
            feedback_ttl: Duration::milliseconds(settings.feedback_ms.min(MAX_FEEDBACK_MS) as i64),
            feedback: None,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn current(&self) -> Option<&Card> {
        self.queue.front()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn total(&self) -> usize {
        self.original.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Applies one gesture to the top card.
    ///
    /// Returns the swipe to record, or `None` for gestures the deck does not
    /// map to a choice. Recording is the caller's job and must never feed
    /// back into the queue.
    pub fn handle_gesture(
        &mut self,
        direction: &str,
        card_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<SwipeRecord>, DeckError> {
        let Some(current) = self.queue.front() else {
            return Err(DeckError::Finished);
        };
        if let Some(given) = card_id {
            if given != current.id {
                return Err(DeckError::StaleCard {
                    given: given.to_string(),
                });
            }
        }

        let Some(direction) = Direction::parse(direction) else {
            return Ok(None);
        };
        let Some(choice) = self.choices.label_for(direction).map(str::to_string) else {
            return Ok(None);
        };

        self.feedback = Some(Feedback {
            choice: choice.clone(),
            direction,
            token: now.timestamp_millis(),
            expires_at: now.checked_add_signed(self.feedback_ttl).unwrap_or(now),
        });

        let Some(card) = self.queue.pop_front() else {
            return Err(DeckError::Finished);
        };
        let design_id = card.id.clone();
        if direction.requeues() {
            self.queue.push_back(card);
        }

        Ok(Some(SwipeRecord {
            participant_id: self.participant.clone(),
            design_id,
            choice,
        }))
    }

    /// Feedback still visible at `now`; expired feedback is dropped.
    pub fn feedback(&mut self, now: DateTime<Utc>) -> Option<&Feedback> {
        if self.feedback.as_ref().is_some_and(|f| now >= f.expires_at) {
            self.feedback = None;
        }
        self.feedback.as_ref()
    }

    /// "Play again": back to the original composition and order.
    pub fn restart(&mut self) {
        self.queue = self.original.iter().cloned().collect();
        self.feedback = None;
    }
}
