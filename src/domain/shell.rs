use crate::domain::deck::SwipeDeck;
use crate::domain::models::ParticipantId;
use crate::domain::questionnaire::SurveyDocument;
use crate::domain::survey::SurveyEngine;
use std::sync::Arc;

pub enum Stage {
    Survey(SurveyEngine),
    /// The deck is sourced lazily, once, after the participant exists.
    Game {
        participant: ParticipantId,
        deck: Option<SwipeDeck>,
    },
}

/// Per-visitor state machine: survey first, then the swipe deck.
pub struct AppShell {
    stage: Stage,
}

impl AppShell {
    /// `prior` is the participant id found by the session loader; a
    /// returning visitor goes straight to the game.
    pub fn resume(document: Arc<SurveyDocument>, prior: Option<ParticipantId>) -> Self {
        let stage = match prior {
            Some(participant) => Stage::Game {
                participant,
                deck: None,
            },
            None => Stage::Survey(SurveyEngine::new(document)),
        };
        Self { stage }
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn survey_mut(&mut self) -> Option<&mut SurveyEngine> {
        match &mut self.stage {
            Stage::Survey(engine) => Some(engine),
            Stage::Game { .. } => None,
        }
    }

    pub fn participant(&self) -> Option<&ParticipantId> {
        match &self.stage {
            Stage::Survey(_) => None,
            Stage::Game { participant, .. } => Some(participant),
        }
    }

    /// Survey completion contract. Only called with the id returned by a
    /// successful insert.
    pub fn complete(&mut self, participant: ParticipantId) {
        if let Stage::Game { .. } = self.stage {
            tracing::warn!("Ignoring survey completion for {} on a finished survey", participant);
            return;
        }
        self.stage = Stage::Game {
            participant,
            deck: None,
        };
    }

    /// Participant whose deck still has to be sourced.
    pub fn awaiting_deck(&self) -> Option<&ParticipantId> {
        match &self.stage {
            Stage::Game {
                participant,
                deck: None,
            } => Some(participant),
            _ => None,
        }
    }

    pub fn install_deck(&mut self, new_deck: SwipeDeck) {
        if let Stage::Game { deck, .. } = &mut self.stage {
            if deck.is_none() {
                *deck = Some(new_deck);
            }
        }
    }

    pub fn deck_mut(&mut self) -> Option<&mut SwipeDeck> {
        match &mut self.stage {
            Stage::Game { deck, .. } => deck.as_mut(),
            Stage::Survey(_) => None,
        }
    }
}
