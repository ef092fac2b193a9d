use super::{Persistence, PersistenceError};
use crate::domain::models::{Card, NewParticipant, ParticipantId, SwipeRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory data service for tests.
#[derive(Default)]
pub struct FakePersistence {
    pub participants: Mutex<Vec<NewParticipant>>,
    pub swipes: Mutex<Vec<SwipeRecord>>,
    pub cards: Vec<Card>,
    pub fail_participants: AtomicBool,
    pub fail_cards: bool,
    pub fail_swipes: bool,
}

impl FakePersistence {
    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            ..Default::default()
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.lock().unwrap().len()
    }

    pub fn swipe_count(&self) -> usize {
        self.swipes.lock().unwrap().len()
    }

    pub fn set_participant_failure(&self, fail: bool) {
        self.fail_participants.store(fail, Ordering::SeqCst);
    }
}

pub fn card(id: &str) -> Card {
    Card {
        id: id.to_string(),
        image_url: format!("/designs/{id}.png"),
        label: None,
    }
}

#[async_trait]
impl Persistence for FakePersistence {
    async fn insert_participant(
        &self,
        record: &NewParticipant,
    ) -> Result<ParticipantId, PersistenceError> {
        if self.fail_participants.load(Ordering::SeqCst) {
            return Err(PersistenceError::Service("insert rejected".to_string()));
        }
        let mut participants = self.participants.lock().unwrap();
        participants.push(record.clone());
        Ok(ParticipantId(format!("participant-{}", participants.len())))
    }

    async fn list_cards(&self, limit: usize) -> Result<Vec<Card>, PersistenceError> {
        if self.fail_cards {
            return Err(PersistenceError::Service("designs unavailable".to_string()));
        }
        Ok(self.cards.iter().take(limit).cloned().collect())
    }

    async fn insert_swipe(&self, record: &SwipeRecord) -> Result<(), PersistenceError> {
        if self.fail_swipes {
            return Err(PersistenceError::Service("swipes unavailable".to_string()));
        }
        self.swipes.lock().unwrap().push(record.clone());
        Ok(())
    }
}
