///! Stand-in used when no data service credentials are configured.
///! Nothing is stored; the survey still completes and the deck falls back
///! to the bundled card list.
use super::{Persistence, PersistenceError};
use crate::domain::models::{Card, NewParticipant, ParticipantId, SwipeRecord};
use async_trait::async_trait;

pub const OFFLINE_PARTICIPANT: &str = "local-test";

#[derive(Clone, Default)]
pub struct OfflinePersistence;

#[async_trait]
impl Persistence for OfflinePersistence {
    async fn insert_participant(
        &self,
        record: &NewParticipant,
    ) -> Result<ParticipantId, PersistenceError> {
        tracing::debug!(
            "Offline mode: dropping participant record with {} goals",
            record.goals.len()
        );
        Ok(ParticipantId::from(OFFLINE_PARTICIPANT))
    }

    async fn list_cards(&self, _limit: usize) -> Result<Vec<Card>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn insert_swipe(&self, record: &SwipeRecord) -> Result<(), PersistenceError> {
        tracing::debug!(
            "Offline mode: dropping swipe {} on {}",
            record.choice,
            record.design_id
        );
        Ok(())
    }
}
