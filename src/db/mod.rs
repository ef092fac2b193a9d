pub mod offline;
pub mod supabase;

#[cfg(test)]
pub mod fake;

use crate::domain::models::{Card, NewParticipant, ParticipantId, SwipeRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Error reported by the data service; the message is shown to users as-is.
    #[error("{0}")]
    Service(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The three operations the survey and deck depend on.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn insert_participant(
        &self,
        record: &NewParticipant,
    ) -> Result<ParticipantId, PersistenceError>;

    async fn list_cards(&self, limit: usize) -> Result<Vec<Card>, PersistenceError>;

    async fn insert_swipe(&self, record: &SwipeRecord) -> Result<(), PersistenceError>;
}

pub type SharedPersistence = Arc<dyn Persistence>;
