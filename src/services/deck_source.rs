///! Deck sourcing: remote designs when available, bundled index otherwise.
///! Runs once per deck, before any gesture is handled.
use crate::db::Persistence;
use crate::domain::models::Card;
use crate::domain::questionnaire::DeckSettings;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

/// Reads the bundled card index. A missing or malformed file leaves the
/// fallback empty; the deck then simply finishes immediately.
pub fn load_fallback_index(path: &Path) -> Vec<Card> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Failed to read fallback designs {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Card>>(&raw) {
        Ok(cards) => {
            tracing::info!("Loaded {} fallback designs from {}", cards.len(), path.display());
            cards
        }
        Err(e) => {
            tracing::warn!("Failed to parse fallback designs {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Picks the card source, resolves image references against the deck's
/// image base and shuffles the cards into presentation order.
pub async fn source_cards<R: Rng + ?Sized>(
    persistence: &dyn Persistence,
    fallback: &[Card],
    settings: &DeckSettings,
    limit: usize,
    rng: &mut R,
) -> Vec<Card> {
    let mut cards = match persistence.list_cards(limit).await {
        Ok(remote) if !remote.is_empty() => {
            tracing::debug!("Using {} remote designs", remote.len());
            remote
        }
        Ok(_) => {
            tracing::info!("No remote designs, using {} bundled ones", fallback.len());
            fallback.to_vec()
        }
        Err(e) => {
            tracing::warn!("Failed to load remote designs, using bundled ones: {}", e);
            fallback.to_vec()
        }
    };
    for card in &mut cards {
        card.image_url = settings.image_url(&card.image_url);
    }
    cards.shuffle(rng);
    cards
}
