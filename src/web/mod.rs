pub mod game;
pub mod session;
pub mod survey;
pub mod view;

use crate::domain::deck::SwipeDeck;
use crate::domain::shell::AppShell;
use crate::services::deck_source;
use crate::state::SharedState;
use axum::{
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use session::{SessionClaims, Visitor};
use std::sync::Arc;
use tokio::sync::Mutex;
use view::SessionView;

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api(state))
}

fn api(state: SharedState) -> Router {
    Router::new()
        .merge(survey::router(state.clone()))
        .merge(game::router(state))
}

/// Finds the visitor's shell, creating it on first sight. Creation is the
/// only place the cookie's participant id is consulted.
pub(crate) async fn visitor_shell(state: &SharedState, visitor: &Visitor) -> Arc<Mutex<AppShell>> {
    state
        .shell_for(visitor.id(), || {
            tracing::debug!(
                "New shell for visitor {} (returning participant: {})",
                visitor.id(),
                visitor.claims.participant.is_some()
            );
            AppShell::resume(state.document.clone(), visitor.claims.participant.clone())
        })
        .await
}

/// Sources and installs the deck for a game step that has none yet. The
/// shell lock is released while the data service is queried.
pub(crate) async fn ensure_deck(state: &SharedState, shell: &Mutex<AppShell>) {
    let participant = match shell.lock().await.awaiting_deck() {
        Some(participant) => participant.clone(),
        None => return,
    };

    let mut rng = StdRng::from_entropy();
    let cards = deck_source::source_cards(
        state.persistence.as_ref(),
        &state.fallback_cards,
        &state.document.deck,
        state.deck_limit,
        &mut rng,
    )
    .await;
    tracing::info!("Dealt {} designs to participant {}", cards.len(), participant);

    let deck = SwipeDeck::new(participant, cards, &state.document.deck);
    shell.lock().await.install_deck(deck);
}

/// Sets the session cookie when the visitor is new or the claims changed.
pub(crate) fn respond(
    state: &SharedState,
    visitor: &Visitor,
    issued: Option<SessionClaims>,
    view: SessionView,
) -> (HeaderMap, Json<SessionView>) {
    let mut headers = HeaderMap::new();
    let claims = match issued {
        Some(claims) => Some(claims),
        None if visitor.fresh => Some(visitor.claims.clone()),
        None => None,
    };
    if let Some(cookie) = claims.and_then(|c| session::session_cookie(&c, &state.session_key)) {
        headers.insert(header::SET_COOKIE, cookie);
    }
    (headers, Json(view))
}

#[cfg(test)]
mod tests;
