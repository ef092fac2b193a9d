use crate::error::AppError;
use crate::services::swipe_recorder;
use crate::state::SharedState;
use crate::web::session::Visitor;
use crate::web::view::{render, SessionView};
use crate::web::{ensure_deck, respond, visitor_shell};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use chrono::Utc;
use serde::Deserialize;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/game/swipe", post(swipe))
        .route("/game/restart", post(restart))
        .with_state(state)
}

#[derive(Deserialize)]
struct SwipePayload {
    direction: String,
    #[serde(default)]
    card_id: Option<String>,
}

async fn swipe(
    visitor: Visitor,
    State(state): State<SharedState>,
    Json(payload): Json<SwipePayload>,
) -> Result<(HeaderMap, Json<SessionView>), AppError> {
    let shell = visitor_shell(&state, &visitor).await;
    ensure_deck(&state, &shell).await;

    let now = Utc::now();
    let mut guard = shell.lock().await;
    // No swipe can be recorded before the participant exists.
    if guard.participant().is_none() {
        return Err(AppError::WrongStage("survey"));
    }
    let deck = guard.deck_mut().ok_or(AppError::WrongStage("survey"))?;
    match deck.handle_gesture(&payload.direction, payload.card_id.as_deref(), now)? {
        Some(record) => {
            swipe_recorder::record_in_background(state.persistence.clone(), record);
        }
        None => tracing::debug!("Ignoring unmapped gesture {:?}", payload.direction),
    }

    let view = render(&mut guard, now);
    Ok(respond(&state, &visitor, None, view))
}

async fn restart(
    visitor: Visitor,
    State(state): State<SharedState>,
) -> Result<(HeaderMap, Json<SessionView>), AppError> {
    let shell = visitor_shell(&state, &visitor).await;
    ensure_deck(&state, &shell).await;

    let mut guard = shell.lock().await;
    let deck = guard.deck_mut().ok_or(AppError::WrongStage("survey"))?;
    deck.restart();
    tracing::debug!("Participant {} restarted the deck", deck.participant());

    let view = render(&mut guard, Utc::now());
    Ok(respond(&state, &visitor, None, view))
}
