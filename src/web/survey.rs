use crate::domain::answers::AnswerInput;
use crate::domain::shell::AppShell;
use crate::domain::survey::Advance;
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::{SessionClaims, Visitor};
use crate::web::view::{render, SessionView};
use crate::web::{ensure_deck, respond, visitor_shell};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/session", get(session))
        .route("/survey/answer", post(answer))
        .route("/survey/next", post(next))
        .with_state(state)
}

#[derive(Deserialize)]
struct AnswerPayload {
    question_id: String,
    #[serde(flatten)]
    input: AnswerInput,
}

async fn session(
    visitor: Visitor,
    State(state): State<SharedState>,
) -> (HeaderMap, Json<SessionView>) {
    // Without a cookie there is nothing to resume; the shell is kept from
    // the visitor's first write on.
    if visitor.fresh {
        let mut shell = AppShell::resume(state.document.clone(), None);
        let view = render(&mut shell, Utc::now());
        return respond(&state, &visitor, None, view);
    }

    let shell = visitor_shell(&state, &visitor).await;
    ensure_deck(&state, &shell).await;
    let view = render(&mut *shell.lock().await, Utc::now());
    respond(&state, &visitor, None, view)
}

async fn answer(
    visitor: Visitor,
    State(state): State<SharedState>,
    Json(payload): Json<AnswerPayload>,
) -> Result<(HeaderMap, Json<SessionView>), AppError> {
    let shell = visitor_shell(&state, &visitor).await;
    let mut guard = shell.lock().await;
    let survey = guard.survey_mut().ok_or(AppError::WrongStage("game"))?;
    survey.record_answer(&payload.question_id, payload.input)?;
    let view = render(&mut guard, Utc::now());
    Ok(respond(&state, &visitor, None, view))
}

async fn next(
    visitor: Visitor,
    State(state): State<SharedState>,
) -> Result<(HeaderMap, Json<SessionView>), AppError> {
    let shell = visitor_shell(&state, &visitor).await;

    let record = {
        let mut guard = shell.lock().await;
        let survey = guard.survey_mut().ok_or(AppError::WrongStage("game"))?;
        if survey.is_last() && survey.current_complete() && !survey.is_loading() {
            if !state.admit_submission(visitor.id()).await {
                return Err(AppError::RateLimited);
            }
        }
        match survey.advance()? {
            Advance::Next(index) => {
                tracing::debug!("Visitor {} moved to question {}", visitor.id(), index + 1);
                None
            }
            Advance::Submit(record) => Some(record),
        }
    };

    let mut issued = None;
    if let Some(record) = record {
        // Shell lock is released here; the loading flag blocks duplicates.
        let result = state.persistence.insert_participant(&record).await;
        if let Err(e) = &result {
            tracing::error!("Failed to insert participant for visitor {}: {}", visitor.id(), e);
        }

        let completed = {
            let mut guard = shell.lock().await;
            let id = guard
                .survey_mut()
                .and_then(|survey| survey.finish_submission(result));
            if let Some(id) = &id {
                guard.complete(id.clone());
            }
            id
        };

        if let Some(participant) = completed {
            tracing::info!(
                "Participant {} created (opt-in: {}, {} goals)",
                participant,
                record.marketing_opt_in,
                record.goals.len()
            );
            issued = Some(SessionClaims {
                visitor_id: visitor.id(),
                participant: Some(participant),
            });
            ensure_deck(&state, &shell).await;
        }
    }

    let view = render(&mut *shell.lock().await, Utc::now());
    Ok(respond(&state, &visitor, issued, view))
}
