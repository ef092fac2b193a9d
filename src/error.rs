use crate::domain::deck::DeckError;
use crate::domain::survey::SurveyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Survey(#[from] SurveyError),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error("not available during the {0} step")]
    WrongStage(&'static str),
    #[error("too many submissions, try again shortly")]
    RateLimited,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Survey(err) => match err {
                SurveyError::UnknownQuestion(_)
                | SurveyError::UnknownOption { .. }
                | SurveyError::UnknownField { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "unknown_target"),
                SurveyError::WrongInput { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "wrong_input"),
                SurveyError::TooLong { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "too_long"),
                SurveyError::GateClosed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "gate_closed"),
                SurveyError::Incomplete(_) => (StatusCode::UNPROCESSABLE_ENTITY, "incomplete"),
                SurveyError::NotCurrent(_) => (StatusCode::CONFLICT, "not_current"),
                SurveyError::SubmissionInFlight => (StatusCode::CONFLICT, "submission_in_flight"),
                SurveyError::AlreadySubmitted => (StatusCode::CONFLICT, "already_submitted"),
            },
            AppError::Deck(DeckError::StaleCard { .. }) => (StatusCode::CONFLICT, "stale_card"),
            AppError::Deck(DeckError::Finished) => (StatusCode::CONFLICT, "deck_finished"),
            AppError::WrongStage(_) => (StatusCode::CONFLICT, "wrong_step"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        let body = Json(ErrorResponse {
            error,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let (status, code) = AppError::from(SurveyError::SubmissionInFlight).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "submission_in_flight");

        let (status, _) = AppError::from(SurveyError::Incomplete("Q1".into())).status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, code) = AppError::RateLimited.status_and_code();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(code, "rate_limited");
    }
}
