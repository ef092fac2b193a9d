use crate::domain::deck::Feedback;
use crate::domain::models::Card;
use crate::domain::questionnaire::Question;
use crate::domain::shell::{AppShell, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// What the client should render for the visitor right now.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SessionView {
    Survey {
        #[serde(skip_serializing_if = "String::is_empty")]
        title: String,
        index: usize,
        total: usize,
        question: Question,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        image_urls: BTreeMap<String, String>,
        answer: Option<Value>,
        complete: bool,
        loading: bool,
        error: Option<String>,
        cta: String,
    },
    Game {
        participant_id: String,
        card: Option<Card>,
        remaining: usize,
        total: usize,
        finished: bool,
        feedback: Option<Feedback>,
    },
}

pub fn render(shell: &mut AppShell, now: DateTime<Utc>) -> SessionView {
    match shell.stage_mut() {
        Stage::Survey(engine) => {
            let question = engine.current().clone();
            let image_urls = question
                .kind
                .options()
                .iter()
                .filter_map(|o| {
                    o.image
                        .as_ref()
                        .map(|img| (o.id.clone(), engine.document().asset_url(img)))
                })
                .collect();
            let cta = if engine.is_last() {
                engine.document().survey.meta.end_cta.clone()
            } else {
                "Next".to_string()
            };
            SessionView::Survey {
                title: engine.document().survey.meta.title.clone(),
                index: engine.index(),
                total: engine.total(),
                image_urls,
                answer: engine.answer(&question.id).map(|a| a.to_json()),
                complete: engine.is_complete(&question),
                loading: engine.is_loading(),
                error: engine.last_error().map(str::to_string),
                cta,
                question,
            }
        }
        Stage::Game { participant, deck } => {
            let participant_id = participant.to_string();
            match deck {
                Some(deck) => SessionView::Game {
                    participant_id,
                    card: deck.current().cloned(),
                    remaining: deck.remaining(),
                    total: deck.total(),
                    finished: deck.is_finished(),
                    feedback: deck.feedback(now).cloned(),
                },
                None => SessionView::Game {
                    participant_id,
                    card: None,
                    remaining: 0,
                    total: 0,
                    finished: false,
                    feedback: None,
                },
            }
        }
    }
}
