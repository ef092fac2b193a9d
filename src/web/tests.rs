use super::routes;
use crate::db::fake::FakePersistence;
use crate::domain::questionnaire::SurveyDocument;
use crate::services::deck_source::load_fallback_index;
use crate::state::{AppState, SharedState, SubmitPolicy};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const KEY: &[u8] = b"flow-test-key-flow-test-key-0000";

fn test_state(fake: Arc<FakePersistence>) -> SharedState {
    limited_state(fake, 10)
}

fn limited_state(fake: Arc<FakePersistence>, max_attempts: usize) -> SharedState {
    let document = SurveyDocument::from_json(include_str!("../../config/survey.json")).unwrap();
    let index = Path::new(env!("CARGO_MANIFEST_DIR")).join("static/designs/index.json");
    Arc::new(AppState {
        persistence: fake,
        document: Arc::new(document),
        fallback_cards: load_fallback_index(&index),
        deck_limit: 200,
        session_key: KEY.to_vec(),
        submit_policy: SubmitPolicy {
            max_attempts,
            window: Duration::from_secs(60),
        },
        max_visitors: 1_000,
        visitors: RwLock::new(HashMap::new()),
    })
}

async fn spawn_server(state: SharedState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes(state)).await.unwrap();
    });
    format!("http://{addr}")
}

/// Minimal browser: remembers the session cookie between calls.
struct Browser {
    client: reqwest::Client,
    base: String,
    cookie: Option<String>,
}

impl Browser {
    fn new(base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            cookie: None,
        }
    }

    async fn call(&mut self, method: reqwest::Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(cookie) = &self.cookie {
            req = req.header(header::COOKIE, cookie);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        if let Some(set) = resp.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn post(&mut self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn select(&mut self, question: &str, option: &str) {
        let (status, _) = self
            .post(
                "/api/survey/answer",
                json!({ "question_id": question, "kind": "select", "option_id": option }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "select {option} on {question}");
    }

    async fn next(&mut self) -> (StatusCode, Value) {
        self.post("/api/survey/next", json!({})).await
    }
}

/// Answers the ten bundled questions, stopping before the final submit.
async fn answer_all(browser: &mut Browser) {
    browser.select("Q1", "mood").await;
    browser.next().await;
    browser.select("Q2", "coffee_tea").await;
    browser.select("Q2", "skincare").await;
    browser.next().await;
    browser.select("Q3", "serene").await;
    browser.next().await;
    browser.select("Q4", "daily").await;
    browser.next().await;
    browser.select("Q5", "magnesium").await;
    browser.select("Q5", "vitamin_d").await;
    browser.next().await;
    let (status, _) = browser
        .post(
            "/api/survey/answer",
            json!({ "question_id": "Q6", "kind": "text", "value": "candles" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    browser.next().await;
    browser.select("Q7", "sleep").await;
    browser.select("Q7", "energy").await;
    browser.select("Q7", "mood").await;
    browser.next().await;
    browser.select("Q8", "mystic").await;
    browser.next().await;
    browser.select("Q9", "fashion").await;
    browser.next().await;

    browser
        .post(
            "/api/survey/answer",
            json!({ "question_id": "Q10", "kind": "join", "option_id": "yes" }),
        )
        .await;
    browser
        .post(
            "/api/survey/answer",
            json!({ "question_id": "Q10", "kind": "follow_up", "field_id": "email", "value": "test@example.com" }),
        )
        .await;
    let (status, view) = browser
        .post(
            "/api/survey/answer",
            json!({ "question_id": "Q10", "kind": "follow_up", "field_id": "instagram", "value": "testhandle" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["index"], 9);
    assert_eq!(view["complete"], true);
    assert_eq!(view["cta"], "Reveal my archetype");
}

async fn wait_for_swipes(fake: &FakePersistence, expected: usize) {
    for _ in 0..100 {
        if fake.swipe_count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_full_survey_then_swipe() {
    let fake = Arc::new(FakePersistence::default());
    let base = spawn_server(test_state(fake.clone())).await;
    let mut browser = Browser::new(base);

    let (status, view) = browser.get("/api/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "survey");
    assert_eq!(view["total"], 10);
    assert_eq!(view["title"], "Find your ritual archetype");
    assert!(browser.cookie.is_some());

    answer_all(&mut browser).await;
    let (status, view) = browser.next().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "game");
    assert_eq!(view["participant_id"], "participant-1");
    let image = view["card"]["image_url"].as_str().unwrap().to_string();
    assert!(image.contains("/designs/"));

    assert_eq!(fake.participant_count(), 1);
    let record = fake.participants.lock().unwrap()[0].clone();
    assert_eq!(record.email.as_deref(), Some("test@example.com"));
    assert!(record.marketing_opt_in);
    assert_eq!(record.goals.len(), 10);
    assert_eq!(record.goals[5], r#"Q6="candles""#);
    assert_eq!(
        record.goals[9],
        r#"Q10={"email":"test@example.com","instagram":"testhandle","join":"yes"}"#
    );

    let card_id = view["card"]["id"].as_str().unwrap().to_string();
    let total = view["total"].as_u64().unwrap();
    let (status, view) = browser
        .post("/api/game/swipe", json!({ "direction": "right", "card_id": card_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["feedback"]["choice"], "like");
    assert_eq!(view["remaining"].as_u64().unwrap(), total - 1);

    wait_for_swipes(&fake, 1).await;
    let swipes = fake.swipes.lock().unwrap().clone();
    assert_eq!(swipes.len(), 1);
    assert_eq!(swipes[0].design_id, card_id);
    assert_eq!(swipes[0].participant_id.as_str(), "participant-1");
}

#[tokio::test]
async fn test_returning_visitor_resumes_game() {
    let fake = Arc::new(FakePersistence::default());
    let base = spawn_server(test_state(fake.clone())).await;
    let mut browser = Browser::new(base);
    answer_all(&mut browser).await;
    browser.next().await;

    // A fresh server instance only knows the visitor through the cookie.
    let base = spawn_server(test_state(fake.clone())).await;
    let mut returning = Browser::new(base);
    returning.cookie = browser.cookie.clone();
    let (status, view) = returning.get("/api/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "game");
    assert_eq!(view["participant_id"], "participant-1");
    assert_eq!(fake.participant_count(), 1);
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() {
    let fake = Arc::new(FakePersistence::default());
    fake.set_participant_failure(true);
    let base = spawn_server(test_state(fake.clone())).await;
    let mut browser = Browser::new(base);
    answer_all(&mut browser).await;

    let (status, view) = browser.next().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "survey");
    assert_eq!(view["index"], 9);
    assert_eq!(view["error"], "insert rejected");
    assert_eq!(view["loading"], false);

    fake.set_participant_failure(false);
    let (_, view) = browser.next().await;
    assert_eq!(view["step"], "game");
    assert_eq!(fake.participant_count(), 1);
}

#[tokio::test]
async fn test_incomplete_question_blocks_next() {
    let fake = Arc::new(FakePersistence::default());
    let base = spawn_server(test_state(fake)).await;
    let mut browser = Browser::new(base);

    let (status, body) = browser.next().await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "incomplete");

    let (status, body) = browser
        .post("/api/game/swipe", json!({ "direction": "right" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "wrong_step");
}

#[tokio::test]
async fn test_down_swipe_keeps_card_in_deck() {
    let fake = Arc::new(FakePersistence::default());
    let base = spawn_server(test_state(fake.clone())).await;
    let mut browser = Browser::new(base);
    answer_all(&mut browser).await;
    let (_, view) = browser.next().await;
    let total = view["total"].as_u64().unwrap();

    let (_, view) = browser
        .post("/api/game/swipe", json!({ "direction": "down" }))
        .await;
    assert_eq!(view["remaining"].as_u64().unwrap(), total);
    assert_eq!(view["feedback"]["choice"], "not_sure");

    let (status, view) = browser
        .post("/api/game/swipe", json!({ "direction": "sideways" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["remaining"].as_u64().unwrap(), total);

    wait_for_swipes(&fake, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.swipe_count(), 1);
}

#[tokio::test]
async fn test_repeated_failed_submissions_are_limited() {
    let fake = Arc::new(FakePersistence::default());
    fake.set_participant_failure(true);
    let base = spawn_server(limited_state(fake.clone(), 1)).await;
    let mut browser = Browser::new(base);
    answer_all(&mut browser).await;

    let (status, view) = browser.next().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["error"], "insert rejected");

    fake.set_participant_failure(false);
    let (status, body) = browser.next().await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(fake.participant_count(), 0);
}

#[tokio::test]
async fn test_cookieless_reads_keep_no_shell() {
    let fake = Arc::new(FakePersistence::default());
    let state = test_state(fake);
    let base = spawn_server(state.clone()).await;

    for _ in 0..3 {
        let mut stranger = Browser::new(base.clone());
        let (status, view) = stranger.get("/api/session").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["index"], 0);
    }
    assert!(state.visitors.read().await.is_empty());

    let mut browser = Browser::new(base);
    browser.get("/api/session").await;
    browser.select("Q1", "mood").await;
    let (_, view) = browser.get("/api/session").await;
    assert_eq!(view["answer"], "mood");
    assert_eq!(state.visitors.read().await.len(), 1);
}
