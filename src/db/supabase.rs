///! PostgREST client for the hosted data service (participants, designs, swipes)
use super::{Persistence, PersistenceError};
use crate::domain::models::{Card, NewParticipant, ParticipantId, SwipeRecord};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct DesignRow {
    id: Value,
    image_url: String,
    #[serde(default)]
    label: Option<String>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: String) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            anon_key,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }
}

#[async_trait]
impl Persistence for SupabaseClient {
    async fn insert_participant(
        &self,
        record: &NewParticipant,
    ) -> Result<ParticipantId, PersistenceError> {
        let resp = self
            .authed(self.client.post(self.table("participants")))
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, "application/json")
            .json(record)
            .send()
            .await?;
        let body: Value = checked(resp).await?.json().await?;
        parse_inserted_id(&body)
    }

    async fn list_cards(&self, limit: usize) -> Result<Vec<Card>, PersistenceError> {
        let resp = self
            .authed(self.client.get(self.table("designs")))
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        let rows: Vec<DesignRow> = checked(resp).await?.json().await?;
        Ok(rows.into_iter().filter_map(card_from_row).collect())
    }

    async fn insert_swipe(&self, record: &SwipeRecord) -> Result<(), PersistenceError> {
        let resp = self
            .authed(self.client.post(self.table("swipes")))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        checked(resp).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into the service's own error message.
async fn checked(resp: Response) -> Result<Response, PersistenceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(service_error(status.as_u16(), &text))
}

fn service_error(status: u16, body: &str) -> PersistenceError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("data service responded with status {status}"));
    PersistenceError::Service(message)
}

/// `return=representation` yields an array of inserted rows; some proxies
/// unwrap single-row results into a bare object.
fn parse_inserted_id(body: &Value) -> Result<ParticipantId, PersistenceError> {
    let row = match body {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(body),
        _ => None,
    }
    .ok_or_else(|| PersistenceError::Decode("insert returned no rows".to_string()))?;

    row.get("id")
        .and_then(id_string)
        .map(ParticipantId)
        .ok_or_else(|| PersistenceError::Decode("inserted row has no id".to_string()))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn card_from_row(row: DesignRow) -> Option<Card> {
    let Some(id) = id_string(&row.id) else {
        tracing::warn!("Skipping design row without usable id: {:?}", row.id);
        return None;
    };
    Some(Card {
        id,
        image_url: row.image_url,
        label: row.label,
    })
}
