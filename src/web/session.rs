///! Signed visitor cookie. Plays the role of browser-local session storage:
///! it is read once when a visitor's shell is created and re-issued once the
///! survey yields a participant id.
use crate::domain::models::ParticipantId;
use crate::state::SharedState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::convert::Infallible;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "ritual_session";
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub visitor_id: Uuid,
    pub participant: Option<ParticipantId>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
}

pub fn sign_session(claims: &SessionClaims, key: &[u8]) -> Result<String, SessionError> {
    let payload = format!(
        "{}|{}",
        claims.visitor_id,
        claims.participant.as_ref().map(|p| p.as_str()).unwrap_or("")
    );
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        general_purpose::URL_SAFE_NO_PAD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let (visitor, participant) = payload.split_once('|').ok_or(SessionError::Invalid)?;
    let visitor_id = Uuid::parse_str(visitor).map_err(|_| SessionError::Invalid)?;
    let participant = (!participant.is_empty()).then(|| ParticipantId(participant.to_string()));
    Ok(SessionClaims {
        visitor_id,
        participant,
    })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(COOKIE_NAME)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

pub fn session_cookie(claims: &SessionClaims, key: &[u8]) -> Option<HeaderValue> {
    let token = match sign_session(claims, key) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to sign session cookie: {}", e);
            return None;
        }
    };
    format!("{COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}")
        .parse()
        .ok()
}

/// The calling visitor. Requests without a valid cookie become a new
/// visitor and get a cookie with the response.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub claims: SessionClaims,
    pub fresh: bool,
}

impl Visitor {
    pub fn id(&self) -> Uuid {
        self.claims.visitor_id
    }
}

#[async_trait]
impl FromRequestParts<SharedState> for Visitor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = extract_token(&parts.headers) {
            match verify_session(&token, &state.session_key) {
                Ok(claims) => return Ok(Visitor { claims, fresh: false }),
                Err(e) => tracing::warn!("Session cookie rejected, starting a new visitor: {}", e),
            }
        }
        Ok(Visitor {
            claims: SessionClaims {
                visitor_id: Uuid::new_v4(),
                participant: None,
            },
            fresh: true,
        })
    }
}
