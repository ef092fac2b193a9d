use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub supabase: Option<SupabaseConfig>,
    pub survey_config: PathBuf,
    pub static_dir: PathBuf,
    pub session_key: Vec<u8>,
    pub deck_limit: usize,
    pub visitor_ttl_secs: u64,
    pub submit_rate_limit: usize,
    pub max_visitors: usize,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let supabase = match (non_empty("SUPABASE_URL"), non_empty("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig { url, anon_key }),
            _ => None,
        };

        let session_key = match non_empty("SESSION_KEY") {
            Some(b64) => general_purpose::STANDARD
                .decode(b64)
                .context("SESSION_KEY must be base64")?,
            None => {
                tracing::warn!("SESSION_KEY missing; generated a random key, sessions will not survive restarts");
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };

        Ok(Self {
            bind_addr,
            supabase,
            survey_config: PathBuf::from(
                env::var("SURVEY_CONFIG").unwrap_or_else(|_| "config/survey.json".to_string()),
            ),
            static_dir: PathBuf::from(env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string())),
            session_key,
            deck_limit: parse_or("DECK_LIMIT", 200)?,
            visitor_ttl_secs: parse_or("VISITOR_TTL_SECS", 6 * 60 * 60)?,
            submit_rate_limit: parse_or("SUBMIT_RATE_LIMIT", 10)?,
            max_visitors: parse_or("MAX_VISITORS", 10_000)?,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_defaults_when_unset() {
        let value: usize = parse_or("RITUAL_TEST_UNSET_VALUE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("RITUAL_TEST_BAD_LIMIT", "lots");
        let result: Result<usize> = parse_or("RITUAL_TEST_BAD_LIMIT", 1);
        assert!(result.is_err());
    }
}
