mod config;
mod db;
mod domain;
mod error;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::{offline::OfflinePersistence, supabase::SupabaseClient, SharedPersistence};
use crate::domain::questionnaire::SurveyDocument;
use crate::services::deck_source;
use crate::state::{SharedState, SubmitPolicy};
use anyhow::Context;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let document = SurveyDocument::load(&config.survey_config)
        .with_context(|| format!("loading {}", config.survey_config.display()))?;
    tracing::info!(
        "Survey document loaded: {} questions from {}",
        document.questions.len(),
        config.survey_config.display()
    );

    let persistence: SharedPersistence = match &config.supabase {
        Some(supabase) => {
            tracing::info!("Persisting to data service at {}", supabase.url);
            Arc::new(SupabaseClient::new(&supabase.url, supabase.anon_key.clone())?)
        }
        None => {
            tracing::warn!("Data service credentials are missing; data will not be persisted.");
            Arc::new(OfflinePersistence)
        }
    };

    let fallback_cards = deck_source::load_fallback_index(&document.deck.fallback_index);

    let shared: SharedState = Arc::new(state::AppState {
        persistence,
        document: Arc::new(document),
        fallback_cards,
        deck_limit: config.deck_limit,
        session_key: config.session_key.clone(),
        submit_policy: SubmitPolicy {
            max_attempts: config.submit_rate_limit,
            window: Duration::from_secs(60),
        },
        max_visitors: config.max_visitors,
        visitors: tokio::sync::RwLock::new(HashMap::new()),
    });

    let scheduler = JobScheduler::new().await?;

    // Idle visitor cleanup - hourly
    let shared_for_cleanup = shared.clone();
    let visitor_ttl = config.visitor_ttl_secs;
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            Box::pin(async move {
                let evicted = state.evict_idle(visitor_ttl).await;
                if evicted > 0 {
                    tracing::info!("Evicted {} idle visitor sessions", evicted);
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started: visitor cleanup hourly (ttl {}s)", visitor_ttl);

    // Card images and the bundled index live under <static>/designs
    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
