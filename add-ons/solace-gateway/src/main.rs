//! Solace Gateway: HTTP surface for the check-in engine.
//!
//! Loads `.env`, installs tracing, reads [`CheckinConfig`], wires the generation client,
//! classifiers, and sled archive into a [`TurnOrchestrator`], and serves the per-turn and
//! reporting endpoints. A background sweeper evicts idle sessions.

mod handlers;

use axum::routing::{get, post};
use axum::Router;
use solace_core::{
    CheckinConfig, CheckinError, HttpAudioClassifier, HttpTextClassifier, OpenAiCompatGenerator, SessionArchive,
    SessionStore, SledSessionArchive, TextGenerator, TurnOrchestrator, WavFeatureExtractor, WeeklyNarrator,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CheckinConfig>,
    pub(crate) orchestrator: Arc<TurnOrchestrator>,
    pub(crate) archive: Arc<dyn SessionArchive>,
    pub(crate) narrator: Arc<WeeklyNarrator>,
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/chat", post(handlers::chat::chat))
        .route("/api/v1/history/:username", get(handlers::reports::history))
        .route("/api/v1/sessions/:username/:date", get(handlers::reports::session_for_date))
        .route("/api/v1/weekly/:username", get(handlers::reports::weekly))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn build_state(config: CheckinConfig) -> Result<AppState, CheckinError> {
    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiCompatGenerator::from_config(&config));
    let archive: Arc<dyn SessionArchive> = Arc::new(SledSessionArchive::open_path(config.archive_path())?);
    let sessions = Arc::new(SessionStore::new(
        chrono::Duration::seconds(config.session_ttl_secs as i64),
        config.session_capacity,
    ));

    let mut orchestrator = TurnOrchestrator::new(sessions, generator.clone()).with_archive(archive.clone());
    match config.text_classifier_url.as_deref() {
        Some(url) => {
            tracing::info!(target: "solace::gateway", url, "text emotion classifier enabled");
            orchestrator = orchestrator.with_text_classifier(Arc::new(HttpTextClassifier::new(url, timeout)));
        }
        None => tracing::warn!(target: "solace::gateway", "no text classifier configured; fusion defers to the language model"),
    }
    match config.audio_classifier_url.as_deref() {
        Some(url) => {
            tracing::info!(target: "solace::gateway", url, "audio emotion classifier enabled");
            orchestrator = orchestrator.with_audio(
                Arc::new(WavFeatureExtractor::new()),
                Arc::new(HttpAudioClassifier::new(url, timeout)),
            );
        }
        None => tracing::info!(target: "solace::gateway", "no audio classifier configured; text-only fusion"),
    }

    Ok(AppState {
        config: Arc::new(config),
        orchestrator: Arc::new(orchestrator),
        archive,
        narrator: Arc::new(WeeklyNarrator::new(generator)),
    })
}

/// Evicts idle sessions on a fixed period.
fn spawn_session_sweeper(sessions: Arc<SessionStore>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let evicted = sessions.evict_expired(chrono::Utc::now());
            tracing::debug!(target: "solace::gateway", evicted, live = sessions.len(), "session sweep");
        }
    });
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[solace-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CheckinConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(target: "solace::gateway", error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    if !config.has_llm_key() {
        eprintln!("[solace-gateway] Hint: set SOLACE_LLM_API_KEY or OPENROUTER_API_KEY in .env; replies will use fallback text until then.");
    }

    let port = config.port;
    let sweep = Duration::from_secs(config.sweep_interval_secs.max(1));
    let state = match build_state(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(target: "solace::gateway", error = %e, "failed to open session archive");
            std::process::exit(1);
        }
    };
    spawn_session_sweeper(state.orchestrator.sessions().clone(), sweep);

    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "solace::gateway", %addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(target: "solace::gateway", %addr, "Solace gateway listening");

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "solace::gateway", "shutdown requested (Ctrl+C)");
        }
    };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(target: "solace::gateway", error = %e, "server error");
    }
}
