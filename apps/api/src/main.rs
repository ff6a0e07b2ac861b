mod analysis;
mod config;
mod errors;
mod llm_client;
mod pipeline;
mod routes;
mod state;
mod transcript;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::cache::ResultCache;
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::orchestrator::{InterviewPipeline, PipelineSettings};
use crate::pipeline::prompts::PROMPT_TEMPLATE_VERSION;
use crate::pipeline::retry::{RetryPolicy, RetryingInvoker};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let policy = RetryPolicy {
        max_attempts: config.llm_max_attempts,
        base_delay: Duration::from_millis(config.llm_backoff_base_ms),
        attempt_timeout: Duration::from_secs(config.llm_attempt_timeout_secs),
        ..RetryPolicy::default()
    };
    let settings = PipelineSettings {
        regeneration_attempts: config.regeneration_attempts,
        template_version: PROMPT_TEMPLATE_VERSION.to_string(),
        enable_cache: config.enable_cache,
    };
    let pipeline = InterviewPipeline::new(
        RetryingInvoker::new(Arc::new(llm), policy),
        Arc::new(ResultCache::new()),
        settings,
    );

    // Build app state
    let shutdown = CancellationToken::new();
    let state = AppState {
        pipeline: Arc::new(pipeline),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels in-flight analyses at their next checkpoint.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling in-flight analyses");
    shutdown.cancel();
}
