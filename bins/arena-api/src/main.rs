mod auth;
mod error;
mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use arena_common::{Config, RedisStore};
use arena_judge::{Judge0Gateway, Orchestrator, PollPolicy};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub start_time: Instant,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Arena API booting...");

    let config = Config::from_env();

    metrics::init_metrics();
    info!("Metrics registry initialized");

    let store = RedisStore::connect(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
    info!("Connected to Redis: {}", config.redis_url);

    let gateway = Judge0Gateway::from_config(&config).context("Failed to build Judge0 client")?;
    let policy = PollPolicy::from_config(&config);
    info!(
        judge0_url = %config.judge0_url,
        poll_interval_ms = config.poll_interval_ms,
        poll_max_attempts = policy.max_attempts,
        "Execution gateway configured"
    );

    let state = Arc::new(AppState {
        orchestrator: Arc::new(Orchestrator::new(
            Arc::new(gateway),
            Arc::new(store),
            policy,
        )),
        start_time: Instant::now(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
