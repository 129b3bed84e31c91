// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_adapters::{HttpEmbedder, HttpPersonalizer, HttpPortalAdapter};
use oj_core::SystemClock;
use oj_engine::{EngineConfig, EventBus, Ranker, RetryConfig, WorkflowEngine};
use oj_server::{build_router, AppState};
use oj_storage::{MemoryTracker, Tracker};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let request_timeout = Duration::from_millis(env_or_u64("OJ_UPSTREAM_TIMEOUT_MS", 10_000));
    let portal = Arc::new(HttpPortalAdapter::new(env_or("OJ_PORTAL_BASE_URL", "http://localhost:4001"), request_timeout));
    let personalizer =
        Arc::new(HttpPersonalizer::new(env_or("OJ_PERSONALIZER_BASE_URL", "http://localhost:4002"), request_timeout));
    let embedder = Arc::new(HttpEmbedder::new(env_or("OJ_EMBEDDER_BASE_URL", "http://localhost:4003"), request_timeout));
    let ranker = Arc::new(Ranker::new(embedder));

    let tracker: Arc<dyn Tracker> = Arc::new(MemoryTracker::new());

    let config = EngineConfig {
        max_parallel_jobs_per_run: 1,
        retry: RetryConfig {
            max_attempts: env_or_u64("OJ_RETRY_MAX_ATTEMPTS", 3) as u32,
            base_ms: env_or_u64("OJ_RETRY_BASE_MS", 1_000),
            cap_ms: env_or_u64("OJ_RETRY_CAP_MS", 30_000),
            kill_poll_interval_ms: env_or_u64("OJ_KILL_POLL_INTERVAL_MS", 2_000),
        },
        event_replay_window: env_or_u64("OJ_EVENT_REPLAY_WINDOW", 256) as usize,
        kill_poll_interval_ms: env_or_u64("OJ_KILL_POLL_INTERVAL_MS", 2_000),
        per_run_post_terminal_grace_ms: env_or_u64("OJ_POST_TERMINAL_GRACE_MS", 5_000),
    };

    let event_bus = Arc::new(EventBus::new(
        config.event_replay_window,
        Duration::from_millis(config.per_run_post_terminal_grace_ms),
    ));

    let engine = Arc::new(WorkflowEngine::new(
        portal.clone(),
        personalizer,
        ranker,
        tracker.clone(),
        event_bus,
        SystemClock,
        config.clone(),
    ));

    let state = AppState { engine, tracker, portal, retry_config: config.retry.clone() };
    let router = build_router(state);

    let addr = env_or("OJ_SERVER_ADDR", "0.0.0.0:4000");
    tracing::info!(%addr, "oj-server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
