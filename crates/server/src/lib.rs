// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-server: the HTTP surface (§6) — the only user-facing surface of the
//! core. Thin by design: every route either delegates straight into
//! [`oj_engine::WorkflowEngine`] / [`oj_storage::Tracker`] or runs a small
//! bespoke flow (the single-job retry) built from the same collaborators.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assembles the full router. Split out from `main` so integration tests
/// can drive it with `tower::ServiceExt::oneshot` without binding a port.
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
