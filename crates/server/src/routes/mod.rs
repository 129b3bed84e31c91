pub mod tracker;
pub mod workflow;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(workflow::router()).merge(tracker::router())
}
