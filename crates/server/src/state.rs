use oj_adapters::PortalAdapter;
use oj_core::SystemClock;
use oj_engine::{RetryConfig, WorkflowEngine};
use oj_storage::Tracker;
use std::sync::Arc;

/// Shared state behind every route. Cheap to clone — everything inside is
/// already `Arc`'d.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine<SystemClock>>,
    pub tracker: Arc<dyn Tracker>,
    pub portal: Arc<dyn PortalAdapter>,
    pub retry_config: RetryConfig,
}
