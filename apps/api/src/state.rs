use std::sync::Arc;

use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::orchestrator::InterviewPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InterviewPipeline>,
    /// Cancelled on shutdown; in-flight analyses stop at their next checkpoint.
    pub shutdown: CancellationToken,
}
