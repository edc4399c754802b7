use std::sync::Arc;

use review_service_cli::ReviewPipeline;

/// Shared by every request; each pipeline run still owns its own browser
/// session, chunks and report.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReviewPipeline>,
}

impl AppState {
    pub fn new(pipeline: ReviewPipeline) -> Self {
        AppState {
            pipeline: Arc::new(pipeline),
        }
    }
}
