use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use review_service_cli::{AggregateReport, PipelineError};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReviewsQuery {
    pub page: String,
}

/// GET /
pub async fn index() -> impl IntoResponse {
    Html(include_str!("../../templates/index.html"))
}

/// GET /api/reviews?page=<url>
pub async fn get_reviews(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<AggregateReport>, (StatusCode, Json<serde_json::Value>)> {
    let invocation = Uuid::new_v4();

    async move {
        info!(page = %query.page, "review extraction requested");
        match state.pipeline.run_url(&query.page).await {
            Ok(report) => {
                info!(reviews = report.reviews_count(), "review extraction done");
                Ok(Json(report))
            }
            Err(e) => {
                let status = match e {
                    PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    PipelineError::Render(_) | PipelineError::Unhandled(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                error!(status = status.as_u16(), "review extraction failed: {}", e);
                Err((status, Json(json!({ "detail": e.to_string() }))))
            }
        }
    }
    .instrument(info_span!("reviews", %invocation))
    .await
}
