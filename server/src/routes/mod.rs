pub mod reviews;

use axum::{routing::get, Extension, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::review_handlers::index;
use crate::state::AppState;
use reviews::review_routes;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/api", review_routes())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
