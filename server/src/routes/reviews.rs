use axum::{routing::get, Router};

use crate::handlers::review_handlers::get_reviews;

pub fn review_routes() -> Router {
    Router::new().route("/reviews", get(get_reviews))
}
