mod handlers;
mod routes;
mod state;

use std::env;

use axum::http::{header, HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_service_cli::{config::PipelineConfig, ReviewPipeline};
use state::AppState;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,review_service_cli=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env()?;
    let pipeline = ReviewPipeline::from_config(config)?;
    let mut app = routes::app(AppState::new(pipeline));

    // Only needed when the UI is served from another origin.
    if let Ok(client_url) = env::var("CLIENT_URL") {
        let cors = CorsLayer::new()
            .allow_origin(client_url.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);
        app = app.layer(cors);
    }

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
