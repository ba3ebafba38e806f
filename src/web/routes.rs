//! Web API router construction.

use axum::{Router, middleware, response::Json, routing::get};
use serde_json::{Value, json};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::lectures;
use crate::web::middleware::request_id::request_id;

/// Upper bound on a single request, comfortably above a worst-case
/// aggregation (every slice exhausting its retries).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health))
        .route("/lectures", get(lectures::get_lectures))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost so timeouts and compression happen inside the request span.
        middleware::from_fn(request_id),
        CompressionLayer::new().gzip(true).br(true),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}

/// `GET /api/health`
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
