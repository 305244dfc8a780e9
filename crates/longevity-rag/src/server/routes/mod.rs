//! API routes for the RAG server

pub mod ask;

use axum::{
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// Build all routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/ask", post(ask::ask))
}

/// GET / - liveness message
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
