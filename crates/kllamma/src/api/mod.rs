//! # HTTP API
//!
//! ## Endpoints
//!
//! - `POST /prompt/refine` - Refine a prompt and store the result
//! - `GET /prompt/{id}` - A stored refinement with its feedback
//! - `POST /feedback/submit` - Rate a refinement
//! - `GET /health` - Liveness check
//!
//! POST parameters are read from a JSON body when the request declares
//! `Content-Type: application/json`, otherwise from the query string.
//! Every failure is answered with `{"error": "<message>"}`.

mod error;
mod feedback;
mod params;
mod prompt;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kllamma_core::{FeedbackService, PromptService};

use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub prompts: Arc<PromptService>,
    pub feedback: Arc<FeedbackService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/prompt/refine", post(prompt::refine_prompt))
        .route("/prompt/{id}", get(prompt::get_refinement))
        .route("/feedback/submit", post(feedback::submit_feedback))
        .route("/health", get(health))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed for this route")
}
