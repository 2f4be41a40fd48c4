use axum::extract::State;
use axum::response::Json;

use kllamma_core::{FeedbackSubmission, FeedbackSubmissionResponse};

use super::error::ApiError;
use super::params::Params;
use super::AppState;

/// `POST /feedback/submit`
pub async fn submit_feedback(
    State(state): State<AppState>,
    Params(req): Params<FeedbackSubmission>,
) -> Result<Json<FeedbackSubmissionResponse>, ApiError> {
    let response = state.feedback.submit_feedback(req)?;
    Ok(Json(response))
}
