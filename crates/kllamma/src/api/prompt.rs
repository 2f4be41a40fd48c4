use axum::extract::{Path, State};
use axum::response::Json;

use kllamma_core::{PromptRefinementResponse, PromptSubmission, RefinementDetails};

use super::error::ApiError;
use super::params::Params;
use super::AppState;

/// `POST /prompt/refine`
pub async fn refine_prompt(
    State(state): State<AppState>,
    Params(req): Params<PromptSubmission>,
) -> Result<Json<PromptRefinementResponse>, ApiError> {
    let response = state.prompts.submit_prompt(&req.prompt).await?;
    Ok(Json(response))
}

/// `GET /prompt/{id}`
pub async fn get_refinement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefinementDetails>, ApiError> {
    let details = state.prompts.get_refinement(&id)?;
    Ok(Json(details))
}
