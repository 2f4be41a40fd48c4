use std::sync::Arc;

use chrono::{DateTime, Utc};
use kllamma_db::{Database, FeedbackRecord, PromptRefinementRecord};
use kllamma_logging::{preview, ServiceEvent};
use kllamma_refiner::{Refiner, RefinerConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ServiceError;

/// Input for a refinement request.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSubmission {
    pub prompt: String,
}

/// Result of a successful refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRefinementResponse {
    pub prompt_refinement_id: String,
    pub original_prompt: String,
    pub refined_prompt: String,
    pub model: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PromptRefinementRecord> for PromptRefinementResponse {
    fn from(record: PromptRefinementRecord) -> Self {
        Self {
            prompt_refinement_id: record.id,
            original_prompt: record.original_prompt,
            refined_prompt: record.refined_prompt,
            model: record.model,
            success: true,
            created_at: record.created_at,
        }
    }
}

/// A stored refinement together with the feedback it received.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementDetails {
    #[serde(flatten)]
    pub refinement: PromptRefinementRecord,
    pub feedback: Vec<FeedbackRecord>,
}

/// Refines prompts through the configured refiner and records every result
pub struct PromptService {
    db: Arc<Database>,
    refiner: Arc<dyn Refiner>,
    config: RefinerConfig,
    max_prompt_chars: usize,
}

impl PromptService {
    pub fn new(
        db: Arc<Database>,
        refiner: Arc<dyn Refiner>,
        config: RefinerConfig,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            db,
            refiner,
            config,
            max_prompt_chars,
        }
    }

    /// Refine `prompt` and persist the original/refined pair.
    ///
    /// The refiner sees the trimmed prompt; the stored original is the
    /// prompt exactly as submitted.
    pub async fn submit_prompt(
        &self,
        prompt: &str,
    ) -> Result<PromptRefinementResponse, ServiceError> {
        let trimmed = self.validate(prompt)?;

        debug!(prompt_len = trimmed.len(), "Submitting prompt for refinement");

        // The refiner's own timeout is not trusted to cover every implementation.
        let refinement =
            match tokio::time::timeout(self.config.timeout, self.refiner.refine(trimmed, &self.config))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(ServiceError::RefinerTimeout(self.config.timeout)),
            };

        let record =
            self.db
                .refinements()
                .create(prompt, &refinement.text, &refinement.model)?;

        ServiceEvent::RefinementCreated {
            id: record.id.clone(),
            model: record.model.clone(),
            prompt_preview: preview(trimmed, 60),
            duration_ms: refinement.duration.as_millis() as u64,
        }
        .emit();

        Ok(record.into())
    }

    /// Load a refinement and its feedback.
    pub fn get_refinement(&self, id: &str) -> Result<RefinementDetails, ServiceError> {
        let refinement = self
            .db
            .refinements()
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Prompt refinement '{}' not found", id)))?;
        let feedback = self.db.feedback().list_for(id)?;

        Ok(RefinementDetails {
            refinement,
            feedback,
        })
    }

    fn validate<'p>(&self, prompt: &'p str) -> Result<&'p str, ServiceError> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Validation("Prompt must not be empty".to_string()));
        }

        let len = trimmed.chars().count();
        if len > self.max_prompt_chars {
            return Err(ServiceError::Validation(format!(
                "Prompt is too long ({} characters, maximum is {})",
                len, self.max_prompt_chars
            )));
        }

        Ok(trimmed)
    }
}
