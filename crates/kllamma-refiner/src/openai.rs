use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::postprocess::clean_refinement;
use crate::prompts::{build_user_message, SYSTEM_PROMPT};
use crate::{Refinement, Refiner, RefinerConfig, RefinerError, RefinerType};

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Refiner backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiRefiner {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiRefiner {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the refiner at another compatible endpoint (Azure, a proxy, a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn map_transport_error(err: reqwest::Error, config: &RefinerConfig) -> RefinerError {
        if err.is_timeout() {
            RefinerError::Timeout(config.timeout)
        } else {
            RefinerError::RequestFailed(err.to_string())
        }
    }
}

#[async_trait]
impl Refiner for OpenAiRefiner {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn refiner_type(&self) -> RefinerType {
        RefinerType::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn refine(
        &self,
        prompt: &str,
        config: &RefinerConfig,
    ) -> Result<Refinement, RefinerError> {
        let start = Instant::now();
        debug!(
            refiner = self.name(),
            model = %self.model,
            prompt_len = prompt.len(),
            "Refining prompt"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_message(prompt),
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Refiner API returned an error");
            return Err(RefinerError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| RefinerError::InvalidResponse(e.to_string()))?;

        let raw = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RefinerError::InvalidResponse("no choices in response".to_string()))?;

        let text = clean_refinement(&raw).ok_or(RefinerError::EmptyResponse)?;

        Ok(Refinement::new(text, self.model.clone(), start.elapsed()))
    }
}
