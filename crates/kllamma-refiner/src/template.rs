use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::{Refinement, Refiner, RefinerConfig, RefinerError, RefinerType};

const MODEL: &str = "template";

const GUIDANCE: &str = "\n\nRespond with a clear, well-structured answer. \
State any assumptions you make where the request is ambiguous, \
and keep the response focused on the request above.";

/// Deterministic offline refiner.
///
/// Normalizes whitespace, capitalizes the first letter, terminates the prompt
/// with punctuation and appends a fixed block of guidance. Needs no network.
pub struct TemplateRefiner;

impl TemplateRefiner {
    pub fn new() -> Self {
        Self
    }

    fn rewrite(prompt: &str) -> Option<String> {
        let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut chars = collapsed.chars();
        let first = chars.next()?;

        let mut text: String = first.to_uppercase().chain(chars).collect();
        if !text.ends_with(['.', '!', '?', ':']) {
            text.push('.');
        }
        text.push_str(GUIDANCE);
        Some(text)
    }
}

impl Default for TemplateRefiner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Refiner for TemplateRefiner {
    fn name(&self) -> &str {
        "Template"
    }

    fn refiner_type(&self) -> RefinerType {
        RefinerType::Template
    }

    fn model(&self) -> &str {
        MODEL
    }

    async fn refine(
        &self,
        prompt: &str,
        _config: &RefinerConfig,
    ) -> Result<Refinement, RefinerError> {
        let start = Instant::now();
        debug!(refiner = self.name(), prompt_len = prompt.len(), "Refining prompt");

        let text = Self::rewrite(prompt).ok_or(RefinerError::EmptyResponse)?;
        Ok(Refinement::new(text, MODEL.to_string(), start.elapsed()))
    }
}
