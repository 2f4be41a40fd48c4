mod openai;
mod output;
mod postprocess;
mod prompts;
mod template;
mod traits;

pub use openai::OpenAiRefiner;
pub use output::Refinement;
pub use postprocess::clean_refinement;
pub use prompts::SYSTEM_PROMPT;
pub use template::TemplateRefiner;
pub use traits::{Refiner, RefinerConfig, RefinerError, RefinerType};

/// Connection settings for refiners that talk to a remote API.
#[derive(Clone, Default)]
pub struct RefinerSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for RefinerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinerSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Create a refiner by type
pub fn create_refiner(
    refiner_type: RefinerType,
    settings: RefinerSettings,
) -> Result<Box<dyn Refiner>, RefinerError> {
    match refiner_type {
        RefinerType::OpenAi => {
            let api_key = settings.api_key.ok_or_else(|| {
                RefinerError::ConfigError("OPENAI_API_KEY is not set".to_string())
            })?;
            let mut refiner = OpenAiRefiner::new(api_key);
            if let Some(model) = settings.model {
                refiner = refiner.with_model(model);
            }
            if let Some(base_url) = settings.base_url {
                refiner = refiner.with_base_url(base_url);
            }
            Ok(Box::new(refiner))
        }
        RefinerType::Template => Ok(Box::new(TemplateRefiner::new())),
    }
}
