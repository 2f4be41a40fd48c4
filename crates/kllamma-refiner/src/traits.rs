use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::Refinement;

/// Errors that can occur while refining a prompt
#[derive(Error, Debug)]
pub enum RefinerError {
    #[error("Refiner timed out after {0:?}")]
    Timeout(Duration),

    #[error("Refiner request failed: {0}")]
    RequestFailed(String),

    #[error("Refiner API responded with {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid refiner response: {0}")]
    InvalidResponse(String),

    #[error("Refiner returned an empty refinement")]
    EmptyResponse,

    #[error("Refiner configuration error: {0}")]
    ConfigError(String),
}

/// Per-call limits for a refinement.
///
/// Every call is a single attempt; nothing here is retried.
#[derive(Debug, Clone)]
pub struct RefinerConfig {
    /// Upper bound on the whole call, including connect and body read
    pub timeout: Duration,
    /// Maximum tokens the model may generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

impl RefinerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Supported refiner types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefinerType {
    OpenAi,
    Template,
}

impl std::fmt::Display for RefinerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinerType::OpenAi => write!(f, "openai"),
            RefinerType::Template => write!(f, "template"),
        }
    }
}

impl std::str::FromStr for RefinerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" => Ok(RefinerType::OpenAi),
            "template" | "offline" => Ok(RefinerType::Template),
            _ => Err(format!("Unknown refiner type: {}", s)),
        }
    }
}

/// The external capability that turns a raw prompt into a refined one
#[async_trait]
pub trait Refiner: Send + Sync {
    /// Human-readable name of the refiner (e.g., "OpenAI")
    fn name(&self) -> &str;

    /// The refiner type
    fn refiner_type(&self) -> RefinerType;

    /// Model identifier recorded alongside each refinement
    fn model(&self) -> &str;

    /// Refine a single prompt
    async fn refine(&self, prompt: &str, config: &RefinerConfig)
        -> Result<Refinement, RefinerError>;
}
