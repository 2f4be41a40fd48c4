use serde::{Deserialize, Serialize};

/// Structured events emitted by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServiceEvent {
    ServerStarted {
        address: String,
        refiner: String,
        model: String,
    },
    RefinementCreated {
        id: String,
        model: String,
        prompt_preview: String,
        duration_ms: u64,
    },
    FeedbackSubmitted {
        id: String,
        prompt_refinement_id: String,
        rating: i64,
    },
    ServerStopped {
        reason: String,
    },
}

impl ServiceEvent {
    /// The snake_case event name, as it appears in the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceEvent::ServerStarted { .. } => "server_started",
            ServiceEvent::RefinementCreated { .. } => "refinement_created",
            ServiceEvent::FeedbackSubmitted { .. } => "feedback_submitted",
            ServiceEvent::ServerStopped { .. } => "server_stopped",
        }
    }

    /// Record the event through `tracing` at info level.
    pub fn emit(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(event = self.name(), payload = %payload);
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-field output
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Shorten text for log lines, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
