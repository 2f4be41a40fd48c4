use std::ops::RangeInclusive;

use kllamma_refiner::RefinerConfig;
use serde::Deserialize;

/// What feedback submission does when the referenced refinement is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReferencePolicy {
    /// Fail with a not-found error
    #[default]
    Reject,
    /// Store the feedback anyway
    Allow,
}

impl std::fmt::Display for MissingReferencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingReferencePolicy::Reject => write!(f, "reject"),
            MissingReferencePolicy::Allow => write!(f, "allow"),
        }
    }
}

impl std::str::FromStr for MissingReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(MissingReferencePolicy::Reject),
            "allow" => Ok(MissingReferencePolicy::Allow),
            _ => Err(format!("Unknown missing reference policy: {}", s)),
        }
    }
}

/// Tunables shared by the services
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Longest accepted prompt, in characters, after trimming
    pub max_prompt_chars: usize,
    /// Accepted ratings, inclusive
    pub rating_range: RangeInclusive<i64>,
    pub missing_reference: MissingReferencePolicy,
    pub refiner: RefinerConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_prompt_chars: 8000,
            rating_range: 1..=5,
            missing_reference: MissingReferencePolicy::default(),
            refiner: RefinerConfig::default(),
        }
    }
}
