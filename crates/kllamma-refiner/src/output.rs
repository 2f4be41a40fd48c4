use std::time::Duration;

/// A refined prompt as returned by a refiner
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// The refined prompt text, already cleaned
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Wall time spent in the refiner
    pub duration: Duration,
}

impl Refinement {
    pub fn new(text: String, model: String, duration: Duration) -> Self {
        Self {
            text,
            model,
            duration,
        }
    }
}
