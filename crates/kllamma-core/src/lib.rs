//! # kllamma-core
//!
//! The two services behind the HTTP API:
//!
//! - [`PromptService`] - refine a prompt and record the result
//! - [`FeedbackService`] - record a user's rating of a refinement
//!
//! Both receive their [`Database`](kllamma_db::Database) handle at
//! construction; neither keeps state of its own.

mod error;
mod feedback_service;
mod prompt_service;
mod settings;

pub use error::ServiceError;
pub use feedback_service::{
    FeedbackService, FeedbackSubmission, FeedbackSubmissionResponse, FEEDBACK_FAILED_MESSAGE,
    FEEDBACK_SUCCESS_MESSAGE,
};
pub use prompt_service::{
    PromptRefinementResponse, PromptService, PromptSubmission, RefinementDetails,
};
pub use settings::{MissingReferencePolicy, ServiceSettings};
