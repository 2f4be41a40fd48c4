use std::ops::RangeInclusive;
use std::sync::Arc;

use kllamma_db::Database;
use kllamma_logging::ServiceEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{MissingReferencePolicy, ServiceError};

pub const FEEDBACK_SUCCESS_MESSAGE: &str = "Feedback submitted successfully.";
pub const FEEDBACK_FAILED_MESSAGE: &str = "Failed to submit feedback.";

/// Input for a feedback submission.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    pub user_id: String,
    pub prompt_refinement_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Outcome of a feedback submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmissionResponse {
    pub success: bool,
    pub message: String,
}

impl FeedbackSubmissionResponse {
    fn submitted() -> Self {
        Self {
            success: true,
            message: FEEDBACK_SUCCESS_MESSAGE.to_string(),
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            message: FEEDBACK_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Records user ratings of refinements
pub struct FeedbackService {
    db: Arc<Database>,
    rating_range: RangeInclusive<i64>,
    missing_reference: MissingReferencePolicy,
}

impl FeedbackService {
    pub fn new(
        db: Arc<Database>,
        rating_range: RangeInclusive<i64>,
        missing_reference: MissingReferencePolicy,
    ) -> Self {
        Self {
            db,
            rating_range,
            missing_reference,
        }
    }

    /// Validate and store one feedback entry.
    ///
    /// Every call writes a new record; repeated submissions are not merged.
    pub fn submit_feedback(
        &self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackSubmissionResponse, ServiceError> {
        let user_id = require("user_id", &submission.user_id)?;
        let refinement_id = require("prompt_refinement_id", &submission.prompt_refinement_id)?;

        if !self.rating_range.contains(&submission.rating) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between {} and {}, got {}",
                self.rating_range.start(),
                self.rating_range.end(),
                submission.rating
            )));
        }

        let comments = submission
            .comments
            .as_deref()
            .filter(|c| !c.trim().is_empty());

        if self.missing_reference == MissingReferencePolicy::Reject {
            let exists = self.db.refinements().exists(refinement_id)?;
            if !exists {
                return Err(ServiceError::NotFound(format!(
                    "Prompt refinement '{}' not found",
                    refinement_id
                )));
            }
        }

        debug!(
            prompt_refinement_id = refinement_id,
            rating = submission.rating,
            "Submitting feedback"
        );

        let created = self
            .db
            .feedback()
            .create(user_id, refinement_id, submission.rating, comments)?;

        match created {
            Some(record) => {
                ServiceEvent::FeedbackSubmitted {
                    id: record.id,
                    prompt_refinement_id: record.prompt_refinement_id,
                    rating: record.rating,
                }
                .emit();
                Ok(FeedbackSubmissionResponse::submitted())
            }
            None => {
                warn!(prompt_refinement_id = refinement_id, "Feedback write returned no record");
                Ok(FeedbackSubmissionResponse::failed())
            }
        }
    }
}

/// Reject blank values; accepted values are kept as submitted.
fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(refinement_id: &str, rating: i64, comments: Option<&str>) -> FeedbackSubmission {
        FeedbackSubmission {
            user_id: "u1".to_string(),
            prompt_refinement_id: refinement_id.to_string(),
            rating,
            comments: comments.map(str::to_string),
        }
    }

    fn setup(policy: MissingReferencePolicy) -> (FeedbackService, Arc<Database>, String) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let refinement = db
            .refinements()
            .create("write a haiku", "Write a haiku.", "template")
            .unwrap();
        let service = FeedbackService::new(db.clone(), 1..=5, policy);
        (service, db, refinement.id)
    }

    #[test]
    fn test_submit_for_existing_refinement() {
        let (service, db, id) = setup(MissingReferencePolicy::Reject);

        let response = service
            .submit_feedback(submission(&id, 5, Some("great")))
            .unwrap();

        assert_eq!(
            response,
            FeedbackSubmissionResponse {
                success: true,
                message: "Feedback submitted successfully.".to_string(),
            }
        );

        let stored = db.feedback().list_for(&id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, "u1");
        assert_eq!(stored[0].comments, Some("great".to_string()));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let (service, db, _) = setup(MissingReferencePolicy::Reject);

        let err = service
            .submit_feedback(submission("ref-unknown", 5, None))
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(db.feedback().count().unwrap(), 0);
    }

    #[test]
    fn test_missing_reference_allowed() {
        let (service, db, _) = setup(MissingReferencePolicy::Allow);

        let response = service
            .submit_feedback(submission("ref-unknown", 3, None))
            .unwrap();

        assert!(response.success);
        assert_eq!(db.feedback().list_for("ref-unknown").unwrap().len(), 1);
    }

    #[test]
    fn test_rating_out_of_range() {
        let (service, db, id) = setup(MissingReferencePolicy::Reject);

        for rating in [0, 6, -1] {
            let err = service
                .submit_feedback(submission(&id, rating, None))
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        assert_eq!(db.feedback().count().unwrap(), 0);
    }

    #[test]
    fn test_blank_identifiers_rejected() {
        let (service, _, id) = setup(MissingReferencePolicy::Allow);

        let mut blank_user = submission(&id, 4, None);
        blank_user.user_id = "  ".to_string();
        assert!(matches!(
            service.submit_feedback(blank_user),
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            service.submit_feedback(submission("", 4, None)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_comment_stored_as_none() {
        let (service, db, id) = setup(MissingReferencePolicy::Reject);

        service
            .submit_feedback(submission(&id, 2, Some("   ")))
            .unwrap();

        let stored = db.feedback().list_for(&id).unwrap();
        assert_eq!(stored[0].comments, None);
    }

    #[test]
    fn test_accepted_values_stored_as_submitted() {
        let (service, db, id) = setup(MissingReferencePolicy::Reject);

        let mut padded = submission(&id, 4, Some("  great\n"));
        padded.user_id = "  u1 ".to_string();
        service.submit_feedback(padded).unwrap();

        let stored = db.feedback().list_for(&id).unwrap();
        assert_eq!(stored[0].user_id, "  u1 ");
        assert_eq!(stored[0].comments.as_deref(), Some("  great\n"));
    }

    #[test]
    fn test_concurrent_submissions_are_independent() {
        let (service, db, id) = setup(MissingReferencePolicy::Reject);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let id = id.clone();
                std::thread::spawn(move || service.submit_feedback(submission(&id, 5, None)))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().unwrap().success);
        }

        let stored = db.feedback().list_for(&id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[test]
    fn test_submission_deserializes_without_comments() {
        let parsed: FeedbackSubmission = serde_json::from_str(
            r#"{"user_id":"u1","prompt_refinement_id":"r1","rating":5}"#,
        )
        .unwrap();
        assert_eq!(parsed.comments, None);
        assert_eq!(parsed.rating, 5);
    }
}
