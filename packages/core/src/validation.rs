// ABOUTME: Input validation for submissions and approval decisions
// ABOUTME: Rejects malformed input before it reaches the workflow engine

use thiserror::Error;

use crate::types::{ApprovalDecision, SubmissionCreateInput};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Title exceeds {0} characters")]
    TitleTooLong(usize),

    #[error("A comment is required when the decision is {0:?}")]
    CommentRequired(ApprovalDecision),

    #[error("Created-by user id cannot be empty")]
    EmptyCreatedBy,
}

const MAX_TITLE_LENGTH: usize = 255;

/// Validate input for creating a submission. Returns every violation,
/// not just the first.
pub fn validate_submission_create(input: &SubmissionCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if input.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle);
    } else if input.title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(ValidationError::TitleTooLong(MAX_TITLE_LENGTH));
    }

    if input.created_by.trim().is_empty() {
        errors.push(ValidationError::EmptyCreatedBy);
    }

    errors
}

/// Negative decisions must carry a non-empty comment.
pub fn validate_decision_comment(
    decision: ApprovalDecision,
    comment: Option<&str>,
) -> Result<(), ValidationError> {
    if decision.requires_comment() && comment.map_or(true, |c| c.trim().is_empty()) {
        return Err(ValidationError::CommentRequired(decision));
    }
    Ok(())
}
