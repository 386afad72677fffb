//! Test fixtures shared by package test suites

use chrono::Utc;

use crate::types::{ContactRef, LifecycleStatus, Submission, WorkflowState};

/// A contact with email and display name populated
pub fn contact(email: &str, name: &str) -> ContactRef {
    ContactRef {
        user_id: None,
        email: Some(email.to_string()),
        object_id: None,
        display_name: Some(name.to_string()),
    }
}

/// A contact with all three identity channels populated
pub fn full_contact(user_id: &str, email: &str, object_id: &str, name: &str) -> ContactRef {
    ContactRef {
        user_id: Some(user_id.to_string()),
        email: Some(email.to_string()),
        object_id: Some(object_id.to_string()),
        display_name: Some(name.to_string()),
    }
}

/// A minimal submission parked at the given lifecycle status
pub fn submission_at(id: &str, lifecycle: LifecycleStatus) -> Submission {
    let now = Utc::now();
    Submission {
        id: id.to_string(),
        title: format!("Submission {}", id),
        description: None,
        budget: None,
        stage: None,
        status: None,
        workflow: WorkflowState {
            lifecycle_status: Some(lifecycle),
            ..WorkflowState::default()
        },
        business_sponsor: None,
        business_delegate: None,
        tech_sponsor: None,
        finance_sponsor: None,
        benefits_sponsor: None,
        sponsor_name: None,
        sponsor_email: None,
        approval_stages: Vec::new(),
        assignments: Vec::new(),
        audit_trail: Vec::new(),
        created_by: "u-test".to_string(),
        created_at: now,
        updated_at: now,
    }
}
