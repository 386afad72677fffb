// ABOUTME: Core types, traits, and utilities for Stagegate
// ABOUTME: Foundational package providing shared functionality across all Stagegate packages

pub mod collaborators;
pub mod constants;
pub mod identity;
pub mod types;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export main types
pub use types::{
    ApprovalDecision, ApprovalStage, ApprovalStatus, Assignment, AuditEntry, ContactRef,
    EntityType, LifecycleStatus, RoleContext, StageContext, Submission, SubmissionCreateInput,
    WorkflowStage, WorkflowState, WorkflowStatus,
};

// Re-export identity matching
pub use identity::{Identity, Principal};

// Re-export collaborator traits
pub use collaborators::{
    AuditSink, DirectoryUser, DispatchError, EmptyDirectory, Notification, NotificationDispatcher,
    NullDispatcher, RecordingDispatcher, TracingAuditSink, UserDirectory,
};

// Re-export constants
pub use constants::{stagegate_dir, STORE_VERSION};

// Re-export utilities
pub use utils::{generate_record_id, truncate};

// Re-export validation
pub use validation::{validate_decision_comment, validate_submission_create, ValidationError};
