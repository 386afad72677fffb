// ABOUTME: Submission management library for Stagegate
// ABOUTME: CRUD entry points over the shared record store with workflow gating

pub mod manager;

pub use manager::{ManagerError, ManagerResult, SubmissionManager, SubmissionUpdateInput};

// Re-export the types callers need alongside the manager
pub use stagegate_core::{Submission, SubmissionCreateInput};
