// ABOUTME: Approval request ledger and decision engine
// ABOUTME: At-most-one-pending per (entity, role, approver), decisions feed workflow transitions

pub mod engine;
pub mod store;
pub mod types;

pub use engine::{stage_context_for_submission, ApprovalError, ApprovalResult, ApprovalService};
pub use store::ApprovalRequestStore;
pub use types::{ApprovalRequest, DecisionInput};
