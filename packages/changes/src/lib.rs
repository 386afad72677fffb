// ABOUTME: Post-approval change management with scored, re-approved amendments
// ABOUTME: The live record is only mutated by implementation, after a snapshot

pub mod service;
pub mod severity;
pub mod types;

pub use service::{ChangeError, ChangeResult, ChangeService};
pub use severity::{severity_label, severity_score, ChangeThresholds, SeverityContext};
pub use types::{
    ChangeApproval, ChangeApprovalRole, ChangeAttachment, ChangeComment, ChangeImpact,
    ChangePriority, ChangeRequest, ChangeRequestCreateInput, ChangeSeverity, ChangeStatus,
    ChangeType, FieldDelta, RiskLevel, SubmissionSnapshot,
};
