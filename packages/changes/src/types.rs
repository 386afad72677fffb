// ABOUTME: Change request types: deltas, approvals, comments, attachments, snapshots
// ABOUTME: Amendments to a live project never touch the record until implemented

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use stagegate_core::ApprovalStatus;
use stagegate_storage::Record;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Scope,
    Schedule,
    Budget,
    Benefits,
    Resource,
    Other,
}

/// Change request lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Implemented,
    Closed,
}

/// Severity label derived from the computed score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl fmt::Display for ChangeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeSeverity::Minor => "Minor",
            ChangeSeverity::Moderate => "Moderate",
            ChangeSeverity::Major => "Major",
            ChangeSeverity::Critical => "Critical",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangePriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for ChangePriority {
    fn default() -> Self {
        ChangePriority::Medium
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

/// Declared impact of a change
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeImpact {
    #[serde(rename = "scheduleDays", default)]
    pub schedule_days: i64,
    #[serde(rename = "budgetDelta", default)]
    pub budget_delta: f64,
    #[serde(rename = "benefitsDelta", default)]
    pub benefits_delta: f64,
    #[serde(rename = "riskLevel", default)]
    pub risk_level: RiskLevel,
}

/// Roles on the change-governance approval chain, independent of the
/// main proposal/funding chain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeApprovalRole {
    BusinessSponsor,
    FinanceSponsor,
    GovernanceReview,
    PmHubAdmin,
}

impl ChangeApprovalRole {
    pub const ALL: [ChangeApprovalRole; 4] = [
        ChangeApprovalRole::BusinessSponsor,
        ChangeApprovalRole::FinanceSponsor,
        ChangeApprovalRole::GovernanceReview,
        ChangeApprovalRole::PmHubAdmin,
    ];
}

/// One role's sign-off on a change request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeApproval {
    pub role: ChangeApprovalRole,
    pub status: ApprovalStatus,
    #[serde(rename = "decidedBy")]
    pub decided_by: Option<String>,
    #[serde(rename = "decidedAt")]
    pub decided_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Recorded (old, new) pair for one amended field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDelta {
    pub field: String,
    #[serde(rename = "oldValue")]
    pub old_value: serde_json::Value,
    #[serde(rename = "newValue")]
    pub new_value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeAttachment {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    /// Pointer into the document store; contents never live here
    pub reference: String,
    #[serde(rename = "uploadedBy")]
    pub uploaded_by: String,
    pub at: DateTime<Utc>,
}

/// Full submission state captured immediately before deltas are applied.
/// Kept for audit and manual rollback; the system never reverses
/// automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionSnapshot {
    #[serde(rename = "takenAt")]
    pub taken_at: DateTime<Utc>,
    pub submission: serde_json::Value,
}

/// An amendment proposal against a live/approved project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: String,
    #[serde(rename = "submissionId")]
    pub submission_id: String,
    #[serde(rename = "changeType")]
    pub change_type: ChangeType,
    pub title: String,
    pub description: Option<String>,
    pub justification: Option<String>,
    #[serde(default)]
    pub impact: ChangeImpact,
    #[serde(default)]
    pub priority: ChangePriority,
    #[serde(rename = "severityScore")]
    pub severity_score: u32,
    pub severity: ChangeSeverity,
    pub status: ChangeStatus,
    #[serde(default)]
    pub deltas: Vec<FieldDelta>,
    #[serde(default)]
    pub approvals: Vec<ChangeApproval>,
    #[serde(default)]
    pub comments: Vec<ChangeComment>,
    #[serde(default)]
    pub attachments: Vec<ChangeAttachment>,
    pub snapshot: Option<SubmissionSnapshot>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(rename = "decidedAt")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(rename = "implementedAt")]
    pub implemented_at: Option<DateTime<Utc>>,
    #[serde(rename = "closedAt")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    pub fn approval_for_role(&self, role: ChangeApprovalRole) -> Option<&ChangeApproval> {
        self.approvals.iter().find(|a| a.role == role)
    }
}

impl Record for ChangeRequest {
    const COLLECTION: &'static str = "change_requests";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Input for creating a change request draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestCreateInput {
    #[serde(rename = "changeType")]
    pub change_type: ChangeType,
    pub title: String,
    pub description: Option<String>,
    pub justification: Option<String>,
    #[serde(default)]
    pub impact: ChangeImpact,
    pub priority: Option<ChangePriority>,
    /// Proposed new values, keyed by submission field name
    #[serde(rename = "fieldChanges", default)]
    pub field_changes: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}
