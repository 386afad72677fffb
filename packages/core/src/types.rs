// ABOUTME: Domain type definitions for submissions and workflow state
// ABOUTME: Structures for sponsor contacts, approval stages, assignments, and audit entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::Identity;

/// Canonical workflow stage of a submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Proposal,
    Funding,
    Live,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStage::Proposal => write!(f, "Proposal"),
            WorkflowStage::Funding => write!(f, "Funding"),
            WorkflowStage::Live => write!(f, "Live"),
        }
    }
}

/// Canonical workflow status within a stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    SponsorReview,
    PgoFgoReview,
    SpoReview,
    Rejected,
    Approved,
    Active,
    ChangeReview,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStatus::Draft => "Draft",
            WorkflowStatus::SponsorReview => "Sponsor Review",
            WorkflowStatus::PgoFgoReview => "PGO/FGO Review",
            WorkflowStatus::SpoReview => "SPO Review",
            WorkflowStatus::Rejected => "Rejected",
            WorkflowStatus::Approved => "Approved",
            WorkflowStatus::Active => "Active",
            WorkflowStatus::ChangeReview => "Change Review",
        };
        write!(f, "{}", label)
    }
}

/// Persisted lifecycle status, the single source of truth for a
/// submission's position. Canonical stage/status pairs are always
/// re-derived from this value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    ProposalDraft,
    ProposalSponsorReview,
    ProposalGovernanceReview,
    ProposalRejected,
    ProposalApproved,
    FundingDraft,
    FundingSponsorReview,
    FundingGovernanceReview,
    FundingSpoReview,
    FundingRejected,
    FundingApproved,
    Live,
    ChangeReview,
    Archived,
}

impl LifecycleStatus {
    /// All lifecycle values, in workflow order.
    pub const ALL: [LifecycleStatus; 14] = [
        LifecycleStatus::ProposalDraft,
        LifecycleStatus::ProposalSponsorReview,
        LifecycleStatus::ProposalGovernanceReview,
        LifecycleStatus::ProposalRejected,
        LifecycleStatus::ProposalApproved,
        LifecycleStatus::FundingDraft,
        LifecycleStatus::FundingSponsorReview,
        LifecycleStatus::FundingGovernanceReview,
        LifecycleStatus::FundingSpoReview,
        LifecycleStatus::FundingRejected,
        LifecycleStatus::FundingApproved,
        LifecycleStatus::Live,
        LifecycleStatus::ChangeReview,
        LifecycleStatus::Archived,
    ];
}

/// Entity flavor carried in workflow state; funding requests resolve to
/// the FUNDING stage when legacy records lack a lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    ProjectProposal,
    FundingRequest,
}

impl Default for EntityType {
    fn default() -> Self {
        EntityType::ProjectProposal
    }
}

/// Stage context an approval request was raised under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageContext {
    Proposal,
    Funding,
    PmAssignment,
}

/// Named approval roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleContext {
    BusinessSponsor,
    BusinessDelegate,
    TechSponsor,
    FinanceSponsor,
    BenefitsSponsor,
    ProjectManager,
}

impl RoleContext {
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleContext::BusinessSponsor => "Business Sponsor",
            RoleContext::BusinessDelegate => "Business Delegate",
            RoleContext::TechSponsor => "Technology Sponsor",
            RoleContext::FinanceSponsor => "Finance Sponsor",
            RoleContext::BenefitsSponsor => "Benefits Sponsor",
            RoleContext::ProjectManager => "Project Manager",
        }
    }
}

impl fmt::Display for RoleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Status of one approval attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    NeedMoreInfo,
    Cancelled,
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Pending
    }
}

/// A decision an approver can hand down on a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    NeedMoreInfo,
}

impl ApprovalDecision {
    /// Rejections and requests for more information must carry a comment.
    pub fn requires_comment(&self) -> bool {
        !matches!(self, ApprovalDecision::Approved)
    }
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
            ApprovalDecision::NeedMoreInfo => ApprovalStatus::NeedMoreInfo,
        }
    }
}

/// Workflow bookkeeping persisted on every submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowState {
    #[serde(rename = "entityType", default)]
    pub entity_type: EntityType,
    #[serde(rename = "lifecycleStatus")]
    pub lifecycle_status: Option<LifecycleStatus>,
    #[serde(rename = "sponsorDecision")]
    pub sponsor_decision: Option<ApprovalDecision>,
    #[serde(rename = "pgoDecision")]
    pub pgo_decision: Option<ApprovalDecision>,
    #[serde(rename = "financeDecision")]
    pub finance_decision: Option<ApprovalDecision>,
    #[serde(rename = "spoDecision")]
    pub spo_decision: Option<ApprovalDecision>,
    #[serde(rename = "fundingStatus")]
    pub funding_status: Option<String>,
}

/// A sponsor or delegate contact reference. Any one of the identity
/// channels may be populated; matching accepts any of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactRef {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "objectId")]
    pub object_id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

impl ContactRef {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            object_id: self.object_id.clone(),
        }
    }

    /// A contact is addressable when it carries at least a name or email.
    pub fn is_addressable(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            || self.display_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// One record per stage ever evaluated on a submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalStage {
    pub stage: StageContext,
    pub role: RoleContext,
    pub status: ApprovalStatus,
    #[serde(rename = "decidedBy")]
    pub decided_by: Option<String>,
    #[serde(rename = "decidedAt")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Role-tagged user link on a submission (e.g. project manager)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub role: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: Option<String>,
    #[serde(rename = "assignedAt")]
    pub assigned_at: DateTime<Utc>,
}

/// Append-only audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub detail: Option<String>,
}

/// A capital-project submission record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Approved capital budget, if one has been set
    #[serde(default)]
    pub budget: Option<f64>,
    /// Legacy free-text stage, kept for backward display only
    pub stage: Option<String>,
    /// Legacy free-text status, kept for backward display only
    pub status: Option<String>,
    #[serde(default)]
    pub workflow: WorkflowState,
    #[serde(rename = "businessSponsor")]
    pub business_sponsor: Option<ContactRef>,
    #[serde(rename = "businessDelegate")]
    pub business_delegate: Option<ContactRef>,
    #[serde(rename = "techSponsor")]
    pub tech_sponsor: Option<ContactRef>,
    #[serde(rename = "financeSponsor")]
    pub finance_sponsor: Option<ContactRef>,
    #[serde(rename = "benefitsSponsor")]
    pub benefits_sponsor: Option<ContactRef>,
    /// Legacy flat sponsor fields, fallback when no structured contact exists
    #[serde(rename = "sponsorName")]
    pub sponsor_name: Option<String>,
    #[serde(rename = "sponsorEmail")]
    pub sponsor_email: Option<String>,
    #[serde(rename = "approvalStages", default)]
    pub approval_stages: Vec<ApprovalStage>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(rename = "auditTrail", default)]
    pub audit_trail: Vec<AuditEntry>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Structured contact assigned to a role, if any. Project manager is
    /// carried through assignments, not sponsor contacts.
    pub fn contact_for_role(&self, role: RoleContext) -> Option<&ContactRef> {
        match role {
            RoleContext::BusinessSponsor => self.business_sponsor.as_ref(),
            RoleContext::BusinessDelegate => self.business_delegate.as_ref(),
            RoleContext::TechSponsor => self.tech_sponsor.as_ref(),
            RoleContext::FinanceSponsor => self.finance_sponsor.as_ref(),
            RoleContext::BenefitsSponsor => self.benefits_sponsor.as_ref(),
            RoleContext::ProjectManager => None,
        }
    }

    pub fn assignment_for_role(&self, role: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.role == role)
    }

    /// Appends an audit entry and bumps `updated_at`.
    pub fn record_audit(&mut self, actor: &str, action: &str, detail: Option<String>) {
        let now = Utc::now();
        self.audit_trail.push(AuditEntry {
            at: now,
            actor: actor.to_string(),
            action: action.to_string(),
            detail,
        });
        self.updated_at = now;
    }
}

/// Input for creating a new submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionCreateInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "entityType")]
    pub entity_type: Option<EntityType>,
    #[serde(rename = "businessSponsor")]
    pub business_sponsor: Option<ContactRef>,
    #[serde(rename = "businessDelegate")]
    pub business_delegate: Option<ContactRef>,
    #[serde(rename = "techSponsor")]
    pub tech_sponsor: Option<ContactRef>,
    #[serde(rename = "financeSponsor")]
    pub finance_sponsor: Option<ContactRef>,
    #[serde(rename = "benefitsSponsor")]
    pub benefits_sponsor: Option<ContactRef>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}
