// ABOUTME: Canonical state resolution between lifecycle status, canonical pairs, and legacy text
// ABOUTME: The lifecycle table here is the single place encoding the full state space

use serde::{Deserialize, Serialize};

use stagegate_core::{
    EntityType, LifecycleStatus, Submission, WorkflowStage, WorkflowState, WorkflowStatus,
};

/// The normalized stage/status pair derived from lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalState {
    pub stage: WorkflowStage,
    pub status: WorkflowStatus,
}

impl CanonicalState {
    pub fn new(stage: WorkflowStage, status: WorkflowStatus) -> Self {
        Self { stage, status }
    }
}

/// Forward mapping from the persisted lifecycle status. Exhaustive over
/// all fourteen values; ARCHIVED collapses onto (LIVE, ACTIVE).
pub fn canonical_from_lifecycle(lifecycle: LifecycleStatus) -> CanonicalState {
    use LifecycleStatus::*;
    use WorkflowStage as Stage;
    use WorkflowStatus as Status;

    let (stage, status) = match lifecycle {
        ProposalDraft => (Stage::Proposal, Status::Draft),
        ProposalSponsorReview => (Stage::Proposal, Status::SponsorReview),
        ProposalGovernanceReview => (Stage::Proposal, Status::PgoFgoReview),
        ProposalRejected => (Stage::Proposal, Status::Rejected),
        ProposalApproved => (Stage::Proposal, Status::Approved),
        FundingDraft => (Stage::Funding, Status::Draft),
        FundingSponsorReview => (Stage::Funding, Status::SponsorReview),
        FundingGovernanceReview => (Stage::Funding, Status::PgoFgoReview),
        FundingSpoReview => (Stage::Funding, Status::SpoReview),
        FundingRejected => (Stage::Funding, Status::Rejected),
        FundingApproved => (Stage::Funding, Status::Approved),
        Live => (Stage::Live, Status::Active),
        ChangeReview => (Stage::Live, Status::ChangeReview),
        Archived => (Stage::Live, Status::Active),
    };
    CanonicalState::new(stage, status)
}

/// Inverse mapping. A left-inverse of `canonical_from_lifecycle` for every
/// reachable pair; ARCHIVED is the one collapsed value, so (LIVE, ACTIVE)
/// resolves to LIVE. Pairs unreachable through normal transitions return
/// `None`.
pub fn lifecycle_from_canonical(
    stage: WorkflowStage,
    status: WorkflowStatus,
) -> Option<LifecycleStatus> {
    use LifecycleStatus::*;
    use WorkflowStage as Stage;
    use WorkflowStatus as Status;

    match (stage, status) {
        (Stage::Proposal, Status::Draft) => Some(ProposalDraft),
        (Stage::Proposal, Status::SponsorReview) => Some(ProposalSponsorReview),
        (Stage::Proposal, Status::PgoFgoReview) => Some(ProposalGovernanceReview),
        (Stage::Proposal, Status::Rejected) => Some(ProposalRejected),
        (Stage::Proposal, Status::Approved) => Some(ProposalApproved),
        (Stage::Funding, Status::Draft) => Some(FundingDraft),
        (Stage::Funding, Status::SponsorReview) => Some(FundingSponsorReview),
        (Stage::Funding, Status::PgoFgoReview) => Some(FundingGovernanceReview),
        (Stage::Funding, Status::SpoReview) => Some(FundingSpoReview),
        (Stage::Funding, Status::Rejected) => Some(FundingRejected),
        (Stage::Funding, Status::Approved) => Some(FundingApproved),
        (Stage::Live, Status::Active) => Some(Live),
        (Stage::Live, Status::ChangeReview) => Some(ChangeReview),
        _ => None,
    }
}

/// Resolve the canonical pair for a record. The lifecycle status is
/// authoritative when present; otherwise the legacy free-text vocabulary
/// is matched after upper-casing, with workflow hints deciding the stage
/// for unknown legacy stages.
pub fn resolve_canonical_state(
    stage: Option<&str>,
    status: Option<&str>,
    workflow: &WorkflowState,
) -> CanonicalState {
    if let Some(lifecycle) = workflow.lifecycle_status {
        return canonical_from_lifecycle(lifecycle);
    }

    let canonical_stage = stage
        .map(|s| s.trim().to_uppercase())
        .and_then(|s| legacy_stage(&s))
        .unwrap_or_else(|| default_stage_from_hints(workflow));

    let canonical_status = status
        .map(|s| s.trim().to_uppercase())
        .and_then(|s| legacy_status(&s))
        .unwrap_or(WorkflowStatus::Draft);

    normalize(canonical_stage, canonical_status)
}

/// Legacy stage vocabulary accumulated over years of the portal
fn legacy_stage(value: &str) -> Option<WorkflowStage> {
    match value {
        "PROPOSAL" | "IDEA" | "CONCEPT" | "BUSINESS CASE" | "INTAKE" => {
            Some(WorkflowStage::Proposal)
        }
        "FUNDING" | "FUNDING REQUEST" | "INVESTMENT" | "BUSINESS CASE FUNDING" => {
            Some(WorkflowStage::Funding)
        }
        "LIVE" | "DELIVERY" | "IN DELIVERY" | "EXECUTION" | "IN FLIGHT" => {
            Some(WorkflowStage::Live)
        }
        _ => None,
    }
}

/// Legacy status vocabulary
fn legacy_status(value: &str) -> Option<WorkflowStatus> {
    match value {
        "DRAFT" | "NEW" | "NOT STARTED" => Some(WorkflowStatus::Draft),
        "SPONSOR REVIEW" | "WITH SPONSOR" | "PENDING SPONSOR" | "AWAITING SPONSOR" => {
            Some(WorkflowStatus::SponsorReview)
        }
        "PGO REVIEW" | "FGO REVIEW" | "PGO/FGO REVIEW" | "IN GOVERNANCE"
        | "GOVERNANCE REVIEW" => Some(WorkflowStatus::PgoFgoReview),
        "SPO REVIEW" | "WITH SPO" => Some(WorkflowStatus::SpoReview),
        "REJECTED" | "DECLINED" | "NOT APPROVED" => Some(WorkflowStatus::Rejected),
        "APPROVED" | "ENDORSED" | "FUNDED" => Some(WorkflowStatus::Approved),
        "ACTIVE" | "LIVE" | "IN PROGRESS" => Some(WorkflowStatus::Active),
        "CHANGE REVIEW" | "IN CHANGE" | "CHANGE PENDING" => Some(WorkflowStatus::ChangeReview),
        _ => None,
    }
}

/// Unknown legacy stage defaults to PROPOSAL unless workflow hints say
/// this is a funding record.
fn default_stage_from_hints(workflow: &WorkflowState) -> WorkflowStage {
    if workflow.entity_type == EntityType::FundingRequest {
        return WorkflowStage::Funding;
    }
    match workflow.funding_status.as_deref() {
        Some("Funded") | Some("Live") => WorkflowStage::Funding,
        _ => WorkflowStage::Proposal,
    }
}

/// Clamp legacy combinations onto a reachable pair.
fn normalize(stage: WorkflowStage, status: WorkflowStatus) -> CanonicalState {
    use WorkflowStage as Stage;
    use WorkflowStatus as Status;

    let status = match (stage, status) {
        // SPO review only exists at the funding stage
        (Stage::Proposal, Status::SpoReview) => Status::PgoFgoReview,
        // ACTIVE/CHANGE_REVIEW only exist at the live stage
        (Stage::Proposal | Stage::Funding, Status::Active | Status::ChangeReview) => {
            Status::Approved
        }
        // A live record is active unless in change review
        (Stage::Live, Status::ChangeReview) => Status::ChangeReview,
        (Stage::Live, _) => Status::Active,
        (_, s) => s,
    };
    CanonicalState::new(stage, status)
}

/// Canonical pair for a submission record.
pub fn resolve_canonical_workflow_state(submission: &Submission) -> CanonicalState {
    resolve_canonical_state(
        submission.stage.as_deref(),
        submission.status.as_deref(),
        &submission.workflow,
    )
}

/// Lifecycle status for a submission record, re-deriving from legacy
/// fields when the workflow block never recorded one.
pub fn resolve_workflow_lifecycle_status(submission: &Submission) -> LifecycleStatus {
    if let Some(lifecycle) = submission.workflow.lifecycle_status {
        return lifecycle;
    }
    let canonical = resolve_canonical_workflow_state(submission);
    lifecycle_from_canonical(canonical.stage, canonical.status)
        .unwrap_or(LifecycleStatus::ProposalDraft)
}

/// True only for the DRAFT-equivalent lifecycle values. LIVE-stage
/// submissions are never editable through the workflow path; amendments
/// go through change requests.
pub fn is_workflow_editable_status(
    lifecycle: LifecycleStatus,
    stage: Option<WorkflowStage>,
) -> bool {
    if stage == Some(WorkflowStage::Live) {
        return false;
    }
    matches!(
        lifecycle,
        LifecycleStatus::ProposalDraft | LifecycleStatus::FundingDraft
    )
}

/// Rewrite the legacy display fields from the canonical pair so stored
/// records never disagree with a freshly computed resolution.
pub fn sync_legacy_display(submission: &mut Submission) {
    let canonical = resolve_canonical_workflow_state(submission);
    submission.stage = Some(canonical.stage.to_string());
    submission.status = Some(canonical.status.to_string());
}
