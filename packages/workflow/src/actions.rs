// ABOUTME: User-triggered workflow actions and their transition rules
// ABOUTME: Pure transitions over the lifecycle status; persistence happens upstream

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use stagegate_core::{ApprovalDecision, EntityType, LifecycleStatus, Submission};

use crate::canonical::{resolve_workflow_lifecycle_status, sync_legacy_display, CanonicalState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    SendToSponsor,
    ReturnToDraft,
    GovernanceApprove,
    GovernanceReject,
    SpoApprove,
    SpoReject,
    StartFunding,
    GoLive,
    Archive,
}

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Action {action:?} is not valid from lifecycle status {from:?}")]
    InvalidTransition {
        from: LifecycleStatus,
        action: WorkflowAction,
    },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Apply a workflow action to a submission, mutating lifecycle status,
/// recorded decisions, and the legacy display fields. Returns the
/// resulting canonical pair. Invalid transitions leave the record
/// untouched.
pub fn apply_action(
    submission: &mut Submission,
    action: WorkflowAction,
    actor: &str,
) -> WorkflowResult<CanonicalState> {
    use LifecycleStatus::*;

    let from = resolve_workflow_lifecycle_status(submission);

    let next = match (from, action) {
        (ProposalDraft, WorkflowAction::SendToSponsor) => ProposalSponsorReview,
        (FundingDraft, WorkflowAction::SendToSponsor) => FundingSponsorReview,

        (ProposalSponsorReview, WorkflowAction::ReturnToDraft) => ProposalDraft,
        (FundingSponsorReview, WorkflowAction::ReturnToDraft) => FundingDraft,

        (ProposalGovernanceReview, WorkflowAction::GovernanceApprove) => ProposalApproved,
        (ProposalGovernanceReview, WorkflowAction::GovernanceReject) => ProposalRejected,
        (FundingGovernanceReview, WorkflowAction::GovernanceApprove) => FundingSpoReview,
        (FundingGovernanceReview, WorkflowAction::GovernanceReject) => FundingRejected,

        (FundingSpoReview, WorkflowAction::SpoApprove) => FundingApproved,
        (FundingSpoReview, WorkflowAction::SpoReject) => FundingRejected,

        (ProposalApproved, WorkflowAction::StartFunding) => FundingDraft,
        (FundingApproved, WorkflowAction::GoLive) => Live,

        (ProposalRejected | FundingRejected | Live, WorkflowAction::Archive) => Archived,

        (from, action) => return Err(WorkflowError::InvalidTransition { from, action }),
    };

    record_decisions(submission, from, action);
    submission.workflow.lifecycle_status = Some(next);

    match next {
        FundingDraft if from == ProposalApproved => {
            submission.workflow.entity_type = EntityType::FundingRequest;
        }
        FundingApproved => {
            submission.workflow.funding_status = Some("Funded".to_string());
        }
        Live => {
            submission.workflow.funding_status = Some("Live".to_string());
        }
        _ => {}
    }

    sync_legacy_display(submission);
    submission.record_audit(
        actor,
        &format!("workflow:{:?}", action),
        Some(format!("{:?} -> {:?}", from, next)),
    );

    debug!("Applied {:?} to {}: {:?} -> {:?}", action, submission.id, from, next);
    Ok(crate::canonical::canonical_from_lifecycle(next))
}

/// Record governance/SPO decisions on the workflow state block
fn record_decisions(submission: &mut Submission, from: LifecycleStatus, action: WorkflowAction) {
    use LifecycleStatus::*;

    match action {
        WorkflowAction::GovernanceApprove => {
            submission.workflow.pgo_decision = Some(ApprovalDecision::Approved);
            if from == FundingGovernanceReview {
                submission.workflow.finance_decision = Some(ApprovalDecision::Approved);
            }
        }
        WorkflowAction::GovernanceReject => {
            submission.workflow.pgo_decision = Some(ApprovalDecision::Rejected);
            if from == FundingGovernanceReview {
                submission.workflow.finance_decision = Some(ApprovalDecision::Rejected);
            }
        }
        WorkflowAction::SpoApprove => {
            submission.workflow.spo_decision = Some(ApprovalDecision::Approved);
        }
        WorkflowAction::SpoReject => {
            submission.workflow.spo_decision = Some(ApprovalDecision::Rejected);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stagegate_core::{WorkflowStage, WorkflowStatus, WorkflowState};

    fn submission_at(lifecycle: LifecycleStatus) -> Submission {
        let now = Utc::now();
        Submission {
            id: "s-1".to_string(),
            title: "Warehouse automation".to_string(),
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
            created_by: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_send_to_sponsor_moves_draft_to_sponsor_review() {
        let mut submission = submission_at(LifecycleStatus::ProposalDraft);
        let canonical =
            apply_action(&mut submission, WorkflowAction::SendToSponsor, "u-1").unwrap();
        assert_eq!(canonical.stage, WorkflowStage::Proposal);
        assert_eq!(canonical.status, WorkflowStatus::SponsorReview);
        assert_eq!(
            submission.workflow.lifecycle_status,
            Some(LifecycleStatus::ProposalSponsorReview)
        );
        // Legacy display strings are rewritten, never left stale
        assert_eq!(submission.stage.as_deref(), Some("Proposal"));
        assert_eq!(submission.status.as_deref(), Some("Sponsor Review"));
        assert_eq!(submission.audit_trail.len(), 1);
    }

    #[test]
    fn test_invalid_transition_is_rejected_and_leaves_state_alone() {
        let mut submission = submission_at(LifecycleStatus::ProposalDraft);
        let err = apply_action(&mut submission, WorkflowAction::GoLive, "u-1").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: LifecycleStatus::ProposalDraft,
                action: WorkflowAction::GoLive,
            }
        );
        assert_eq!(
            submission.workflow.lifecycle_status,
            Some(LifecycleStatus::ProposalDraft)
        );
        assert!(submission.audit_trail.is_empty());
    }

    #[test]
    fn test_funding_governance_approval_records_decisions() {
        let mut submission = submission_at(LifecycleStatus::FundingGovernanceReview);
        apply_action(&mut submission, WorkflowAction::GovernanceApprove, "pgo").unwrap();
        assert_eq!(
            submission.workflow.lifecycle_status,
            Some(LifecycleStatus::FundingSpoReview)
        );
        assert_eq!(
            submission.workflow.pgo_decision,
            Some(ApprovalDecision::Approved)
        );
        assert_eq!(
            submission.workflow.finance_decision,
            Some(ApprovalDecision::Approved)
        );
    }

    #[test]
    fn test_full_happy_path_to_live() {
        let mut submission = submission_at(LifecycleStatus::ProposalGovernanceReview);
        apply_action(&mut submission, WorkflowAction::GovernanceApprove, "pgo").unwrap();
        apply_action(&mut submission, WorkflowAction::StartFunding, "pm").unwrap();
        assert_eq!(submission.workflow.entity_type, EntityType::FundingRequest);

        apply_action(&mut submission, WorkflowAction::SendToSponsor, "pm").unwrap();
        submission.workflow.lifecycle_status = Some(LifecycleStatus::FundingGovernanceReview);
        apply_action(&mut submission, WorkflowAction::GovernanceApprove, "pgo").unwrap();
        apply_action(&mut submission, WorkflowAction::SpoApprove, "spo").unwrap();
        assert_eq!(
            submission.workflow.funding_status.as_deref(),
            Some("Funded")
        );

        let canonical = apply_action(&mut submission, WorkflowAction::GoLive, "pm").unwrap();
        assert_eq!(canonical.stage, WorkflowStage::Live);
        assert_eq!(
            submission.workflow.funding_status.as_deref(),
            Some("Live")
        );
    }

    #[test]
    fn test_archive_from_terminal_states() {
        for lifecycle in [
            LifecycleStatus::ProposalRejected,
            LifecycleStatus::FundingRejected,
            LifecycleStatus::Live,
        ] {
            let mut submission = submission_at(lifecycle);
            apply_action(&mut submission, WorkflowAction::Archive, "admin").unwrap();
            assert_eq!(
                submission.workflow.lifecycle_status,
                Some(LifecycleStatus::Archived)
            );
        }
    }
}
