// ABOUTME: Integration tests for the approval request ledger and decision engine
// ABOUTME: Covers idempotent creation, identity matching, cancellation, and the proposal flow

use std::sync::Arc;

use pretty_assertions::assert_eq;
use stagegate_approvals::{ApprovalError, ApprovalService, DecisionInput};
use stagegate_core::test_support::{contact, full_contact, submission_at};
use stagegate_core::{
    ApprovalDecision, ApprovalStatus, Identity, LifecycleStatus, Principal, RecordingDispatcher,
    RoleContext, Submission,
};
use stagegate_storage::StorageManager;
use stagegate_workflow::{required_role_contexts, WorkflowAction};

async fn service_with_dispatcher() -> (StorageManager, ApprovalService, Arc<RecordingDispatcher>) {
    let manager = StorageManager::in_memory().await.unwrap();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = ApprovalService::new(
        &manager,
        Arc::new(stagegate_core::EmptyDirectory),
        dispatcher.clone(),
        Arc::new(stagegate_core::TracingAuditSink),
    );
    (manager, service, dispatcher)
}

fn sponsor_principal() -> Principal {
    Principal {
        identity: Identity::from_email("sponsor@example.com"),
        name: Some("Pat Sponsor".to_string()),
    }
}

async fn seed(manager: &StorageManager, submission: &Submission) {
    manager
        .repository::<Submission>()
        .put(submission)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_creation_never_yields_two_pending_rows() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-1", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat Sponsor"));
    seed(&manager, &submission).await;

    let first = service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    let second = service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();
    assert!(second.is_empty());

    let open = service
        .list_pending_approval_requests_for_principal(&sponsor_principal())
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_unassigned_roles_are_skipped_at_creation() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-2", LifecycleStatus::FundingSponsorReview);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat"));
    submission.finance_sponsor = Some(contact("finance@example.com", "Sam"));
    seed(&manager, &submission).await;

    let required = required_role_contexts(&submission);
    assert_eq!(
        required,
        vec![RoleContext::BusinessSponsor, RoleContext::FinanceSponsor]
    );

    let created = service
        .create_approval_requests_for_submission(&submission, &required, "u-pm")
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn test_decision_matches_by_any_identity_channel() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-3", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(full_contact(
        "u-77",
        "sponsor@example.com",
        "obj-77",
        "Pat Sponsor",
    ));
    seed(&manager, &submission).await;

    service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();

    // Email-only principal, with odd casing, finds the same row an
    // id-only principal would
    let by_email = Principal {
        identity: Identity::from_email("SPONSOR@example.com"),
        name: None,
    };
    let decided = service
        .decide_approval_request_for_principal(
            "s-3",
            DecisionInput {
                principal: by_email,
                decision: ApprovalDecision::Approved,
                stage: None,
                request_id: None,
                comment: Some("ok".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(decided.status, ApprovalStatus::Approved);

    let by_id = Principal {
        identity: Identity::from_user_id("u-77"),
        name: None,
    };
    let err = service
        .decide_approval_request_for_principal(
            "s-3",
            DecisionInput {
                principal: by_id,
                decision: ApprovalDecision::Approved,
                stage: None,
                request_id: None,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    // Same underlying row: once decided, nothing is left to match
    assert!(matches!(err, ApprovalError::NoPendingRequestForPrincipal));
}

#[tokio::test]
async fn test_wrong_principal_gets_generic_no_pending_error() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-4", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat"));
    seed(&manager, &submission).await;

    service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();

    let intruder = Principal {
        identity: Identity::from_email("somebody.else@example.com"),
        name: None,
    };
    let err = service
        .decide_approval_request_for_principal(
            "s-4",
            DecisionInput {
                principal: intruder,
                decision: ApprovalDecision::Approved,
                stage: None,
                request_id: None,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NoPendingRequestForPrincipal));
}

#[tokio::test]
async fn test_negative_decision_requires_comment() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-5", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat"));
    seed(&manager, &submission).await;
    service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();

    let err = service
        .decide_approval_request_for_principal(
            "s-5",
            DecisionInput {
                principal: sponsor_principal(),
                decision: ApprovalDecision::Rejected,
                stage: None,
                request_id: None,
                comment: Some("   ".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Validation(_)));
}

#[tokio::test]
async fn test_replacing_sponsor_cancels_the_stale_request() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-6", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(contact("old.sponsor@example.com", "Old Sponsor"));
    seed(&manager, &submission).await;

    service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();

    // Sponsor reassignment on the live record
    submission.business_sponsor = Some(contact("new.sponsor@example.com", "New Sponsor"));
    seed(&manager, &submission).await;

    let cancelled = service
        .cancel_pending_approval_requests_for_submission("s-6", "Sponsor reassigned")
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].status, ApprovalStatus::Cancelled);
    assert_eq!(
        cancelled[0].cancel_reason.as_deref(),
        Some("Sponsor reassigned")
    );
    assert_eq!(
        cancelled[0].approver_email.as_deref(),
        Some("old.sponsor@example.com")
    );

    // The retracted request was cancelled, never retroactively decided
    let old_sponsor = Principal {
        identity: Identity::from_email("old.sponsor@example.com"),
        name: None,
    };
    assert!(service
        .list_pending_approval_requests_for_principal(&old_sponsor)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_initiated_listing_is_newest_first() {
    let (manager, service, _) = service_with_dispatcher().await;
    for (id, email) in [("s-7a", "a@example.com"), ("s-7b", "b@example.com")] {
        let mut submission = submission_at(id, LifecycleStatus::ProposalSponsorReview);
        submission.business_sponsor = Some(contact(email, "Sponsor"));
        seed(&manager, &submission).await;
        service
            .create_approval_requests_for_submission(
                &submission,
                &[RoleContext::BusinessSponsor],
                "u-pm",
            )
            .await
            .unwrap();
    }

    let requester = Principal {
        identity: Identity::from_user_id("u-pm"),
        name: None,
    };
    let initiated = service
        .list_approval_requests_initiated_by_principal(&requester)
        .await
        .unwrap();
    assert_eq!(initiated.len(), 2);
    assert!(initiated[0].requested_at >= initiated[1].requested_at);
}

#[tokio::test]
async fn test_proposal_flow_from_draft_to_governance_review() {
    let (manager, service, dispatcher) = service_with_dispatcher().await;
    let mut submission = submission_at("s-8", LifecycleStatus::ProposalDraft);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat Sponsor"));
    seed(&manager, &submission).await;

    let pm = Principal {
        identity: Identity::from_user_id("u-pm"),
        name: Some("Morgan PM".to_string()),
    };

    // SEND_TO_SPONSOR moves the draft into sponsor review and raises
    // exactly one pending request for the business sponsor
    let after_send = service
        .apply_workflow_action("s-8", WorkflowAction::SendToSponsor, &pm)
        .await
        .unwrap();
    assert_eq!(
        after_send.workflow.lifecycle_status,
        Some(LifecycleStatus::ProposalSponsorReview)
    );

    let open = service
        .list_pending_approval_requests_for_principal(&sponsor_principal())
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].role_context, RoleContext::BusinessSponsor);
    assert_eq!(dispatcher.sent().await.len(), 1);

    // Sponsor approves with a comment; the submission advances to
    // PGO/FGO review
    let decided = service
        .decide_approval_request_for_principal(
            "s-8",
            DecisionInput {
                principal: sponsor_principal(),
                decision: ApprovalDecision::Approved,
                stage: None,
                request_id: None,
                comment: Some("ok".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(decided.status, ApprovalStatus::Approved);
    assert_eq!(decided.comment.as_deref(), Some("ok"));

    let stored = manager
        .repository::<Submission>()
        .require("s-8")
        .await
        .unwrap();
    assert_eq!(
        stored.workflow.lifecycle_status,
        Some(LifecycleStatus::ProposalGovernanceReview)
    );
    assert_eq!(
        stored.workflow.sponsor_decision,
        Some(ApprovalDecision::Approved)
    );
    assert_eq!(stored.stage.as_deref(), Some("Proposal"));
    assert_eq!(stored.status.as_deref(), Some("PGO/FGO Review"));
    assert_eq!(stored.approval_stages.len(), 1);
    assert_eq!(stored.approval_stages[0].status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_pm_assignment_requests_survive_the_required_set_cascade() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-10", LifecycleStatus::Live);
    submission.assignments.push(stagegate_core::Assignment {
        role: "project-manager".to_string(),
        user_id: "u-pm".to_string(),
        email: Some("pm@example.com".to_string()),
        assigned_at: chrono::Utc::now(),
    });
    seed(&manager, &submission).await;

    let created = service
        .request_pm_assignment_approval("s-10", "u-admin")
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(
        created[0].stage_context,
        stagegate_core::StageContext::PmAssignment
    );

    // A live submission has no required proposal/funding roles; the PM
    // sign-off must not be swept up by the reconciliation pass
    let cancelled = service
        .cancel_pending_approval_requests_for_submission("s-10", "Recheck")
        .await
        .unwrap();
    assert!(cancelled.is_empty());

    let pm = Principal {
        identity: Identity::from_email("pm@example.com"),
        name: None,
    };
    assert_eq!(
        service
            .list_pending_approval_requests_for_principal(&pm)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_sponsor_rejection_lands_rejected_with_comment() {
    let (manager, service, _) = service_with_dispatcher().await;
    let mut submission = submission_at("s-9", LifecycleStatus::ProposalSponsorReview);
    submission.business_sponsor = Some(contact("sponsor@example.com", "Pat"));
    seed(&manager, &submission).await;
    service
        .create_approval_requests_for_submission(
            &submission,
            &[RoleContext::BusinessSponsor],
            "u-pm",
        )
        .await
        .unwrap();

    service
        .decide_approval_request_for_principal(
            "s-9",
            DecisionInput {
                principal: sponsor_principal(),
                decision: ApprovalDecision::Rejected,
                stage: None,
                request_id: None,
                comment: Some("benefits case is too thin".to_string()),
            },
        )
        .await
        .unwrap();

    let stored = manager
        .repository::<Submission>()
        .require("s-9")
        .await
        .unwrap();
    assert_eq!(
        stored.workflow.lifecycle_status,
        Some(LifecycleStatus::ProposalRejected)
    );
}
