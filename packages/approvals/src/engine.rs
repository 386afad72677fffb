// ABOUTME: Approval decision engine and workflow-action orchestration
// ABOUTME: Applies decisions, advances canonical state, and retracts stale requests

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use stagegate_core::{
    validate_decision_comment, ApprovalDecision, ApprovalStage, ApprovalStatus, AuditSink,
    Notification, NotificationDispatcher, Principal, RoleContext, StageContext, Submission,
    UserDirectory, ValidationError, WorkflowStage, WorkflowStatus,
};
use stagegate_storage::{Repository, StorageError, StorageManager};
use stagegate_workflow::{
    apply_action, required_role_contexts, resolve_canonical_workflow_state, sync_legacy_display,
    WorkflowAction, WorkflowError,
};

use crate::store::ApprovalRequestStore;
use crate::types::{ApprovalRequest, DecisionInput};

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Deliberately generic: callers must not learn who the real
    /// approver is from a failed decision attempt.
    #[error("No pending approval request assigned to this user for the selected stage")]
    NoPendingRequestForPrincipal,
}

pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Stage context an approval request raised right now would carry
pub fn stage_context_for_submission(submission: &Submission) -> StageContext {
    match resolve_canonical_workflow_state(submission).stage {
        WorkflowStage::Proposal => StageContext::Proposal,
        WorkflowStage::Funding | WorkflowStage::Live => StageContext::Funding,
    }
}

/// Orchestrates approval requests, decisions, and the workflow
/// transitions they feed.
pub struct ApprovalService {
    submissions: Repository<Submission>,
    requests: ApprovalRequestStore,
    directory: Arc<dyn UserDirectory>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    audit: Arc<dyn AuditSink>,
}

impl ApprovalService {
    pub fn new(
        manager: &StorageManager,
        directory: Arc<dyn UserDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            submissions: manager.repository::<Submission>(),
            requests: ApprovalRequestStore::new(manager.repository::<ApprovalRequest>()),
            directory,
            dispatcher,
            audit,
        }
    }

    /// Service with no directory, tracing-only audit, and dropped
    /// notifications.
    pub fn with_defaults(manager: &StorageManager) -> Self {
        Self::new(
            manager,
            Arc::new(stagegate_core::EmptyDirectory),
            Arc::new(stagegate_core::NullDispatcher),
            Arc::new(stagegate_core::TracingAuditSink),
        )
    }

    pub fn request_store(&self) -> &ApprovalRequestStore {
        &self.requests
    }

    /// Create PENDING requests for the given role-contexts and notify the
    /// approvers. Returns only newly created rows; duplicates are no-ops.
    pub async fn create_approval_requests_for_submission(
        &self,
        submission: &Submission,
        role_contexts: &[RoleContext],
        created_by: &str,
    ) -> ApprovalResult<Vec<ApprovalRequest>> {
        let created = self
            .requests
            .create_requests_for_submission(
                submission,
                role_contexts,
                Utc::now(),
                created_by,
                self.directory.as_ref(),
            )
            .await?;

        for request in &created {
            self.notify_requested(submission, request).await;
        }
        Ok(created)
    }

    /// Open requests assigned to the principal by any identity channel.
    pub async fn list_pending_approval_requests_for_principal(
        &self,
        principal: &Principal,
    ) -> ApprovalResult<Vec<ApprovalRequest>> {
        Ok(self.requests.list_open_for_principal(principal).await?)
    }

    /// Requests the principal raised, newest first.
    pub async fn list_approval_requests_initiated_by_principal(
        &self,
        principal: &Principal,
    ) -> ApprovalResult<Vec<ApprovalRequest>> {
        Ok(self.requests.list_initiated_by(principal).await?)
    }

    /// Raise a PM_ASSIGNMENT sign-off request for the project manager
    /// linked through assignments. No-op when no PM is assigned or a
    /// pending request already exists.
    pub async fn request_pm_assignment_approval(
        &self,
        submission_id: &str,
        created_by: &str,
    ) -> ApprovalResult<Vec<ApprovalRequest>> {
        let submission = self.submissions.require(submission_id).await?;
        self.create_approval_requests_for_submission(
            &submission,
            &[RoleContext::ProjectManager],
            created_by,
        )
        .await
    }

    /// Cancel pending requests a submission no longer needs.
    pub async fn cancel_pending_approval_requests_for_submission(
        &self,
        submission_id: &str,
        reason: &str,
    ) -> ApprovalResult<Vec<ApprovalRequest>> {
        let submission = self.submissions.require(submission_id).await?;
        Ok(self
            .requests
            .cancel_requests_no_longer_required(&submission, reason)
            .await?)
    }

    /// Apply an approver's decision to the open request matching the
    /// principal, then feed the resulting workflow transition.
    ///
    /// Zero matching rows is a client error, not a server fault; multiple
    /// candidates resolve to the first found. A decision by one person
    /// holding several role-contexts settles only the matched row.
    pub async fn decide_approval_request_for_principal(
        &self,
        submission_id: &str,
        input: DecisionInput,
    ) -> ApprovalResult<ApprovalRequest> {
        validate_decision_comment(input.decision, input.comment.as_deref())?;

        let mut submission = self.submissions.require(submission_id).await?;
        let candidates = self.requests.list_for_entity(submission_id).await?;

        let mut request = candidates
            .into_iter()
            .filter(|r| r.is_open())
            .filter(|r| input.request_id.as_deref().map_or(true, |id| r.id == id))
            .filter(|r| input.stage.map_or(true, |s| r.stage_context == s))
            .find(|r| input.principal.identity.matches(&r.approver_identity()))
            .ok_or(ApprovalError::NoPendingRequestForPrincipal)?;

        let now = Utc::now();
        request.status = input.decision.into();
        request.decided_at = Some(now);
        request.comment = input.comment.clone();
        self.requests.put(&request).await?;

        info!(
            "Approval request {} on {} decided {:?} by {}",
            request.id,
            submission_id,
            input.decision,
            input.principal.display_label()
        );

        upsert_approval_stage(
            &mut submission,
            request.stage_context,
            request.role_context,
            request.status,
            Some(input.principal.display_label()),
        );
        if request.role_context == RoleContext::BusinessSponsor {
            submission.workflow.sponsor_decision = Some(input.decision);
        }

        self.advance_after_decision(&mut submission, &request, input.decision);

        sync_legacy_display(&mut submission);
        submission.record_audit(
            &input.principal.display_label(),
            "approval:decision",
            Some(format!("{:?} as {}", input.decision, request.role_context)),
        );
        self.submissions.put(&submission).await?;

        if let Some(entry) = submission.audit_trail.last() {
            self.audit.append(&submission.id, entry).await;
        }

        self.requests
            .cancel_requests_no_longer_required(&submission, "No longer required after decision")
            .await?;

        Ok(request)
    }

    /// Apply a user-triggered workflow action, persist the result, and
    /// reconcile the open request set with the new position.
    pub async fn apply_workflow_action(
        &self,
        submission_id: &str,
        action: WorkflowAction,
        principal: &Principal,
    ) -> ApprovalResult<Submission> {
        let mut submission = self.submissions.require(submission_id).await?;
        apply_action(&mut submission, action, &principal.display_label())?;
        self.submissions.put(&submission).await?;

        let required = required_role_contexts(&submission);
        if !required.is_empty() {
            let created = self
                .create_approval_requests_for_submission(
                    &submission,
                    &required,
                    principal
                        .identity
                        .user_id
                        .as_deref()
                        .unwrap_or("system"),
                )
                .await?;
            let mut touched = false;
            for request in &created {
                upsert_approval_stage(
                    &mut submission,
                    request.stage_context,
                    request.role_context,
                    ApprovalStatus::Pending,
                    None,
                );
                touched = true;
            }
            if touched {
                self.submissions.put(&submission).await?;
            }
        }

        self.requests
            .cancel_requests_no_longer_required(&submission, "Workflow position changed")
            .await?;

        if let Some(entry) = submission.audit_trail.last() {
            self.audit.append(&submission.id, entry).await;
        }

        Ok(submission)
    }

    /// Advance proposal-stage transitions straight from a decision.
    /// Funding submissions only record the stage outcome here; board
    /// reconciliation advances them once every stage is approved.
    fn advance_after_decision(
        &self,
        submission: &mut Submission,
        request: &ApprovalRequest,
        decision: ApprovalDecision,
    ) {
        use stagegate_core::LifecycleStatus;

        let canonical = resolve_canonical_workflow_state(submission);
        let next = match (canonical.stage, canonical.status, decision) {
            (WorkflowStage::Proposal, WorkflowStatus::SponsorReview, ApprovalDecision::Approved) => {
                Some(LifecycleStatus::ProposalGovernanceReview)
            }
            (WorkflowStage::Proposal, WorkflowStatus::SponsorReview, ApprovalDecision::Rejected) => {
                Some(LifecycleStatus::ProposalRejected)
            }
            (
                WorkflowStage::Funding,
                WorkflowStatus::SponsorReview | WorkflowStatus::PgoFgoReview,
                ApprovalDecision::Rejected,
            ) => Some(LifecycleStatus::FundingRejected),
            _ => None,
        };

        if let Some(next) = next {
            debug!(
                "Decision on {} ({:?} by {:?}) advances submission to {:?}",
                submission.id, decision, request.role_context, next
            );
            submission.workflow.lifecycle_status = Some(next);
        }
    }

    async fn notify_requested(&self, submission: &Submission, request: &ApprovalRequest) {
        let Some(email) = request.approver_email.clone() else {
            debug!(
                "Approval request {} has no approver email, skipping notification",
                request.id
            );
            return;
        };
        let notification = Notification {
            recipient_email: email,
            subject: format!("Approval requested: {}", submission.title),
            body: format!(
                "You are asked to decide as {} on \"{}\".",
                request.role_context, submission.title
            ),
            entity_id: submission.id.clone(),
        };
        if let Err(e) = self.dispatcher.dispatch(notification).await {
            warn!(
                "Notification for approval request {} failed (non-blocking): {}",
                request.id, e
            );
        }
    }
}

/// Record the outcome of a stage evaluation on the submission, one row
/// per (stage, role) ever evaluated.
fn upsert_approval_stage(
    submission: &mut Submission,
    stage: StageContext,
    role: RoleContext,
    status: ApprovalStatus,
    decided_by: Option<String>,
) {
    let decided_at = match status {
        ApprovalStatus::Pending => None,
        _ => Some(Utc::now()),
    };
    match submission
        .approval_stages
        .iter_mut()
        .find(|s| s.stage == stage && s.role == role)
    {
        Some(existing) => {
            existing.status = status;
            existing.decided_by = decided_by;
            existing.decided_at = decided_at;
        }
        None => submission.approval_stages.push(ApprovalStage {
            stage,
            role,
            status,
            decided_by,
            decided_at,
        }),
    }
}
