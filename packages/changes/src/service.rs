// ABOUTME: Change request lifecycle operations: draft, submit, decide, implement, close
// ABOUTME: Deltas only reach the live submission through implementation, after a snapshot

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use stagegate_core::{
    validate_decision_comment, ApprovalDecision, ApprovalStatus, AuditSink, LifecycleStatus,
    Notification, NotificationDispatcher, Submission, ValidationError,
};
use stagegate_storage::{Repository, StorageError, StorageManager};
use stagegate_workflow::{resolve_workflow_lifecycle_status, sync_legacy_display};

use crate::severity::{severity_label, severity_score, ChangeThresholds, SeverityContext};
use crate::types::{
    ChangeApproval, ChangeApprovalRole, ChangeAttachment, ChangeComment, ChangeRequest,
    ChangeRequestCreateInput, ChangeStatus, FieldDelta, SubmissionSnapshot,
};

#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Submission {0} is not change-eligible in its current position")]
    NotChangeEligible(String),
    #[error("Change request {id} cannot be {action} from status {status:?}")]
    InvalidStatus {
        id: String,
        action: &'static str,
        status: ChangeStatus,
    },
    #[error("Field '{0}' cannot be amended through a change request")]
    ProtectedField(String),
    #[error("No pending change approval for role {0:?}")]
    NoPendingApproval(ChangeApprovalRole),
}

pub type ChangeResult<T> = Result<T, ChangeError>;

/// Submission fields a change request may never rewrite
const PROTECTED_FIELDS: [&str; 9] = [
    "id",
    "workflow",
    "approvalStages",
    "auditTrail",
    "assignments",
    "createdAt",
    "createdBy",
    "stage",
    "status",
];

/// Change request service over the shared record store
pub struct ChangeService {
    submissions: Repository<Submission>,
    changes: Repository<ChangeRequest>,
    thresholds: ChangeThresholds,
    dispatcher: Arc<dyn NotificationDispatcher>,
    audit: Arc<dyn AuditSink>,
}

impl ChangeService {
    pub fn new(
        manager: &StorageManager,
        thresholds: ChangeThresholds,
        dispatcher: Arc<dyn NotificationDispatcher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            submissions: manager.repository::<Submission>(),
            changes: manager.repository::<ChangeRequest>(),
            thresholds,
            dispatcher,
            audit,
        }
    }

    pub fn with_defaults(manager: &StorageManager) -> Self {
        Self::new(
            manager,
            ChangeThresholds::default(),
            Arc::new(stagegate_core::NullDispatcher),
            Arc::new(stagegate_core::TracingAuditSink),
        )
    }

    /// Create a draft against a live/approved project. Field deltas are
    /// computed here, old values from the live record, and the severity
    /// score from the configured thresholds.
    pub async fn create_change_request_draft(
        &self,
        submission_id: &str,
        input: ChangeRequestCreateInput,
    ) -> ChangeResult<ChangeRequest> {
        let submission = self.submissions.require(submission_id).await?;
        self.ensure_change_eligible(&submission)?;

        if input.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let deltas = compute_deltas(&submission, &input.field_changes)?;

        let prior_budget_delta = self.implemented_budget_delta(submission_id).await?;
        let context = SeverityContext {
            impact: input.impact.clone(),
            priority: input.priority.unwrap_or_default(),
            approved_budget: submission.budget,
            prior_budget_delta,
        };
        let score = severity_score(&context, &self.thresholds);

        let now = Utc::now();
        let change = ChangeRequest {
            id: nanoid::nanoid!(),
            submission_id: submission_id.to_string(),
            change_type: input.change_type,
            title: input.title,
            description: input.description,
            justification: input.justification,
            impact: input.impact,
            priority: input.priority.unwrap_or_default(),
            severity_score: score,
            severity: severity_label(score),
            status: ChangeStatus::Draft,
            deltas,
            approvals: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            snapshot: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            decided_at: None,
            implemented_at: None,
            closed_at: None,
        };

        self.changes.put(&change).await?;
        info!(
            "Created change request {} ({}) against {}",
            change.id, change.severity, submission_id
        );
        Ok(change)
    }

    /// Submit a draft: seeds the change-governance approval chain, moves
    /// the submission into change review, and notifies approvers.
    pub async fn submit_change_request(
        &self,
        change_id: &str,
        submitted_by: &str,
    ) -> ChangeResult<ChangeRequest> {
        let mut change = self.changes.require(change_id).await?;
        if change.status != ChangeStatus::Draft {
            return Err(ChangeError::InvalidStatus {
                id: change_id.to_string(),
                action: "submitted",
                status: change.status,
            });
        }

        let mut submission = self.submissions.require(&change.submission_id).await?;

        let now = Utc::now();
        change.status = ChangeStatus::UnderReview;
        change.submitted_at = Some(now);
        change.updated_at = now;
        change.approvals = ChangeApprovalRole::ALL
            .iter()
            .map(|&role| ChangeApproval {
                role,
                status: ApprovalStatus::Pending,
                decided_by: None,
                decided_at: None,
                comment: None,
            })
            .collect();
        self.changes.put(&change).await?;

        submission.workflow.lifecycle_status = Some(LifecycleStatus::ChangeReview);
        sync_legacy_display(&mut submission);
        submission.record_audit(
            submitted_by,
            "change:submitted",
            Some(format!("{} ({})", change.title, change.id)),
        );
        self.submissions.put(&submission).await?;
        if let Some(entry) = submission.audit_trail.last() {
            self.audit.append(&submission.id, entry).await;
        }

        self.notify_change_approvers(&submission, &change).await;

        info!(
            "Change request {} submitted for review on {}",
            change.id, change.submission_id
        );
        Ok(change)
    }

    /// Record one change-governance role's decision. All roles approving
    /// flips the change to APPROVED; any rejection flips it to REJECTED
    /// (comment mandatory) and returns the submission to LIVE.
    pub async fn decide_change_approval(
        &self,
        change_id: &str,
        role: ChangeApprovalRole,
        decision: ApprovalDecision,
        decided_by: &str,
        comment: Option<String>,
    ) -> ChangeResult<ChangeRequest> {
        validate_decision_comment(decision, comment.as_deref())?;

        let mut change = self.changes.require(change_id).await?;
        if change.status != ChangeStatus::UnderReview {
            return Err(ChangeError::InvalidStatus {
                id: change_id.to_string(),
                action: "decided",
                status: change.status,
            });
        }

        let now = Utc::now();
        let approval = change
            .approvals
            .iter_mut()
            .find(|a| a.role == role && a.status == ApprovalStatus::Pending)
            .ok_or(ChangeError::NoPendingApproval(role))?;
        approval.status = decision.into();
        approval.decided_by = Some(decided_by.to_string());
        approval.decided_at = Some(now);
        approval.comment = comment;

        match decision {
            ApprovalDecision::Rejected => {
                change.status = ChangeStatus::Rejected;
                change.decided_at = Some(now);
                self.return_submission_to_live(&change.submission_id, decided_by, "change:rejected")
                    .await?;
            }
            ApprovalDecision::Approved => {
                if change
                    .approvals
                    .iter()
                    .all(|a| a.status == ApprovalStatus::Approved)
                {
                    change.status = ChangeStatus::Approved;
                    change.decided_at = Some(now);
                }
            }
            ApprovalDecision::NeedMoreInfo => {}
        }

        change.updated_at = now;
        self.changes.put(&change).await?;
        debug!(
            "Change {} decision {:?} by {:?}, status now {:?}",
            change.id, decision, role, change.status
        );
        Ok(change)
    }

    /// The only operation allowed to write approved deltas back onto the
    /// live submission. A full-state snapshot is taken immediately before
    /// applying them; rollback from it is manual, never automatic.
    pub async fn implement_change_request(
        &self,
        change_id: &str,
        implemented_by: &str,
        close_after_implement: bool,
    ) -> ChangeResult<ChangeRequest> {
        let mut change = self.changes.require(change_id).await?;
        if change.status != ChangeStatus::Approved {
            return Err(ChangeError::InvalidStatus {
                id: change_id.to_string(),
                action: "implemented",
                status: change.status,
            });
        }

        let submission = self.submissions.require(&change.submission_id).await?;
        let now = Utc::now();

        change.snapshot = Some(SubmissionSnapshot {
            taken_at: now,
            submission: serde_json::to_value(&submission).map_err(StorageError::Json)?,
        });

        let mut updated = apply_deltas(&submission, &change.deltas)?;
        if change.impact.budget_delta != 0.0 {
            updated.budget = Some(updated.budget.unwrap_or(0.0) + change.impact.budget_delta);
        }
        updated.workflow.lifecycle_status = Some(LifecycleStatus::Live);
        sync_legacy_display(&mut updated);
        updated.record_audit(
            implemented_by,
            "change:implemented",
            Some(format!("{} ({})", change.title, change.id)),
        );
        self.submissions.put(&updated).await?;
        if let Some(entry) = updated.audit_trail.last() {
            self.audit.append(&updated.id, entry).await;
        }

        change.status = ChangeStatus::Implemented;
        change.implemented_at = Some(now);
        if close_after_implement {
            change.status = ChangeStatus::Closed;
            change.closed_at = Some(now);
        }
        change.updated_at = now;
        self.changes.put(&change).await?;

        info!(
            "Change request {} implemented on {} ({} deltas)",
            change.id,
            change.submission_id,
            change.deltas.len()
        );
        Ok(change)
    }

    pub async fn close_change_request(&self, change_id: &str) -> ChangeResult<ChangeRequest> {
        let mut change = self.changes.require(change_id).await?;
        if change.status != ChangeStatus::Implemented {
            return Err(ChangeError::InvalidStatus {
                id: change_id.to_string(),
                action: "closed",
                status: change.status,
            });
        }
        let now = Utc::now();
        change.status = ChangeStatus::Closed;
        change.closed_at = Some(now);
        change.updated_at = now;
        self.changes.put(&change).await?;
        Ok(change)
    }

    pub async fn get_change_request_details(&self, change_id: &str) -> ChangeResult<ChangeRequest> {
        Ok(self.changes.require(change_id).await?)
    }

    /// All change requests for a submission, newest first.
    pub async fn list_change_requests_with_details(
        &self,
        submission_id: &str,
    ) -> ChangeResult<Vec<ChangeRequest>> {
        let mut changes: Vec<ChangeRequest> = self
            .changes
            .list()
            .await?
            .into_iter()
            .filter(|c| c.submission_id == submission_id)
            .collect();
        changes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(changes)
    }

    pub async fn add_change_request_comment(
        &self,
        change_id: &str,
        author: &str,
        body: &str,
    ) -> ChangeResult<ChangeRequest> {
        let mut change = self.changes.require(change_id).await?;
        change.comments.push(ChangeComment {
            id: nanoid::nanoid!(),
            author: author.to_string(),
            body: body.to_string(),
            at: Utc::now(),
        });
        change.updated_at = Utc::now();
        self.changes.put(&change).await?;
        Ok(change)
    }

    pub async fn add_change_request_attachment(
        &self,
        change_id: &str,
        file_name: &str,
        content_type: Option<String>,
        reference: &str,
        uploaded_by: &str,
    ) -> ChangeResult<ChangeRequest> {
        let mut change = self.changes.require(change_id).await?;
        change.attachments.push(ChangeAttachment {
            id: nanoid::nanoid!(),
            file_name: file_name.to_string(),
            content_type,
            reference: reference.to_string(),
            uploaded_by: uploaded_by.to_string(),
            at: Utc::now(),
        });
        change.updated_at = Utc::now();
        self.changes.put(&change).await?;
        Ok(change)
    }

    /// Change requests exist only for projects at the APPROVED/LIVE
    /// canonical position; drafts and in-review submissions are amended
    /// directly through the workflow path instead.
    fn ensure_change_eligible(&self, submission: &Submission) -> ChangeResult<()> {
        let lifecycle = resolve_workflow_lifecycle_status(submission);
        match lifecycle {
            LifecycleStatus::FundingApproved
            | LifecycleStatus::Live
            | LifecycleStatus::ChangeReview => Ok(()),
            _ => Err(ChangeError::NotChangeEligible(submission.id.clone())),
        }
    }

    /// Budget deltas already applied to this submission, for cumulative
    /// escalation scoring
    async fn implemented_budget_delta(&self, submission_id: &str) -> ChangeResult<f64> {
        let changes = self.changes.list().await?;
        Ok(changes
            .iter()
            .filter(|c| {
                c.submission_id == submission_id
                    && matches!(
                        c.status,
                        ChangeStatus::Implemented | ChangeStatus::Closed
                    )
            })
            .map(|c| c.impact.budget_delta)
            .sum())
    }

    async fn return_submission_to_live(
        &self,
        submission_id: &str,
        actor: &str,
        action: &str,
    ) -> ChangeResult<()> {
        let mut submission = self.submissions.require(submission_id).await?;
        submission.workflow.lifecycle_status = Some(LifecycleStatus::Live);
        sync_legacy_display(&mut submission);
        submission.record_audit(actor, action, None);
        self.submissions.put(&submission).await?;
        Ok(())
    }

    async fn notify_change_approvers(&self, submission: &Submission, change: &ChangeRequest) {
        let recipients = [
            submission.business_sponsor.as_ref(),
            submission.finance_sponsor.as_ref(),
        ];
        for contact in recipients.into_iter().flatten() {
            let Some(email) = contact.email.clone() else {
                continue;
            };
            let notification = Notification {
                recipient_email: email,
                subject: format!("Change approval requested: {}", change.title),
                body: format!(
                    "A {} change against \"{}\" needs your decision.",
                    change.severity, submission.title
                ),
                entity_id: change.id.clone(),
            };
            if let Err(e) = self.dispatcher.dispatch(notification).await {
                warn!(
                    "Change notification for {} failed (non-blocking): {}",
                    change.id, e
                );
            }
        }
    }
}

/// One delta per field whose proposed value differs from the live record
fn compute_deltas(
    submission: &Submission,
    field_changes: &serde_json::Map<String, serde_json::Value>,
) -> ChangeResult<Vec<FieldDelta>> {
    let current = serde_json::to_value(submission).map_err(StorageError::Json)?;
    let mut deltas = Vec::new();

    for (field, new_value) in field_changes {
        if PROTECTED_FIELDS.contains(&field.as_str()) {
            return Err(ChangeError::ProtectedField(field.clone()));
        }
        let old_value = current
            .get(field)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        if old_value != *new_value {
            deltas.push(FieldDelta {
                field: field.clone(),
                old_value,
                new_value: new_value.clone(),
            });
        }
    }
    Ok(deltas)
}

/// Apply approved deltas onto the submission's JSON form
fn apply_deltas(submission: &Submission, deltas: &[FieldDelta]) -> ChangeResult<Submission> {
    let mut value = serde_json::to_value(submission).map_err(StorageError::Json)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| StorageError::InvalidFormat("submission".to_string()))?;
    for delta in deltas {
        object.insert(delta.field.clone(), delta.new_value.clone());
    }
    Ok(serde_json::from_value(value).map_err(StorageError::Json)?)
}
