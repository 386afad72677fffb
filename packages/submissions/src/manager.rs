// ABOUTME: Submission CRUD entry points with validation and editability gating
// ABOUTME: Sponsor contact changes run the approval-request reconciliation cascade

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use stagegate_approvals::{ApprovalError, ApprovalService};
use stagegate_core::{
    validate_submission_create, ContactRef, LifecycleStatus, Submission, SubmissionCreateInput,
    ValidationError, WorkflowState,
};
use stagegate_storage::{Repository, StorageError, StorageManager};
use stagegate_workflow::{
    is_workflow_editable_status, resolve_canonical_workflow_state,
    resolve_workflow_lifecycle_status, sync_legacy_display,
};

/// Manager errors
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Submission {0} is not editable in its current workflow position")]
    NotEditable(String),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Input for updating a submission's own fields. `None` leaves a field
/// unchanged; sponsor contact updates reconcile open approval requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
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
}

impl SubmissionUpdateInput {
    fn touches_content(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.budget.is_some()
    }

    fn touches_contacts(&self) -> bool {
        self.business_sponsor.is_some()
            || self.business_delegate.is_some()
            || self.tech_sponsor.is_some()
            || self.finance_sponsor.is_some()
            || self.benefits_sponsor.is_some()
    }
}

/// Submission manager over the shared record store
pub struct SubmissionManager {
    submissions: Repository<Submission>,
    approvals: Arc<ApprovalService>,
}

impl SubmissionManager {
    pub fn new(manager: &StorageManager, approvals: Arc<ApprovalService>) -> Self {
        Self {
            submissions: manager.repository::<Submission>(),
            approvals,
        }
    }

    /// Creates a new submission in proposal draft
    pub async fn create_submission(
        &self,
        input: SubmissionCreateInput,
    ) -> ManagerResult<Submission> {
        let validation_errors = validate_submission_create(&input);
        if !validation_errors.is_empty() {
            return Err(ManagerError::Validation(validation_errors));
        }

        let now = Utc::now();
        let mut submission = Submission {
            id: stagegate_core::generate_record_id(),
            title: input.title,
            description: input.description,
            budget: None,
            stage: None,
            status: None,
            workflow: WorkflowState {
                entity_type: input.entity_type.unwrap_or_default(),
                lifecycle_status: Some(LifecycleStatus::ProposalDraft),
                ..WorkflowState::default()
            },
            business_sponsor: input.business_sponsor,
            business_delegate: input.business_delegate,
            tech_sponsor: input.tech_sponsor,
            finance_sponsor: input.finance_sponsor,
            benefits_sponsor: input.benefits_sponsor,
            sponsor_name: None,
            sponsor_email: None,
            approval_stages: Vec::new(),
            assignments: Vec::new(),
            audit_trail: Vec::new(),
            created_by: input.created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        sync_legacy_display(&mut submission);
        submission.record_audit(&input.created_by, "submission:created", None);

        self.submissions.put(&submission).await?;
        info!(
            "Created submission '{}' with ID {}",
            submission.title, submission.id
        );
        Ok(submission)
    }

    /// Gets a submission by ID, with legacy display fields re-derived
    pub async fn get_submission(&self, id: &str) -> ManagerResult<Option<Submission>> {
        let mut submission = self.submissions.get(id).await?;
        if let Some(ref mut sub) = submission {
            sync_legacy_display(sub);
        }
        Ok(submission)
    }

    /// Gets all submissions
    pub async fn list_submissions(&self) -> ManagerResult<Vec<Submission>> {
        let mut submissions = self.submissions.list().await?;
        for submission in &mut submissions {
            sync_legacy_display(submission);
        }
        debug!("Retrieved {} submissions", submissions.len());
        Ok(submissions)
    }

    /// Updates a submission. Content edits are gated on the DRAFT
    /// positions; sponsor contact changes are allowed at any point and
    /// retract requests sent to a since-replaced sponsor.
    pub async fn update_submission(
        &self,
        id: &str,
        updates: SubmissionUpdateInput,
    ) -> ManagerResult<Submission> {
        let mut submission = self.submissions.require(id).await?;

        if updates.touches_content() {
            let lifecycle = resolve_workflow_lifecycle_status(&submission);
            let canonical = resolve_canonical_workflow_state(&submission);
            if !is_workflow_editable_status(lifecycle, Some(canonical.stage)) {
                return Err(ManagerError::NotEditable(id.to_string()));
            }
        }

        if let Some(title) = updates.title.clone() {
            submission.title = title;
        }
        if let Some(description) = updates.description.clone() {
            submission.description = Some(description);
        }
        if let Some(budget) = updates.budget {
            submission.budget = Some(budget);
        }

        let contacts_changed = updates.touches_contacts();
        if let Some(contact) = updates.business_sponsor {
            submission.business_sponsor = Some(contact);
        }
        if let Some(contact) = updates.business_delegate {
            submission.business_delegate = Some(contact);
        }
        if let Some(contact) = updates.tech_sponsor {
            submission.tech_sponsor = Some(contact);
        }
        if let Some(contact) = updates.finance_sponsor {
            submission.finance_sponsor = Some(contact);
        }
        if let Some(contact) = updates.benefits_sponsor {
            submission.benefits_sponsor = Some(contact);
        }

        sync_legacy_display(&mut submission);
        submission.record_audit("system", "submission:updated", None);
        self.submissions.put(&submission).await?;

        if contacts_changed {
            self.approvals
                .cancel_pending_approval_requests_for_submission(id, "Sponsor assignment changed")
                .await?;
        }

        info!("Updated submission '{}' (ID: {})", submission.title, id);
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stagegate_core::test_support::contact;
    use stagegate_core::{EntityType, Identity, Principal, RoleContext};

    async fn setup() -> (StorageManager, SubmissionManager, Arc<ApprovalService>) {
        let storage = StorageManager::in_memory().await.unwrap();
        let approvals = Arc::new(ApprovalService::with_defaults(&storage));
        let manager = SubmissionManager::new(&storage, approvals.clone());
        (storage, manager, approvals)
    }

    fn create_input(title: &str) -> SubmissionCreateInput {
        SubmissionCreateInput {
            title: title.to_string(),
            description: Some("A capital project".to_string()),
            entity_type: Some(EntityType::ProjectProposal),
            business_sponsor: Some(contact("sponsor@example.com", "Pat")),
            business_delegate: None,
            tech_sponsor: None,
            finance_sponsor: None,
            benefits_sponsor: None,
            created_by: "u-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_starts_in_proposal_draft_with_display_synced() {
        let (_, manager, _) = setup().await;
        let submission = manager
            .create_submission(create_input("Depot expansion"))
            .await
            .unwrap();

        assert_eq!(
            submission.workflow.lifecycle_status,
            Some(LifecycleStatus::ProposalDraft)
        );
        assert_eq!(submission.stage.as_deref(), Some("Proposal"));
        assert_eq!(submission.status.as_deref(), Some("Draft"));
        assert_eq!(submission.audit_trail.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (_, manager, _) = setup().await;
        let err = manager
            .create_submission(create_input("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_content_edits_blocked_outside_draft() {
        let (_, manager, approvals) = setup().await;
        let submission = manager
            .create_submission(create_input("Depot expansion"))
            .await
            .unwrap();

        let pm = Principal {
            identity: Identity::from_user_id("u-1"),
            name: None,
        };
        approvals
            .apply_workflow_action(
                &submission.id,
                stagegate_workflow::WorkflowAction::SendToSponsor,
                &pm,
            )
            .await
            .unwrap();

        let err = manager
            .update_submission(
                &submission.id,
                SubmissionUpdateInput {
                    title: Some("Renamed".to_string()),
                    ..SubmissionUpdateInput::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::NotEditable(_)));
    }

    #[tokio::test]
    async fn test_contact_change_cancels_stale_requests() {
        let (_, manager, approvals) = setup().await;
        let submission = manager
            .create_submission(create_input("Depot expansion"))
            .await
            .unwrap();

        let pm = Principal {
            identity: Identity::from_user_id("u-1"),
            name: None,
        };
        approvals
            .apply_workflow_action(
                &submission.id,
                stagegate_workflow::WorkflowAction::SendToSponsor,
                &pm,
            )
            .await
            .unwrap();

        let old_sponsor = Principal {
            identity: Identity::from_email("sponsor@example.com"),
            name: None,
        };
        assert_eq!(
            approvals
                .list_pending_approval_requests_for_principal(&old_sponsor)
                .await
                .unwrap()
                .len(),
            1
        );

        manager
            .update_submission(
                &submission.id,
                SubmissionUpdateInput {
                    business_sponsor: Some(contact("replacement@example.com", "Riley")),
                    ..SubmissionUpdateInput::default()
                },
            )
            .await
            .unwrap();

        assert!(approvals
            .list_pending_approval_requests_for_principal(&old_sponsor)
            .await
            .unwrap()
            .is_empty());

        // The replacement sponsor picks up a fresh request on the next
        // reconciliation pass
        let updated = manager
            .get_submission(&submission.id)
            .await
            .unwrap()
            .unwrap();
        let created = approvals
            .create_approval_requests_for_submission(
                &updated,
                &[RoleContext::BusinessSponsor],
                "u-1",
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].approver_email.as_deref(),
            Some("replacement@example.com")
        );
    }
}
