// ABOUTME: Durable ledger of approval requests with at-most-one-pending semantics
// ABOUTME: Creation is idempotent per (entity, role, approver); stale rows get cancelled

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use stagegate_core::{
    ApprovalStatus, Principal, RoleContext, StageContext, Submission, UserDirectory,
};
use stagegate_storage::{Repository, StorageResult};
use stagegate_workflow::{required_role_contexts, resolve_approver, ApproverRef};

use crate::types::ApprovalRequest;

/// Repository-backed approval request ledger
#[derive(Clone)]
pub struct ApprovalRequestStore {
    repo: Repository<ApprovalRequest>,
}

impl ApprovalRequestStore {
    pub fn new(repo: Repository<ApprovalRequest>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<ApprovalRequest>> {
        self.repo.get(id).await
    }

    pub async fn list_for_entity(&self, entity_id: &str) -> StorageResult<Vec<ApprovalRequest>> {
        let all = self.repo.list().await?;
        Ok(all.into_iter().filter(|r| r.entity_id == entity_id).collect())
    }

    /// Open requests assigned to a principal, across all entities.
    pub async fn list_open_for_principal(
        &self,
        principal: &Principal,
    ) -> StorageResult<Vec<ApprovalRequest>> {
        let all = self.repo.list().await?;
        Ok(all
            .into_iter()
            .filter(|r| r.is_open() && principal.identity.matches(&r.approver_identity()))
            .collect())
    }

    /// Requests a principal raised, newest first.
    pub async fn list_initiated_by(
        &self,
        principal: &Principal,
    ) -> StorageResult<Vec<ApprovalRequest>> {
        let user_id = match principal.identity.user_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Ok(Vec::new()),
        };
        let mut requests: Vec<ApprovalRequest> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|r| r.requested_by == user_id)
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    /// Insert a PENDING row for each resolved approver. A role with no
    /// resolvable name or email is skipped entirely, and an identical
    /// pending row makes creation a no-op for that role. Returns only the
    /// newly created rows.
    pub async fn create_requests_for_submission(
        &self,
        submission: &Submission,
        role_contexts: &[RoleContext],
        requested_at: DateTime<Utc>,
        created_by: &str,
        directory: &dyn UserDirectory,
    ) -> StorageResult<Vec<ApprovalRequest>> {
        let mut all = self.repo.list().await?;
        let mut created = Vec::new();

        for &role in role_contexts {
            let Some(mut approver) = resolve_approver(submission, role) else {
                debug!(
                    "Skipping {} request for {}: no approver resolvable",
                    role, submission.id
                );
                continue;
            };

            if let Some(existing) = find_pending(&all, &submission.id, role, &approver) {
                debug!(
                    "Pending {} request already exists for {} ({})",
                    role, submission.id, existing.id
                );
                continue;
            }

            // Directory enrichment fills in missing identity channels so
            // later matching can work by id as well as email
            if approver.identity.user_id.is_none() {
                if let Some(email) = approver.email.clone() {
                    if let Some(user) = directory.find_user_by_email(&email).await {
                        approver.identity.user_id = Some(user.user_id);
                        approver.identity.object_id = user.object_id;
                        if approver.name.is_none() {
                            approver.name = Some(user.name);
                        }
                    }
                }
            }

            // PM assignment sign-off is its own stage context, outside
            // the proposal/funding gates
            let stage_context = if role == RoleContext::ProjectManager {
                StageContext::PmAssignment
            } else {
                crate::engine::stage_context_for_submission(submission)
            };

            let request = ApprovalRequest {
                id: nanoid::nanoid!(),
                entity_id: submission.id.clone(),
                entity_type: submission.workflow.entity_type,
                stage_context,
                role_context: role,
                approver_user_id: approver.identity.user_id.clone(),
                approver_email: approver.email.clone(),
                approver_object_id: approver.identity.object_id.clone(),
                approver_name: approver.name.clone(),
                status: ApprovalStatus::Pending,
                requested_by: created_by.to_string(),
                requested_at,
                decided_at: None,
                comment: None,
                cancel_reason: None,
            };
            info!(
                "Created approval request {} for {} ({:?} stage on {})",
                request.id, role, request.stage_context, submission.id
            );
            all.push(request.clone());
            created.push(request);
        }

        if !created.is_empty() {
            self.repo.write_all(&all).await?;
        }
        Ok(created)
    }

    /// Cancel PENDING rows whose role-context left the required set, or
    /// whose approver no longer matches the currently-assigned person.
    /// Runs whenever sponsor contacts or workflow position change, so a
    /// request sent to a since-replaced sponsor is retracted rather than
    /// left dangling.
    pub async fn cancel_requests_no_longer_required(
        &self,
        submission: &Submission,
        reason: &str,
    ) -> StorageResult<Vec<ApprovalRequest>> {
        let required = required_role_contexts(submission);
        let mut all = self.repo.list().await?;
        let mut cancelled = Vec::new();

        for request in all.iter_mut().filter(|r| {
            r.entity_id == submission.id
                && r.status == ApprovalStatus::Pending
                // The required-set rules govern the proposal/funding
                // gates; PM assignment requests are retired explicitly
                && r.stage_context != StageContext::PmAssignment
        }) {
            let still_required = required.contains(&request.role_context);
            let approver_unchanged = resolve_approver(submission, request.role_context)
                .is_some_and(|current| emails_match(&current.email, &request.approver_email));

            if still_required && approver_unchanged {
                continue;
            }

            request.status = ApprovalStatus::Cancelled;
            request.cancel_reason = Some(reason.to_string());
            request.decided_at = Some(Utc::now());
            info!(
                "Cancelled approval request {} for {}: {}",
                request.id, submission.id, reason
            );
            cancelled.push(request.clone());
        }

        if !cancelled.is_empty() {
            self.repo.write_all(&all).await?;
        }
        Ok(cancelled)
    }

    pub async fn put(&self, request: &ApprovalRequest) -> StorageResult<()> {
        self.repo.put(request).await
    }
}

fn find_pending<'a>(
    all: &'a [ApprovalRequest],
    entity_id: &str,
    role: RoleContext,
    approver: &ApproverRef,
) -> Option<&'a ApprovalRequest> {
    all.iter().find(|r| {
        r.entity_id == entity_id
            && r.status == ApprovalStatus::Pending
            && r.role_context == role
            && emails_match(&r.approver_email, &approver.email)
    })
}

fn emails_match(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}
