// ABOUTME: Role-context resolution, deciding who must approve a submission next
// ABOUTME: Contact fallback chain from structured refs to legacy flat sponsor fields

use stagegate_core::{Identity, RoleContext, Submission, WorkflowStage, WorkflowStatus};

use crate::canonical::resolve_canonical_workflow_state;

/// A concrete person resolved for a role-context
#[derive(Debug, Clone, PartialEq)]
pub struct ApproverRef {
    pub role: RoleContext,
    pub identity: Identity,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The named roles that must approve a submission at its current
/// canonical position.
///
/// PROPOSAL/SPONSOR_REVIEW requires exactly the business sponsor.
/// FUNDING in sponsor or PGO/FGO review requires the business sponsor
/// plus every optional sponsor role whose contact is populated; an
/// unassigned role is never required. Everything else has no open gate.
pub fn required_role_contexts(submission: &Submission) -> Vec<RoleContext> {
    let canonical = resolve_canonical_workflow_state(submission);

    match (canonical.stage, canonical.status) {
        (WorkflowStage::Proposal, WorkflowStatus::SponsorReview) => {
            vec![RoleContext::BusinessSponsor]
        }
        (WorkflowStage::Funding, WorkflowStatus::SponsorReview | WorkflowStatus::PgoFgoReview) => {
            let mut roles = vec![RoleContext::BusinessSponsor];
            for role in [
                RoleContext::BusinessDelegate,
                RoleContext::FinanceSponsor,
                RoleContext::TechSponsor,
                RoleContext::BenefitsSponsor,
            ] {
                if submission
                    .contact_for_role(role)
                    .is_some_and(|c| c.is_addressable())
                {
                    roles.push(role);
                }
            }
            roles
        }
        _ => Vec::new(),
    }
}

/// Resolve the concrete approver for a role-context.
///
/// Fallback chain: structured contact reference, then (for the business
/// sponsor only) the legacy flat sponsor fields, then none — a role
/// nobody holds is skipped entirely.
pub fn resolve_approver(submission: &Submission, role: RoleContext) -> Option<ApproverRef> {
    if role == RoleContext::ProjectManager {
        let assignment = submission.assignment_for_role("project-manager")?;
        return Some(ApproverRef {
            role,
            identity: Identity {
                user_id: Some(assignment.user_id.clone()),
                email: assignment.email.clone(),
                object_id: None,
            },
            name: None,
            email: assignment.email.clone(),
        });
    }

    if let Some(contact) = submission.contact_for_role(role) {
        if contact.is_addressable() {
            return Some(ApproverRef {
                role,
                identity: contact.identity(),
                name: contact.display_name.clone(),
                email: contact.email.clone(),
            });
        }
    }

    // Legacy records carried a single flat sponsor name/email pair
    if role == RoleContext::BusinessSponsor {
        let name = submission.sponsor_name.as_deref().filter(|n| !n.is_empty());
        let email = submission.sponsor_email.as_deref().filter(|e| !e.is_empty());
        if name.is_some() || email.is_some() {
            return Some(ApproverRef {
                role,
                identity: Identity {
                    user_id: None,
                    email: email.map(str::to_string),
                    object_id: None,
                },
                name: name.map(str::to_string),
                email: email.map(str::to_string),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use stagegate_core::{ContactRef, LifecycleStatus, WorkflowState};

    fn contact(email: &str, name: &str) -> ContactRef {
        ContactRef {
            user_id: None,
            email: Some(email.to_string()),
            object_id: None,
            display_name: Some(name.to_string()),
        }
    }

    fn submission_at(lifecycle: LifecycleStatus) -> Submission {
        let now = Utc::now();
        Submission {
            id: "s-1".to_string(),
            title: "Terminal upgrade".to_string(),
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
    fn test_proposal_sponsor_review_requires_business_sponsor_only() {
        let mut submission = submission_at(LifecycleStatus::ProposalSponsorReview);
        submission.business_sponsor = Some(contact("bs@example.com", "Pat"));
        submission.finance_sponsor = Some(contact("fs@example.com", "Sam"));

        assert_eq!(
            required_role_contexts(&submission),
            vec![RoleContext::BusinessSponsor]
        );
    }

    #[test]
    fn test_funding_sponsor_review_requires_only_populated_roles() {
        let mut submission = submission_at(LifecycleStatus::FundingSponsorReview);
        submission.business_sponsor = Some(contact("bs@example.com", "Pat"));
        submission.finance_sponsor = Some(contact("fs@example.com", "Sam"));

        assert_eq!(
            required_role_contexts(&submission),
            vec![RoleContext::BusinessSponsor, RoleContext::FinanceSponsor]
        );
    }

    #[test]
    fn test_states_without_gates_require_nothing() {
        for lifecycle in [
            LifecycleStatus::ProposalDraft,
            LifecycleStatus::ProposalGovernanceReview,
            LifecycleStatus::FundingSpoReview,
            LifecycleStatus::Live,
            LifecycleStatus::Archived,
        ] {
            let submission = submission_at(lifecycle);
            assert!(required_role_contexts(&submission).is_empty());
        }
    }

    #[test]
    fn test_approver_falls_back_to_legacy_flat_fields() {
        let mut submission = submission_at(LifecycleStatus::ProposalSponsorReview);
        submission.sponsor_name = Some("Kim Legacy".to_string());
        submission.sponsor_email = Some("kim@example.com".to_string());

        let approver = resolve_approver(&submission, RoleContext::BusinessSponsor).unwrap();
        assert_eq!(approver.email.as_deref(), Some("kim@example.com"));
        assert_eq!(approver.name.as_deref(), Some("Kim Legacy"));
    }

    #[test]
    fn test_unassigned_role_resolves_to_none() {
        let submission = submission_at(LifecycleStatus::FundingSponsorReview);
        assert!(resolve_approver(&submission, RoleContext::TechSponsor).is_none());
        assert!(resolve_approver(&submission, RoleContext::BusinessSponsor).is_none());
    }

    #[test]
    fn test_structured_contact_wins_over_legacy_fields() {
        let mut submission = submission_at(LifecycleStatus::ProposalSponsorReview);
        submission.business_sponsor = Some(contact("new@example.com", "New Sponsor"));
        submission.sponsor_email = Some("old@example.com".to_string());

        let approver = resolve_approver(&submission, RoleContext::BusinessSponsor).unwrap();
        assert_eq!(approver.email.as_deref(), Some("new@example.com"));
    }
}
