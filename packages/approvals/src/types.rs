// ABOUTME: Approval request record and decision input types
// ABOUTME: One row per (entity, role-context) attempt at obtaining a decision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagegate_core::{
    ApprovalDecision, ApprovalStatus, EntityType, Identity, Principal, RoleContext, StageContext,
};
use stagegate_storage::Record;

/// One tracked attempt to obtain a role-context's decision on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "entityType")]
    pub entity_type: EntityType,
    #[serde(rename = "stageContext")]
    pub stage_context: StageContext,
    #[serde(rename = "roleContext")]
    pub role_context: RoleContext,
    #[serde(rename = "approverUserId")]
    pub approver_user_id: Option<String>,
    #[serde(rename = "approverEmail")]
    pub approver_email: Option<String>,
    #[serde(rename = "approverObjectId")]
    pub approver_object_id: Option<String>,
    #[serde(rename = "approverName")]
    pub approver_name: Option<String>,
    pub status: ApprovalStatus,
    #[serde(rename = "requestedBy")]
    pub requested_by: String,
    #[serde(rename = "requestedAt")]
    pub requested_at: DateTime<Utc>,
    #[serde(rename = "decidedAt")]
    pub decided_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    #[serde(rename = "cancelReason")]
    pub cancel_reason: Option<String>,
}

impl ApprovalRequest {
    pub fn approver_identity(&self) -> Identity {
        Identity {
            user_id: self.approver_user_id.clone(),
            email: self.approver_email.clone(),
            object_id: self.approver_object_id.clone(),
        }
    }

    /// A request an approver can still act on
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            ApprovalStatus::Pending | ApprovalStatus::NeedMoreInfo
        )
    }
}

impl Record for ApprovalRequest {
    const COLLECTION: &'static str = "approval_requests";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Input for deciding a pending approval request
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub principal: Principal,
    pub decision: ApprovalDecision,
    /// Narrows matching to one stage context when the approver holds
    /// requests at several stages
    pub stage: Option<StageContext>,
    /// Pins the decision to one request row when supplied
    pub request_id: Option<String>,
    pub comment: Option<String>,
}
