// ABOUTME: Canonical state resolution and role-context rules for the portal workflow
// ABOUTME: Pure function layer; persistence and request orchestration live upstream

pub mod actions;
pub mod canonical;
pub mod roles;

pub use actions::{apply_action, WorkflowAction, WorkflowError, WorkflowResult};
pub use canonical::{
    canonical_from_lifecycle, is_workflow_editable_status, lifecycle_from_canonical,
    resolve_canonical_state, resolve_canonical_workflow_state, resolve_workflow_lifecycle_status,
    sync_legacy_display, CanonicalState,
};
pub use roles::{required_role_contexts, resolve_approver, ApproverRef};
