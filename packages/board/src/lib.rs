// ABOUTME: Governance board derived from, and reconciled against, canonical workflow state
// ABOUTME: Finance and Project Governance lanes with derived gating tasks

pub mod reconcile;
pub mod types;

pub use reconcile::{BoardError, BoardResult, BoardService};
pub use types::{
    BoardLane, BoardPhase, WorkCard, WorkTask, WorkTaskStatus, FUNDING_DUE_DAYS,
    PROPOSAL_DUE_DAYS,
};
