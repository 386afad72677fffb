// ABOUTME: Work card and work task types for the governance board
// ABOUTME: Cards are keyed {submissionId}-{lane} and exist only while governance review is active

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use stagegate_storage::Record;

/// Board lanes; every eligible submission owns one card per lane
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardLane {
    Finance,
    ProjectGovernance,
}

impl BoardLane {
    pub const ALL: [BoardLane; 2] = [BoardLane::Finance, BoardLane::ProjectGovernance];

    pub fn slug(&self) -> &'static str {
        match self {
            BoardLane::Finance => "finance",
            BoardLane::ProjectGovernance => "project-governance",
        }
    }
}

impl fmt::Display for BoardLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardLane::Finance => write!(f, "Finance"),
            BoardLane::ProjectGovernance => write!(f, "Project Governance"),
        }
    }
}

/// Governance sub-phase a card tracks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardPhase {
    Proposal,
    Funding,
}

/// Due horizon for the proposal-phase seed task, in days. The funding
/// horizon is exactly double.
pub const PROPOSAL_DUE_DAYS: i64 = 5;
pub const FUNDING_DUE_DAYS: i64 = PROPOSAL_DUE_DAYS * 2;

impl BoardPhase {
    pub fn seed_title(&self) -> &'static str {
        match self {
            BoardPhase::Proposal => "Review proposal governance characteristics",
            BoardPhase::Funding => "Review funding governance characteristics",
        }
    }

    pub fn due_horizon(&self) -> Duration {
        match self {
            BoardPhase::Proposal => Duration::days(PROPOSAL_DUE_DAYS),
            BoardPhase::Funding => Duration::days(FUNDING_DUE_DAYS),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkTaskStatus {
    Open,
    InProgress,
    Done,
}

impl Default for WorkTaskStatus {
    fn default() -> Self {
        WorkTaskStatus::Open
    }
}

/// A gating task on a card. Title and due date are derived from the
/// submission's phase and are regenerated on phase change, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkTask {
    pub id: String,
    pub title: String,
    #[serde(rename = "dueDate")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub status: WorkTaskStatus,
}

impl WorkTask {
    /// The one seed task every card starts its phase with
    pub fn seed(phase: BoardPhase, now: DateTime<Utc>) -> Self {
        WorkTask {
            id: nanoid::nanoid!(),
            title: phase.seed_title().to_string(),
            due_date: now + phase.due_horizon(),
            status: WorkTaskStatus::Open,
        }
    }
}

/// A governance-board card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCard {
    /// `{submissionId}-{lane}`
    pub id: String,
    #[serde(rename = "submissionId")]
    pub submission_id: String,
    pub lane: BoardLane,
    pub phase: BoardPhase,
    pub tasks: Vec<WorkTask>,
    #[serde(rename = "characteristicsUpdated", default)]
    pub characteristics_updated: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl WorkCard {
    pub fn card_id(submission_id: &str, lane: BoardLane) -> String {
        format!("{}-{}", submission_id, lane.slug())
    }

    pub fn new(submission_id: &str, lane: BoardLane, phase: BoardPhase) -> Self {
        let now = Utc::now();
        WorkCard {
            id: Self::card_id(submission_id, lane),
            submission_id: submission_id.to_string(),
            lane,
            phase,
            tasks: vec![WorkTask::seed(phase, now)],
            characteristics_updated: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the task set with the new phase's seed. Due dates and
    /// titles are never migrated, only regenerated.
    pub fn reset_to_phase(&mut self, phase: BoardPhase) {
        let now = Utc::now();
        self.phase = phase;
        self.tasks = vec![WorkTask::seed(phase, now)];
        self.characteristics_updated = false;
        self.updated_at = now;
    }
}

impl Record for WorkCard {
    const COLLECTION: &'static str = "work_cards";

    fn record_id(&self) -> &str {
        &self.id
    }
}
