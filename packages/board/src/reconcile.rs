// ABOUTME: Inline reconciliation of the governance board against canonical workflow state
// ABOUTME: Cards are created, reset, and retired on every read; no timers or background workers

use thiserror::Error;
use tracing::{debug, info, warn};

use stagegate_core::{ApprovalStatus, LifecycleStatus, Submission};
use stagegate_storage::{Repository, StorageError, StorageManager};
use stagegate_workflow::{resolve_workflow_lifecycle_status, sync_legacy_display};

use crate::types::{BoardLane, BoardPhase, WorkCard, WorkTaskStatus};

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Task not found on card {card_id}: {task_id}")]
    TaskNotFound { card_id: String, task_id: String },
}

pub type BoardResult<T> = Result<T, BoardError>;

/// Lifecycle statuses that put a submission in the governance-review queue
const ELIGIBLE: [LifecycleStatus; 3] = [
    LifecycleStatus::ProposalGovernanceReview,
    LifecycleStatus::FundingSponsorReview,
    LifecycleStatus::FundingGovernanceReview,
];

/// Governance board service; reconciliation runs inline on read
pub struct BoardService {
    submissions: Repository<Submission>,
    cards: Repository<WorkCard>,
}

impl BoardService {
    pub fn new(manager: &StorageManager) -> Self {
        Self {
            submissions: manager.repository::<Submission>(),
            cards: manager.repository::<WorkCard>(),
        }
    }

    /// Read the board. On each read: recompute eligibility for every
    /// submission, retire cards whose submission left the queue, ensure
    /// two freshly-seeded cards per eligible submission, and reset any
    /// card whose governance sub-phase changed since the last read.
    pub async fn list_board_cards(&self) -> BoardResult<Vec<WorkCard>> {
        let submissions = self.submissions.list().await?;
        let mut cards = self.cards.list().await?;
        let before = cards.len();

        let mut eligible: Vec<(String, BoardPhase)> = Vec::new();
        for submission in &submissions {
            match self.reconcile_submission(submission).await {
                Ok(Some(phase)) => eligible.push((submission.id.clone(), phase)),
                Ok(None) => {}
                Err(e) => {
                    // A bad record never fails the whole board read
                    warn!(
                        "Skipping board reconciliation for {}: {}",
                        submission.id, e
                    );
                }
            }
        }

        // Retire cards whose submission is no longer in review
        cards.retain(|card| {
            let keep = eligible.iter().any(|(id, _)| *id == card.submission_id);
            if !keep {
                info!("Retiring board card {}", card.id);
            }
            keep
        });

        for (submission_id, phase) in &eligible {
            for lane in BoardLane::ALL {
                let id = WorkCard::card_id(submission_id, lane);
                match cards.iter_mut().find(|c| c.id == id) {
                    Some(card) if card.phase != *phase => {
                        info!("Card {} changed phase, reseeding tasks", card.id);
                        card.reset_to_phase(*phase);
                    }
                    Some(_) => {}
                    None => {
                        debug!("Creating board card {}", id);
                        cards.push(WorkCard::new(submission_id, lane, *phase));
                    }
                }
            }
        }

        if cards.len() != before || !eligible.is_empty() {
            self.cards.write_all(&cards).await?;
        }

        cards.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cards)
    }

    /// Work a card's gating task. Titles and due dates stay derived;
    /// only the status is caller-editable.
    pub async fn update_task_status(
        &self,
        card_id: &str,
        task_id: &str,
        status: WorkTaskStatus,
    ) -> BoardResult<WorkCard> {
        let mut card = self.cards.require(card_id).await?;
        let task = card
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::TaskNotFound {
                card_id: card_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        task.status = status;
        card.updated_at = chrono::Utc::now();
        self.cards.put(&card).await?;
        Ok(card)
    }

    pub async fn mark_governance_characteristics_updated(
        &self,
        card_id: &str,
    ) -> BoardResult<WorkCard> {
        let mut card = self.cards.require(card_id).await?;
        card.characteristics_updated = true;
        card.updated_at = chrono::Utc::now();
        self.cards.put(&card).await?;
        Ok(card)
    }

    /// Eligibility plus the auto-advance rule: a funding submission in
    /// sponsor review whose recorded approval stages are all APPROVED is
    /// moved into governance review on read, no human trigger needed.
    async fn reconcile_submission(
        &self,
        submission: &Submission,
    ) -> BoardResult<Option<BoardPhase>> {
        let mut lifecycle = resolve_workflow_lifecycle_status(submission);

        if lifecycle == LifecycleStatus::FundingSponsorReview
            && all_stages_approved(submission)
        {
            info!(
                "All sponsor approvals recorded for {}, advancing to governance review",
                submission.id
            );
            let mut updated = submission.clone();
            updated.workflow.lifecycle_status = Some(LifecycleStatus::FundingGovernanceReview);
            sync_legacy_display(&mut updated);
            updated.record_audit(
                "system",
                "workflow:auto-advance",
                Some("FundingSponsorReview -> FundingGovernanceReview".to_string()),
            );
            self.submissions.put(&updated).await?;
            lifecycle = LifecycleStatus::FundingGovernanceReview;
        }

        if !ELIGIBLE.contains(&lifecycle) {
            return Ok(None);
        }

        let phase = match lifecycle {
            LifecycleStatus::ProposalGovernanceReview => BoardPhase::Proposal,
            _ => BoardPhase::Funding,
        };
        Ok(Some(phase))
    }
}

fn all_stages_approved(submission: &Submission) -> bool {
    !submission.approval_stages.is_empty()
        && submission
            .approval_stages
            .iter()
            .all(|s| s.status == ApprovalStatus::Approved)
}
