// ABOUTME: Severity scoring for change requests from configured thresholds
// ABOUTME: Additive points per breached threshold; monotone in every input

use serde::{Deserialize, Serialize};

use crate::types::{ChangeImpact, ChangePriority, ChangeSeverity, RiskLevel};

/// Configured thresholds driving the severity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeThresholds {
    /// Absolute budget impact that marks a change as significant
    #[serde(rename = "budgetAbsThreshold")]
    pub budget_abs_threshold: f64,
    /// Budget impact as a percentage of the approved budget
    #[serde(rename = "budgetPctThreshold")]
    pub budget_pct_threshold: f64,
    /// Schedule slip, in days
    #[serde(rename = "scheduleDaysThreshold")]
    pub schedule_days_threshold: i64,
    /// Cumulative budget escalation across implemented changes, as a
    /// percentage of the approved budget
    #[serde(rename = "cumulativeBudgetEscalationPct")]
    pub cumulative_budget_escalation_pct: f64,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            budget_abs_threshold: 250_000.0,
            budget_pct_threshold: 10.0,
            schedule_days_threshold: 30,
            cumulative_budget_escalation_pct: 25.0,
        }
    }
}

/// Everything the score is computed from
#[derive(Debug, Clone)]
pub struct SeverityContext {
    pub impact: ChangeImpact,
    pub priority: ChangePriority,
    /// Approved budget of the submission, when one is recorded
    pub approved_budget: Option<f64>,
    /// Sum of budget deltas already implemented on this submission
    pub prior_budget_delta: f64,
}

/// Score a change. Each component contributes non-negative points that
/// never shrink as the underlying impact grows.
pub fn severity_score(context: &SeverityContext, thresholds: &ChangeThresholds) -> u32 {
    let mut score = 0u32;

    let budget_magnitude = context.impact.budget_delta.abs();
    if budget_magnitude >= thresholds.budget_abs_threshold {
        score += 30;
    } else if budget_magnitude >= thresholds.budget_abs_threshold / 2.0 {
        score += 10;
    }

    if let Some(budget) = context.approved_budget.filter(|b| *b > 0.0) {
        let pct = budget_magnitude / budget * 100.0;
        if pct >= thresholds.budget_pct_threshold {
            score += 15;
        }

        let cumulative_pct =
            (context.prior_budget_delta + context.impact.budget_delta).abs() / budget * 100.0;
        if cumulative_pct >= thresholds.cumulative_budget_escalation_pct {
            score += 15;
        }
    }

    let slip = context.impact.schedule_days.abs();
    if slip >= thresholds.schedule_days_threshold {
        score += 20;
    } else if slip >= thresholds.schedule_days_threshold / 2 {
        score += 10;
    }

    score += match context.impact.risk_level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 10,
        RiskLevel::High => 20,
    };

    score += match context.priority {
        ChangePriority::Low => 0,
        ChangePriority::Medium => 5,
        ChangePriority::High => 10,
        ChangePriority::Critical => 15,
    };

    score
}

/// Map a score onto its label band
pub fn severity_label(score: u32) -> ChangeSeverity {
    match score {
        0..=19 => ChangeSeverity::Minor,
        20..=44 => ChangeSeverity::Moderate,
        45..=69 => ChangeSeverity::Major,
        _ => ChangeSeverity::Critical,
    }
}
