//! Additive lead scoring.

use crate::analysis::signals::DetectedSignals;
use crate::analysis::types::{BudgetSignal, Urgency};

pub const MAX_SCORE: i32 = 100;

const URGENT_PAIN_POINTS: i32 = 20;
const BUDGET_PRESENT_POINTS: i32 = 15;
const DECISION_MAKER_POINTS: i32 = 10;
const COMPARISON_POINTS: i32 = 10;
const LOW_PRIORITY_PENALTY: i32 = 10;

/// Weighted sum of the detected signals, clamped to `0..=100`.
pub fn compute_lead_score(signals: &DetectedSignals) -> u8 {
    let mut score: i32 = 0;
    if !signals.pain_points.is_empty() && signals.urgency == Urgency::Alta {
        score += URGENT_PAIN_POINTS;
    }
    if signals.budget == BudgetSignal::Presente {
        score += BUDGET_PRESENT_POINTS;
    }
    if signals.decision_maker.is_confirmed() {
        score += DECISION_MAKER_POINTS;
    }
    if signals.comparison {
        score += COMPARISON_POINTS;
    }
    if signals.low_priority {
        score -= LOW_PRIORITY_PENALTY;
    }
    // Clamped into 0..=100, so the cast is lossless.
    score.clamp(0, MAX_SCORE) as u8
}
