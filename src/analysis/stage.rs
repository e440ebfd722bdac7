//! Stage resolution over a fixed priority list, plus post-hoc consistency
//! corrections.

use tracing::debug;

use crate::analysis::patterns::PatternRegistry;
use crate::analysis::types::{DecisionMaker, Level, Stage};

/// Confidence reported when no stage pattern matched.
pub const NO_HIT_CONFIDENCE: f64 = 0.35;
/// Confidence for a detected Proposta/Negociacao/Fechamento.
pub const LATE_STAGE_CONFIDENCE: f64 = 0.8;
/// Confidence for any other detected stage.
pub const EARLY_STAGE_CONFIDENCE: f64 = 0.6;
/// Ceiling applied when a close is demoted for lack of a decision-maker.
pub const DEMOTED_CLOSE_CEILING: f64 = 0.75;
/// Ceiling for early stages with low buying intent.
pub const LOW_INTENT_CEILING: f64 = 0.5;

/// Outcome of stage resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResolution {
    pub stage: Stage,
    pub confidence: f64,
    /// Every stage with at least one hit, highest priority first.
    pub hits: Vec<Stage>,
}

/// Pick the highest-priority stage with a hit. Frequency is irrelevant.
pub fn resolve_stage(registry: &PatternRegistry, transcript: &str) -> StageResolution {
    let hits: Vec<Stage> = registry
        .stages()
        .iter()
        .filter(|group| group.is_match(transcript))
        .map(|group| group.label)
        .collect();

    // Groups are stored highest priority first, so the first hit wins.
    let Some(&stage) = hits.first() else {
        return StageResolution {
            stage: Stage::Novo,
            confidence: NO_HIT_CONFIDENCE,
            hits,
        };
    };

    let confidence = if stage.is_late() {
        LATE_STAGE_CONFIDENCE
    } else {
        EARLY_STAGE_CONFIDENCE
    };

    debug!(stage = %stage, hits = hits.len(), confidence, "Stage resolved");

    StageResolution {
        stage,
        confidence,
        hits,
    }
}

/// Lower stage and confidence where the signal combination is inconsistent.
///
/// Never raises either value; applying it twice is the same as once.
pub fn apply_corrections(
    stage: Stage,
    confidence: f64,
    decision_maker: DecisionMaker,
    intent: Level,
) -> (Stage, f64) {
    let (mut stage, mut confidence) = (stage, confidence);

    if !decision_maker.is_confirmed() && stage == Stage::Fechamento {
        debug!("Closing without confirmed decision-maker, demoting to Negociacao");
        stage = Stage::Negociacao;
        confidence = confidence.min(DEMOTED_CLOSE_CEILING);
    }

    if stage.is_early() && intent == Level::Baixo {
        confidence = confidence.min(LOW_INTENT_CEILING);
    }

    (stage, confidence)
}
