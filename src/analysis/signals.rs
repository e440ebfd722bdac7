//! Signal detectors: one pure function per category.
//!
//! Every detector is total: no match yields the category default. Ordered
//! lists are evaluated with short-circuit semantics; declaration order is the
//! tie-break wherever patterns overlap.

use tracing::debug;

use crate::analysis::patterns::{BudgetEvidence, PatternRegistry, any_match};
use crate::analysis::types::{BudgetSignal, DecisionMaker, LeadMetadata, Level, Objection, Urgency};

/// Maximum number of pain-point snippets reported.
pub const MAX_PAIN_POINTS: usize = 3;

const FAVORABLE_SEGMENTS: &[&str] = &["saas", "ecommerce", "fintech"];
const FAVORABLE_SIZES: &[&str] = &["100-", "100-500", ">500", "enterprise", "medio"];

/// First matched snippet per pain pattern, deduplicated, capped at three.
///
/// Ordering follows the pattern list, not the transcript.
pub fn detect_pain_points(registry: &PatternRegistry, transcript: &str) -> Vec<String> {
    let mut pains: Vec<String> = Vec::new();
    for regex in registry.pain() {
        if pains.len() == MAX_PAIN_POINTS {
            break;
        }
        if let Some(m) = regex.find(transcript) {
            let snippet = m.as_str();
            if !pains.iter().any(|p| p == snippet) {
                pains.push(snippet.to_string());
            }
        }
    }
    pains
}

/// Labels with at least one matching pattern, in label-declaration order.
pub fn detect_objections(registry: &PatternRegistry, transcript: &str) -> Vec<Objection> {
    registry
        .objections()
        .iter()
        .filter(|group| group.is_match(transcript))
        .map(|group| {
            debug!(objection = group.label.label(), "Objection detected");
            group.label
        })
        .collect()
}

/// Level of the first matching urgency rule, or `Baixa`.
pub fn detect_urgency(registry: &PatternRegistry, transcript: &str) -> Urgency {
    registry
        .urgency()
        .iter()
        .find(|rule| rule.regex.is_match(transcript))
        .map(|rule| rule.level)
        .unwrap_or(Urgency::Baixa)
}

/// Budget availability.
///
/// Explicit (amount-bearing) matches are remembered while scanning; the first
/// indirect match returns `Indireto` on the spot, even when an explicit
/// pattern matched earlier.
pub fn detect_budget_signal(registry: &PatternRegistry, transcript: &str) -> BudgetSignal {
    let mut explicit = false;
    for rule in registry.budget() {
        if !rule.regex.is_match(transcript) {
            continue;
        }
        match rule.evidence {
            BudgetEvidence::Explicit => explicit = true,
            BudgetEvidence::Indirect => return BudgetSignal::Indireto,
        }
    }
    if explicit {
        BudgetSignal::Presente
    } else {
        BudgetSignal::Inexistente
    }
}

/// Positive statements win over negative ones.
pub fn detect_decision_maker(registry: &PatternRegistry, transcript: &str) -> DecisionMaker {
    if any_match(registry.decision_positive(), transcript) {
        DecisionMaker::Sim
    } else if any_match(registry.decision_negative(), transcript) {
        DecisionMaker::Nao
    } else {
        DecisionMaker::Desconhecido
    }
}

pub fn detect_intent(registry: &PatternRegistry, transcript: &str) -> Level {
    if any_match(registry.intent_strong(), transcript) {
        Level::Alto
    } else if any_match(registry.intent_medium(), transcript) {
        Level::Medio
    } else {
        Level::Baixo
    }
}

/// Ideal-customer-profile fit from account metadata alone.
pub fn detect_icp_fit(metadata: &LeadMetadata) -> Level {
    let segment = metadata
        .segmento
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let size = metadata
        .tamanho_empresa
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    let favorable_segment = FAVORABLE_SEGMENTS.iter().any(|k| segment.contains(k));
    let favorable_size = FAVORABLE_SIZES.iter().any(|k| size.contains(k));

    if favorable_segment || favorable_size {
        Level::Alto
    } else if !segment.is_empty() {
        Level::Medio
    } else {
        Level::Baixo
    }
}

/// Prospect mentions competitors or alternative suppliers.
pub fn detect_comparison(registry: &PatternRegistry, transcript: &str) -> bool {
    any_match(registry.comparison(), transcript)
}

/// Prospect says this is not a priority right now.
pub fn mentions_low_priority(registry: &PatternRegistry, transcript: &str) -> bool {
    registry
        .objection(Objection::Prioridade)
        .is_some_and(|group| group.is_match(transcript))
}

/// Every transcript-derived signal for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSignals {
    pub pain_points: Vec<String>,
    pub objections: Vec<Objection>,
    pub urgency: Urgency,
    pub budget: BudgetSignal,
    pub decision_maker: DecisionMaker,
    pub intent: Level,
    pub icp_fit: Level,
    pub comparison: bool,
    pub low_priority: bool,
}

impl DetectedSignals {
    /// Run every detector. Detectors are independent of one another.
    pub fn detect(registry: &PatternRegistry, transcript: &str, metadata: &LeadMetadata) -> Self {
        Self {
            pain_points: detect_pain_points(registry, transcript),
            objections: detect_objections(registry, transcript),
            urgency: detect_urgency(registry, transcript),
            budget: detect_budget_signal(registry, transcript),
            decision_maker: detect_decision_maker(registry, transcript),
            intent: detect_intent(registry, transcript),
            icp_fit: detect_icp_fit(metadata),
            comparison: detect_comparison(registry, transcript),
            low_priority: mentions_low_priority(registry, transcript),
        }
    }
}
