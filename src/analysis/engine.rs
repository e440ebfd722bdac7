//! Lead analyzer: assembles detectors, stage resolution, scoring and planning
//! into a single [`AnalysisResult`].
//!
//! The analyzer only reads its arguments and the shared registry, so one
//! instance can serve any number of concurrent requests.

use std::sync::Arc;

use tracing::info;

use crate::analysis::patterns::PatternRegistry;
use crate::analysis::planner::{PlanningSignals, build_next_best_actions, build_tasks};
use crate::analysis::scoring::compute_lead_score;
use crate::analysis::signals::DetectedSignals;
use crate::analysis::stage::{apply_corrections, resolve_stage};
use crate::analysis::summary::summarize;
use crate::analysis::types::{
    AnalysisRequest, AnalysisResult, BudgetSignal, DecisionMaker, LeadMetadata, Urgency,
};
use crate::error::PatternError;

/// Score at or above which a lead is tagged `quente`.
pub const HOT_LEAD_THRESHOLD: u8 = 70;

/// Stateless lead-qualification engine.
#[derive(Debug, Clone)]
pub struct LeadAnalyzer {
    registry: Arc<PatternRegistry>,
}

impl LeadAnalyzer {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// Analyzer over the built-in Portuguese rule set.
    pub fn with_builtin_rules() -> Result<Self, PatternError> {
        Ok(Self::new(Arc::new(PatternRegistry::builtin()?)))
    }

    pub fn analyze_request(&self, request: &AnalysisRequest) -> AnalysisResult {
        self.analyze(&request.lead_id, &request.transcript, &request.metadata)
    }

    /// Analyze one transcript. Total: an empty transcript yields the defaults.
    pub fn analyze(&self, lead_id: &str, transcript: &str, metadata: &LeadMetadata) -> AnalysisResult {
        let registry = self.registry.as_ref();

        let resolution = resolve_stage(registry, transcript);
        let signals = DetectedSignals::detect(registry, transcript, metadata);
        let lead_score = compute_lead_score(&signals);

        let (stage, confidence) = apply_corrections(
            resolution.stage,
            resolution.confidence,
            signals.decision_maker,
            signals.intent,
        );

        let next_best_actions = build_next_best_actions(&PlanningSignals {
            stage,
            decision_maker: signals.decision_maker,
            objections: &signals.objections,
            urgency: signals.urgency,
        });
        let tasks_to_create = build_tasks(stage, signals.decision_maker);

        let insights = build_insights(&signals);
        let tags = build_tags(lead_score, &signals);

        info!(
            lead_id,
            stage = %stage,
            raw_stage = %resolution.stage,
            lead_score,
            "Lead analyzed"
        );

        AnalysisResult {
            lead_id: lead_id.to_string(),
            stage,
            stage_confidence: round2(confidence),
            lead_score,
            icp_fit: signals.icp_fit,
            buying_intent: signals.intent,
            pain_points: signals.pain_points,
            objections: signals.objections,
            urgency: signals.urgency,
            budget_signal: signals.budget,
            decision_maker: signals.decision_maker,
            next_best_actions,
            insights,
            summary_pt: summarize(transcript),
            tasks_to_create,
            tags,
        }
    }
}

fn build_insights(signals: &DetectedSignals) -> Vec<String> {
    let mut insights = Vec::new();
    if signals.urgency != Urgency::Baixa {
        insights.push(format!("Urgência: {}", signals.urgency));
    }
    if signals.budget != BudgetSignal::Inexistente {
        insights.push(format!("Sinal de orçamento: {}", signals.budget));
    }
    if signals.comparison {
        insights.push("Comparação com fornecedores/concorrentes".to_string());
    }
    insights
}

fn build_tags(lead_score: u8, signals: &DetectedSignals) -> Vec<String> {
    let mut tags = Vec::new();
    if lead_score >= HOT_LEAD_THRESHOLD {
        tags.push("quente");
    }
    if signals.budget == BudgetSignal::Presente {
        tags.push("budget_presente");
    }
    if signals.urgency == Urgency::Alta {
        tags.push("urgencia_alta");
    }
    if signals.decision_maker != DecisionMaker::Sim {
        tags.push("nao_decisor");
    }
    tags.into_iter().map(String::from).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{Level, Objection, Stage};

    fn analyzer() -> LeadAnalyzer {
        LeadAnalyzer::with_builtin_rules().unwrap()
    }

    fn analyze(transcript: &str) -> AnalysisResult {
        analyzer().analyze("LEAD-1", transcript, &LeadMetadata::default())
    }

    #[test]
    fn empty_transcript_defaults() {
        let result = analyze("");
        assert_eq!(result.lead_id, "LEAD-1");
        assert_eq!(result.stage, Stage::Novo);
        assert_eq!(result.stage_confidence, 0.35);
        assert_eq!(result.lead_score, 0);
        assert_eq!(result.icp_fit, Level::Baixo);
        assert_eq!(result.buying_intent, Level::Baixo);
        assert!(result.pain_points.is_empty());
        assert!(result.objections.is_empty());
        assert!(result.insights.is_empty());
        assert_eq!(result.summary_pt, "");
        assert_eq!(result.urgency, Urgency::Baixa);
        assert_eq!(result.budget_signal, BudgetSignal::Inexistente);
        assert_eq!(result.decision_maker, DecisionMaker::Desconhecido);
    }

    #[test]
    fn proposal_request_with_boss_approval() {
        let result = analyze(
            "Olá, estou gastando muito com retrabalho, preciso falar com meu chefe antes de \
             decidir, mas gostaria de receber uma proposta ainda este mês",
        );
        assert_eq!(result.stage, Stage::Proposta);
        assert_eq!(result.stage_confidence, 0.8);
        assert_eq!(result.decision_maker, DecisionMaker::Nao);
        assert_eq!(result.urgency, Urgency::Alta);
        assert_eq!(result.pain_points, vec!["gastando", "retrabalho"]);
        assert_eq!(result.budget_signal, BudgetSignal::Inexistente);
        assert_eq!(result.lead_score, 20);
        assert!(result.tags.contains(&"urgencia_alta".to_string()));
        assert!(result.tags.contains(&"nao_decisor".to_string()));
        assert_eq!(result.objections, vec![Objection::Autoridade]);
        assert_eq!(result.insights, vec!["Urgência: Alta"]);

        let actions: Vec<&str> = result
            .next_best_actions
            .iter()
            .map(|a| a.action.as_str())
            .collect();
        assert_eq!(actions, vec!["Enviar_proposta", "Envolver_decisor"]);
        assert_eq!(result.tasks_to_create.len(), 2);
    }

    #[test]
    fn unconfirmed_close_is_demoted() {
        let result = analyze("Podemos assinar contrato amanhã");
        assert_eq!(result.stage, Stage::Negociacao);
        assert!(result.stage_confidence <= 0.75);
        assert_eq!(result.next_best_actions[0].action, "Tratar_objecoes");
    }

    #[test]
    fn confirmed_close_is_kept() {
        let result = analyze("Sou o decisor, vamos assinar contrato hoje. Temos R$ 10000.");
        assert_eq!(result.stage, Stage::Fechamento);
        assert_eq!(result.stage_confidence, 0.8);
        assert_eq!(result.decision_maker, DecisionMaker::Sim);
        assert_eq!(result.budget_signal, BudgetSignal::Presente);
        assert!(result.tags.contains(&"budget_presente".to_string()));
        assert!(!result.tags.contains(&"nao_decisor".to_string()));
    }

    #[test]
    fn low_intent_qualification_confidence_capped() {
        let result = analyze("Qual seria o prazo de implantação?");
        assert_eq!(result.stage, Stage::Qualificacao);
        assert_eq!(result.buying_intent, Level::Baixo);
        assert_eq!(result.stage_confidence, 0.5);
    }

    #[test]
    fn hot_lead_tag() {
        let metadata = LeadMetadata {
            segmento: Some("fintech".into()),
            ..Default::default()
        };
        let result = analyzer().analyze(
            "LEAD-9",
            "Sou o decisor. Estamos gastando R$ 8000 com retrabalho e queremos resolver \
             este mês; já falamos com um concorrente.",
            &metadata,
        );
        assert_eq!(result.icp_fit, Level::Alto);
        assert_eq!(result.lead_score, 55);
        assert!(!result.tags.contains(&"quente".to_string()));
        assert_eq!(
            result.insights,
            vec![
                "Urgência: Alta",
                "Sinal de orçamento: Presente",
                "Comparação com fornecedores/concorrentes",
            ]
        );
    }

    #[test]
    fn serialized_output_is_stable() {
        let analyzer = analyzer();
        let transcript = "Oi! Estamos comparando fornecedores, não é prioridade, talvez no próximo trimestre.";
        let first = serde_json::to_string(&analyzer.analyze("L", transcript, &LeadMetadata::default()))
            .unwrap();
        let second = serde_json::to_string(&analyzer.analyze("L", transcript, &LeadMetadata::default()))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bounds_hold_across_varied_inputs() {
        let analyzer = analyzer();
        let transcripts = [
            "",
            "oi",
            "não é prioridade",
            "sou o decisor R$ 100 concorrente hoje custo retrabalho churn taxa baixa",
            "vamos fechar hoje, desconto, proposta, mapear requisitos, decisor, olá",
            "preço caro risco medo depois sem tempo prioridade",
        ];
        for transcript in transcripts {
            let result = analyzer.analyze("L", transcript, &LeadMetadata::default());
            assert!(result.lead_score <= 100);
            assert!((0.0..=1.0).contains(&result.stage_confidence));
            assert!(result.pain_points.len() <= 3);
            assert!(result.next_best_actions.len() <= 3);
            assert!(result.summary_pt.chars().count() <= 240);
        }
    }

    #[test]
    fn concurrent_analyses_agree() {
        let analyzer = analyzer();
        let transcript = "Quero contratar, me manda a proposta ainda este mês";
        let expected = analyzer.analyze("L", transcript, &LeadMetadata::default());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let analyzer = &analyzer;
                    scope.spawn(move || analyzer.analyze("L", transcript, &LeadMetadata::default()))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
