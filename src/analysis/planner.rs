//! Next-best-action and follow-up task planning.

use crate::analysis::types::{DecisionMaker, FollowUpTask, NextAction, Objection, Stage, Urgency};

/// Maximum number of next-best-actions returned.
pub const MAX_ACTIONS: usize = 3;

const SALES: &str = "Sales";
const SALES_OPS: &str = "SalesOps";

/// Inputs the planner reads from the resolved analysis.
#[derive(Debug, Clone, Copy)]
pub struct PlanningSignals<'a> {
    pub stage: Stage,
    pub decision_maker: DecisionMaker,
    pub objections: &'a [Objection],
    pub urgency: Urgency,
}

/// Stage-specific actions first, then decision-maker engagement, capped at three.
pub fn build_next_best_actions(signals: &PlanningSignals<'_>) -> Vec<NextAction> {
    let mut actions = match signals.stage {
        Stage::Novo | Stage::Qualificacao => vec![
            NextAction::new(
                "Perguntar",
                "agora",
                SALES,
                "Qualificar: dor, prazo, orçamento, autoridade",
            ),
            NextAction::new("Agendar_diagnostico", "48h", SALES, "Call 30-45min"),
        ],
        Stage::Diagnostico => {
            let when = if signals.urgency == Urgency::Alta {
                "24h"
            } else {
                "72h"
            };
            vec![NextAction::new(
                "Agendar_demo",
                when,
                SALES,
                "Mostrar solução alinhada à dor",
            )]
        }
        Stage::Proposta => vec![NextAction::new(
            "Enviar_proposta",
            "hoje",
            SALES_OPS,
            "Proposta base com ROI",
        )],
        Stage::Negociacao => vec![NextAction::new(
            "Tratar_objecoes",
            "24h",
            SALES,
            objection_notes(signals.objections),
        )],
        Stage::Fechamento => vec![NextAction::new(
            "Coletar_assinatura",
            "hoje",
            SALES,
            "DocuSign",
        )],
        Stage::PosVenda => Vec::new(),
    };

    if !signals.decision_maker.is_confirmed() {
        actions.push(NextAction::new(
            "Envolver_decisor",
            "24-48h",
            SALES,
            "Convidar gerente/Compras",
        ));
    }

    actions.truncate(MAX_ACTIONS);
    actions
}

/// Internal CRM tasks keyed on stage and decision-maker status.
pub fn build_tasks(stage: Stage, decision_maker: DecisionMaker) -> Vec<FollowUpTask> {
    let mut tasks = Vec::new();
    if stage.is_early() {
        tasks.push(FollowUpTask::high("Marcar call de diagnóstico", 48));
    }
    if !decision_maker.is_confirmed() {
        tasks.push(FollowUpTask::high("Identificar e incluir decisor", 48));
    }
    if stage == Stage::Proposta {
        tasks.push(FollowUpTask::high("Gerar proposta base e anexar cases", 12));
    }
    tasks
}

fn objection_notes(objections: &[Objection]) -> String {
    if objections.is_empty() {
        return "Preço/Tempo".to_string();
    }
    objections
        .iter()
        .map(Objection::label)
        .collect::<Vec<_>>()
        .join(",")
}
