//! Signal values and the analysis result record.
//!
//! Enum variants serialize with the exact Portuguese spellings that CRM and
//! reply collaborators read (`Novo`, `Qualificacao`, `Presente`, ...).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Stage ───────────────────────────────────────────────────────────

/// Pipeline position of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Novo,
    Qualificacao,
    Diagnostico,
    Proposta,
    Negociacao,
    Fechamento,
    /// Only ever set externally; pattern detection never produces it.
    PosVenda,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novo => "Novo",
            Self::Qualificacao => "Qualificacao",
            Self::Diagnostico => "Diagnostico",
            Self::Proposta => "Proposta",
            Self::Negociacao => "Negociacao",
            Self::Fechamento => "Fechamento",
            Self::PosVenda => "PosVenda",
        }
    }

    /// Stages where the conversation is already about a concrete offer.
    pub fn is_late(&self) -> bool {
        matches!(self, Self::Proposta | Self::Negociacao | Self::Fechamento)
    }

    /// Stages where the lead is still being qualified.
    pub fn is_early(&self) -> bool {
        matches!(self, Self::Novo | Self::Qualificacao)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Graded signals ──────────────────────────────────────────────────

/// Three-level grade used for both ICP fit and buying intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Alto,
    Medio,
    Baixo,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alto => "Alto",
            Self::Medio => "Medio",
            Self::Baixo => "Baixo",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Alta,
    Media,
    Baixa,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alta => "Alta",
            Self::Media => "Media",
            Self::Baixa => "Baixa",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether budget availability is explicit, absent, or only implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetSignal {
    Presente,
    Inexistente,
    Indireto,
}

impl BudgetSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presente => "Presente",
            Self::Inexistente => "Inexistente",
            Self::Indireto => "Indireto",
        }
    }
}

impl fmt::Display for BudgetSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionMaker {
    Sim,
    Nao,
    Desconhecido,
}

impl DecisionMaker {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Sim)
    }
}

/// Category of prospect resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objection {
    Preco,
    Tempo,
    Autoridade,
    Prioridade,
    Risco,
}

impl Objection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preco => "preco",
            Self::Tempo => "tempo",
            Self::Autoridade => "autoridade",
            Self::Prioridade => "prioridade",
            Self::Risco => "risco",
        }
    }
}

// ── Input ───────────────────────────────────────────────────────────

/// Account metadata sent alongside a transcript.
///
/// Only `segmento` and `tamanho_empresa` feed the analysis; anything else
/// (e.g. `origem`) is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamanho_empresa: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl LeadMetadata {
    /// Metadata tagged with the channel the lead came from.
    pub fn with_origin(origin: &str) -> Self {
        let mut extra = HashMap::new();
        extra.insert("origem".to_string(), serde_json::Value::from(origin));
        Self {
            extra,
            ..Default::default()
        }
    }
}

/// A single analysis request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub lead_id: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub metadata: LeadMetadata,
}

// ── Output ──────────────────────────────────────────────────────────

/// A recommended immediate follow-up step for the sales owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub action: String,
    pub when: String,
    pub owner: String,
    pub notes: String,
}

impl NextAction {
    pub(crate) fn new(action: &str, when: &str, owner: &str, notes: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            when: when.to_string(),
            owner: owner.to_string(),
            notes: notes.into(),
        }
    }
}

/// An internal task to be created in the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub title: String,
    pub due_in_hours: u32,
    pub priority: String,
}

impl FollowUpTask {
    pub(crate) fn high(title: &str, due_in_hours: u32) -> Self {
        Self {
            title: title.to_string(),
            due_in_hours,
            priority: "High".to_string(),
        }
    }
}

/// Full lead-qualification assessment for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub lead_id: String,
    pub stage: Stage,
    pub stage_confidence: f64,
    pub lead_score: u8,
    pub icp_fit: Level,
    pub buying_intent: Level,
    pub pain_points: Vec<String>,
    pub objections: Vec<Objection>,
    pub urgency: Urgency,
    pub budget_signal: BudgetSignal,
    pub decision_maker: DecisionMaker,
    pub next_best_actions: Vec<NextAction>,
    pub insights: Vec<String>,
    pub summary_pt: String,
    pub tasks_to_create: Vec<FollowUpTask>,
    pub tags: Vec<String>,
}
