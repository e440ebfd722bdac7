//! Pattern registry: compiled, case-insensitive rules grouped by signal category.
//!
//! The registry is built once at startup and shared read-only behind an `Arc`.
//! A malformed pattern fails construction instead of surfacing per request.
//! Every list is kept in declaration order because the detectors evaluate
//! them with first-match-wins semantics.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::analysis::types::{Objection, Stage, Urgency};
use crate::error::PatternError;

/// How a budget pattern counts as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetEvidence {
    /// Digit-bearing pattern (an amount was stated).
    Explicit,
    /// Digit-free mention such as "orçamento"; short-circuits to `Indireto`.
    Indirect,
}

/// Uncompiled pattern tables.
#[derive(Debug, Clone, Copy)]
pub struct PatternTables {
    pub pain: &'static [&'static str],
    pub objections: &'static [(Objection, &'static [&'static str])],
    pub budget: &'static [(&'static str, BudgetEvidence)],
    pub decision_positive: &'static [&'static str],
    pub decision_negative: &'static [&'static str],
    pub intent_strong: &'static [&'static str],
    pub intent_medium: &'static [&'static str],
    /// Highest priority first.
    pub stages: &'static [(Stage, &'static [&'static str])],
    pub urgency: &'static [(&'static str, Urgency)],
    pub comparison: &'static [&'static str],
}

const AUTHORITY_ESCALATION: &str = r"(falar|conversar) com (meu|minha) (chefe|gerente|diretor)";

impl PatternTables {
    /// Brazilian-Portuguese sales heuristics.
    pub const BUILTIN: PatternTables = PatternTables {
        pain: &[
            r"(gastando|custo|caro|custa|desperd[ií]cio)",
            r"(retrabalho|inefici[eê]ncia|demorado)",
            r"(churn|perda de clientes)",
            r"(convers[aã]o baixa|taxa baixa)",
        ],
        objections: &[
            (
                Objection::Preco,
                &[r"caro", r"pre[çc]o", r"muito alto", r"sem verba", r"sem or[çc]amento"],
            ),
            (
                Objection::Tempo,
                &[r"sem tempo", r"depois", r"pr[óo]ximo trimestre", r"agora n[ãa]o"],
            ),
            (
                Objection::Autoridade,
                &[AUTHORITY_ESCALATION, r"preciso de aprova[çc][aã]o"],
            ),
            (Objection::Prioridade, &[r"prioridade", r"n[ãa]o [eé] prioridade"]),
            (Objection::Risco, &[r"risco", r"medo", r"incerteza"]),
        ],
        budget: &[
            (r"\bR\$\s?\d+[.,]?\d*", BudgetEvidence::Explicit),
            (r"\$\s?\d+[.,]?\d*", BudgetEvidence::Explicit),
            (r"\b\d+\s?(k|mil|k/m|/mês|/mes)\b", BudgetEvidence::Explicit),
            (r"or[çc]amento", BudgetEvidence::Indirect),
            (r"budget", BudgetEvidence::Indirect),
        ],
        decision_positive: &[r"sou o decisor", r"eu decido", r"posso aprovar", r"eu aprovo"],
        decision_negative: &[
            r"meu chefe decide",
            r"preciso do gerente",
            r"aprova[çc][aã]o do gerente|compras",
            AUTHORITY_ESCALATION,
        ],
        intent_strong: &[
            r"vamos fechar",
            r"quero contratar",
            r"enviar (a )?proposta",
            r"agendar demo",
            r"POC|piloto",
        ],
        intent_medium: &[r"avaliando", r"entender melhor", r"conhecer"],
        stages: &[
            (
                Stage::Fechamento,
                &[r"(assinar|assinei) contrato", r"pagamento efetuado", r"(vamos )?fechar hoje"],
            ),
            (
                Stage::Negociacao,
                &[r"desconto", r"ajustar pre[çc]o|escopo", r"condi[çc][oõ]es", r"negociar"],
            ),
            (
                Stage::Proposta,
                &[
                    r"enviar (a )?proposta",
                    r"manda (a )?proposta",
                    r"proposta",
                    r"cotação",
                    r"or[çc]amento detalhado",
                ],
            ),
            (
                Stage::Diagnostico,
                &[
                    r"entender problema",
                    r"mapear requisitos",
                    r"contexto t[eé]cnico",
                    r"descobrir causa",
                ],
            ),
            (
                Stage::Qualificacao,
                &[r"or[çc]amento", r"decisor", r"prazo", r"dor", r"qualificar"],
            ),
            (Stage::Novo, &[r"oi", r"ol[aá]", r"cheguei", r"interesse"]),
        ],
        urgency: &[
            (
                r"este m[eê]s|m[êe]s atual|fim do m[eê]s|ainda este m[eê]s|m[eê]s que vem|30 dias|4 semanas|2 semanas|15 dias|amanh[ãa]|hoje",
                Urgency::Alta,
            ),
            (
                r"pr[óo]ximo trimestre|quarter|60 dias|90 dias|m[êe]s que vem",
                Urgency::Media,
            ),
        ],
        comparison: &[
            r"concorrente",
            r"fornecedor",
            r"comparando",
            r"alternativas",
            r"or[çc]amentos",
        ],
    };
}

/// A label with its ordered pattern group. Matches when any pattern matches.
#[derive(Debug, Clone)]
pub struct PatternGroup<L> {
    pub label: L,
    pub patterns: Vec<Regex>,
}

impl<L> PatternGroup<L> {
    pub fn is_match(&self, text: &str) -> bool {
        any_match(&self.patterns, text)
    }
}

#[derive(Debug, Clone)]
pub struct BudgetRule {
    pub regex: Regex,
    pub evidence: BudgetEvidence,
}

#[derive(Debug, Clone)]
pub struct UrgencyRule {
    pub regex: Regex,
    pub level: Urgency,
}

/// Immutable compiled rule set shared by every detector.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    pain: Vec<Regex>,
    objections: Vec<PatternGroup<Objection>>,
    budget: Vec<BudgetRule>,
    decision_positive: Vec<Regex>,
    decision_negative: Vec<Regex>,
    intent_strong: Vec<Regex>,
    intent_medium: Vec<Regex>,
    stages: Vec<PatternGroup<Stage>>,
    urgency: Vec<UrgencyRule>,
    comparison: Vec<Regex>,
}

impl PatternRegistry {
    /// Compile the built-in Portuguese rule set.
    pub fn builtin() -> Result<Self, PatternError> {
        Self::from_tables(&PatternTables::BUILTIN)
    }

    /// Compile a registry from pattern tables, failing on the first bad pattern.
    pub fn from_tables(tables: &PatternTables) -> Result<Self, PatternError> {
        let registry = Self {
            pain: compile_all("pain", tables.pain)?,
            objections: tables
                .objections
                .iter()
                .map(|(label, patterns)| {
                    Ok(PatternGroup {
                        label: *label,
                        patterns: compile_all("objection", patterns)?,
                    })
                })
                .collect::<Result<_, PatternError>>()?,
            budget: tables
                .budget
                .iter()
                .map(|(pattern, evidence)| {
                    Ok(BudgetRule {
                        regex: compile("budget", pattern)?,
                        evidence: *evidence,
                    })
                })
                .collect::<Result<_, PatternError>>()?,
            decision_positive: compile_all("decision", tables.decision_positive)?,
            decision_negative: compile_all("decision", tables.decision_negative)?,
            intent_strong: compile_all("intent", tables.intent_strong)?,
            intent_medium: compile_all("intent", tables.intent_medium)?,
            stages: tables
                .stages
                .iter()
                .map(|(label, patterns)| {
                    Ok(PatternGroup {
                        label: *label,
                        patterns: compile_all("stage", patterns)?,
                    })
                })
                .collect::<Result<_, PatternError>>()?,
            urgency: tables
                .urgency
                .iter()
                .map(|(pattern, level)| {
                    Ok(UrgencyRule {
                        regex: compile("urgency", pattern)?,
                        level: *level,
                    })
                })
                .collect::<Result<_, PatternError>>()?,
            comparison: compile_all("comparison", tables.comparison)?,
        };

        debug!(
            stages = registry.stages.len(),
            objections = registry.objections.len(),
            budget = registry.budget.len(),
            "Compiled pattern registry"
        );

        Ok(registry)
    }

    pub fn pain(&self) -> &[Regex] {
        &self.pain
    }

    pub fn objections(&self) -> &[PatternGroup<Objection>] {
        &self.objections
    }

    /// Pattern group for a single objection label, if declared.
    pub fn objection(&self, label: Objection) -> Option<&PatternGroup<Objection>> {
        self.objections.iter().find(|g| g.label == label)
    }

    pub fn budget(&self) -> &[BudgetRule] {
        &self.budget
    }

    pub fn decision_positive(&self) -> &[Regex] {
        &self.decision_positive
    }

    pub fn decision_negative(&self) -> &[Regex] {
        &self.decision_negative
    }

    pub fn intent_strong(&self) -> &[Regex] {
        &self.intent_strong
    }

    pub fn intent_medium(&self) -> &[Regex] {
        &self.intent_medium
    }

    /// Stage groups, highest priority first.
    pub fn stages(&self) -> &[PatternGroup<Stage>] {
        &self.stages
    }

    pub fn urgency(&self) -> &[UrgencyRule] {
        &self.urgency
    }

    pub fn comparison(&self) -> &[Regex] {
        &self.comparison
    }
}

/// True if any of the patterns matches anywhere in `text`.
pub fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|r| r.is_match(text))
}

fn compile(category: &'static str, pattern: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternError::Invalid {
            category,
            pattern: pattern.to_string(),
            source,
        })
}

fn compile_all(category: &'static str, patterns: &[&str]) -> Result<Vec<Regex>, PatternError> {
    patterns.iter().map(|p| compile(category, p)).collect()
}
