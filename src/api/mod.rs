//! HTTP front-end: health, direct analysis, and the Z-API webhook.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::analysis::{AnalysisRequest, AnalysisResult, LeadAnalyzer, LeadMetadata, Stage};
use crate::channels::{SendOutcome, WebhookEvent, ZapiClient, extract_event};
use crate::config::AppConfig;
use crate::crm::{CrmSync, CrmSyncReport, CrmUpdate};
use crate::error::Result;
use crate::llm::{ReplyGenerator, create_provider};
use crate::store::JsonlLog;

const HISTORY_LOG_FILE: &str = "history.jsonl";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<LeadAnalyzer>,
    pub replies: Arc<ReplyGenerator>,
    pub crm: Arc<CrmSync>,
    pub whatsapp: Arc<ZapiClient>,
    pub history: JsonlLog,
}

impl AppState {
    /// Wire every collaborator from configuration. Fails if a built-in
    /// pattern does not compile or the LLM client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let log = JsonlLog::new(config.data_dir.clone());
        Ok(Self {
            analyzer: Arc::new(LeadAnalyzer::with_builtin_rules()?),
            replies: Arc::new(ReplyGenerator::new(create_provider(&config.llm)?)),
            crm: Arc::new(CrmSync::new(config.crm.clone(), log.clone())),
            whatsapp: Arc::new(ZapiClient::new(config.zapi.clone())),
            history: log,
        })
    }
}

/// Build the Axum router with all routes and permissive CORS.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/zapi/webhook", post(zapi_webhook))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "ts": Utc::now().to_rfc3339(),
    }))
}

// ── Analysis ────────────────────────────────────────────────────────────

/// The body is parsed as JSON whatever the content-type says.
async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AnalysisRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if request.lead_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "lead_id obrigatório");
    }

    Json(state.analyzer.analyze_request(&request)).into_response()
}

// ── Webhook ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WebhookReply {
    ok: bool,
    lead_id: String,
    stage: Stage,
    reply: String,
    wa: SendOutcome,
    crm: Value,
}

#[derive(Serialize)]
struct HistoryRecord<'a> {
    lead_id: &'a str,
    phone: &'a str,
    name: &'a str,
    text: &'a str,
    reply: &'a str,
    analysis: &'a AnalysisResult,
    crm_sync: &'a Value,
    wa_send: &'a SendOutcome,
    ts: chrono::DateTime<Utc>,
}

async fn zapi_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let event = extract_event(&payload);
    let text = event.text.trim();

    if text.is_empty() || event.phone.is_empty() {
        return Json(json!({
            "status": "ignored",
            "reason": "sem texto ou telefone",
        }))
        .into_response();
    }

    let lead_id = event.lead_id();
    info!(lead_id = %lead_id, "Inbound WhatsApp message");

    let analysis = state
        .analyzer
        .analyze(&lead_id, text, &LeadMetadata::with_origin("whatsapp"));

    let reply = state
        .replies
        .generate(text, &analysis, &event.sender_name)
        .await;

    let crm = sync_crm(&state, &analysis).await;
    let wa = state.whatsapp.send_message(&event.phone, &reply).await;

    log_history(&state, &event, text, &reply, &analysis, &crm, &wa).await;

    Json(WebhookReply {
        ok: true,
        lead_id,
        stage: analysis.stage,
        reply,
        wa,
        crm,
    })
    .into_response()
}

/// CRM failures are reported to the caller, never fatal to the webhook.
async fn sync_crm(state: &AppState, analysis: &AnalysisResult) -> Value {
    let update = CrmUpdate::from_analysis(analysis, Utc::now());
    match state.crm.sync(&update).await {
        Ok(report) => report_value(&report),
        Err(e) => {
            warn!(lead_id = %analysis.lead_id, error = %e, "CRM sync failed");
            json!({ "error": e.to_string() })
        }
    }
}

fn report_value(report: &CrmSyncReport) -> Value {
    serde_json::to_value(report).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

async fn log_history(
    state: &AppState,
    event: &WebhookEvent,
    text: &str,
    reply: &str,
    analysis: &AnalysisResult,
    crm: &Value,
    wa: &SendOutcome,
) {
    let record = HistoryRecord {
        lead_id: &analysis.lead_id,
        phone: &event.phone,
        name: &event.sender_name,
        text,
        reply,
        analysis,
        crm_sync: crm,
        wa_send: wa,
        ts: Utc::now(),
    };
    if let Err(e) = state.history.append(HISTORY_LOG_FILE, &record).await {
        warn!(lead_id = %analysis.lead_id, error = %e, "Failed to append history record");
    }
}
