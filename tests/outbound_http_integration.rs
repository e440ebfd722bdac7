//! Integration tests for outbound HTTP collaborators: CRM, Z-API and the
//! OpenAI-compatible reply model.
//!
//! A stub Axum server on a random port records every request it receives
//! (method, path, `Authorization` header, JSON body) and answers with canned
//! responses chosen by path.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use funnel_agent::analysis::{FollowUpTask, Stage};
use funnel_agent::api::{AppState, routes};
use funnel_agent::channels::{SendOutcome, ZapiClient};
use funnel_agent::config::{AppConfig, CrmConfig, LlmConfig, ZapiConfig};
use funnel_agent::crm::{CrmSync, CrmSyncReport, CrmUpdate, SentRequest};
use funnel_agent::llm::{ChatMessage, CompletionRequest, LlmProvider, create_provider};
use funnel_agent::store::JsonlLog;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const MODEL_ANSWER: &str = "Claro! Envio a proposta hoje.";

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    authorization: Option<String>,
    body: Value,
}

type RequestLog = Arc<Mutex<Vec<Recorded>>>;

async fn record(
    State(log): State<RequestLog>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    log.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    canned_response(&path)
}

fn canned_response(path: &str) -> Response {
    if path.ends_with("/chat/completions") {
        Json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_760_000_000,
            "model": "gpt-4o-mini",
            "system_fingerprint": null,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": MODEL_ANSWER, "refusal": null },
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 21, "completion_tokens": 5, "total_tokens": 26 }
        }))
        .into_response()
    } else if path.starts_with("/instances/texto/") {
        "queued".into_response()
    } else if path.ends_with("/send-message") {
        Json(json!({ "zaapId": "z-1", "messageId": "m-1" })).into_response()
    } else if path.ends_with("/tasks") {
        (StatusCode::CREATED, Json(json!({ "id": "t-1" }))).into_response()
    } else {
        Json(json!({ "ok": true })).into_response()
    }
}

/// Start the recording stub on a random port, return (port, request log).
async fn start_stub() -> (u16, RequestLog) {
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(Arc::clone(&log));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, log)
}

fn recorded(log: &RequestLog) -> Vec<Recorded> {
    log.lock().unwrap().clone()
}

fn crm_config(port: u16) -> CrmConfig {
    CrmConfig {
        base_url: format!("http://127.0.0.1:{port}/crm"),
        token: SecretString::from("crm-secret".to_string()),
    }
}

fn zapi_config(port: u16, instance_id: &str) -> ZapiConfig {
    ZapiConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        instance_id: Some(instance_id.to_string()),
        token: Some(SecretString::from("tok-1".to_string())),
    }
}

fn llm_config(port: u16) -> LlmConfig {
    LlmConfig {
        api_key: Some(SecretString::from("sk-test".to_string())),
        base_url: format!("http://127.0.0.1:{port}/v1"),
        model: "gpt-4o-mini".to_string(),
    }
}

fn task(title: &str, due_in_hours: u32) -> FollowUpTask {
    FollowUpTask {
        title: title.to_string(),
        due_in_hours,
        priority: "High".to_string(),
    }
}

// ── CRM ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn crm_sync_patches_lead_and_posts_each_task() {
    timeout(TEST_TIMEOUT, async {
        let (port, log) = start_stub().await;
        let tmp = tempfile::tempdir().unwrap();
        let crm = CrmSync::new(Some(crm_config(port)), JsonlLog::new(tmp.path()));

        let update = CrmUpdate {
            lead_id: "LEAD-5511".into(),
            stage: Stage::Proposta,
            insights: vec!["Urgência: Alta".into()],
            tags: vec!["urgencia_alta".into(), "nao_decisor".into()],
            tasks: vec![
                task("Gerar proposta base e anexar cases", 12),
                task("Identificar e incluir decisor", 48),
            ],
            ts: Utc::now(),
        };

        let report = crm.sync(&update).await.unwrap();
        assert_eq!(
            report,
            CrmSyncReport::Remote {
                sent: vec![
                    SentRequest { endpoint: "lead".into(), code: 200 },
                    SentRequest { endpoint: "task".into(), code: 201 },
                    SentRequest { endpoint: "task".into(), code: 201 },
                ],
                errors: vec![],
            }
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "sent": [
                { "endpoint": "lead", "code": 200 },
                { "endpoint": "task", "code": 201 },
                { "endpoint": "task", "code": 201 }
            ] })
        );

        let requests = recorded(&log);
        assert_eq!(requests.len(), 3);

        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[0].path, "/crm/leads/LEAD-5511");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer crm-secret"));
        assert_eq!(
            requests[0].body,
            json!({
                "stage": "Proposta",
                "insights": ["Urgência: Alta"],
                "tags": ["urgencia_alta", "nao_decisor"]
            })
        );

        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[1].path, "/crm/tasks");
        assert_eq!(requests[1].authorization.as_deref(), Some("Bearer crm-secret"));
        assert_eq!(
            requests[1].body,
            json!({
                "lead_id": "LEAD-5511",
                "title": "Gerar proposta base e anexar cases",
                "due_in_hours": 12,
                "priority": "High"
            })
        );
        assert_eq!(requests[2].body["title"], "Identificar e incluir decisor");

        assert!(!tmp.path().join("crm_sync.jsonl").exists());
    })
    .await
    .expect("test timed out");
}

// ── Z-API ───────────────────────────────────────────────────────────

#[tokio::test]
async fn zapi_send_delivers_with_json_body() {
    timeout(TEST_TIMEOUT, async {
        let (port, log) = start_stub().await;
        let client = ZapiClient::new(zapi_config(port, "inst-1"));

        let outcome = client.send_message("5511999998888", "Olá!").await;
        let expected_body = json!({ "zaapId": "z-1", "messageId": "m-1" });
        assert_eq!(
            outcome,
            SendOutcome::Delivered {
                status_code: 200,
                body: expected_body.clone(),
            }
        );
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "status_code": 200, "body": expected_body })
        );

        let requests = recorded(&log);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/instances/inst-1/token/tok-1/send-message");
        assert_eq!(
            requests[0].body,
            json!({ "phone": "5511999998888", "message": "Olá!" })
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn zapi_send_keeps_plain_text_body() {
    timeout(TEST_TIMEOUT, async {
        let (port, _log) = start_stub().await;
        let client = ZapiClient::new(zapi_config(port, "texto"));

        let outcome = client.send_message("5511", "oi").await;
        assert_eq!(
            outcome,
            SendOutcome::Delivered {
                status_code: 200,
                body: Value::String("queued".into()),
            }
        );
    })
    .await
    .expect("test timed out");
}

// ── Reply model ─────────────────────────────────────────────────────

#[tokio::test]
async fn llm_provider_calls_chat_completions() {
    timeout(TEST_TIMEOUT, async {
        let (port, log) = start_stub().await;
        let provider = create_provider(&llm_config(port)).unwrap().unwrap();

        let response = provider
            .complete(
                CompletionRequest::new(vec![
                    ChatMessage::system("Seja breve."),
                    ChatMessage::user("Quero uma proposta"),
                ])
                .with_temperature(0.4)
                .with_max_tokens(120),
            )
            .await
            .unwrap();
        assert_eq!(response.content, MODEL_ANSWER);
        assert_eq!(response.input_tokens, 21);

        let requests = recorded(&log);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/v1/chat/completions");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer sk-test"));
        assert_eq!(requests[0].body["model"], "gpt-4o-mini");
        assert_eq!(requests[0].body["temperature"], 0.4);

        let sent = requests[0].body["messages"].to_string();
        assert!(sent.contains("Seja breve."));
        assert!(sent.contains("Quero uma proposta"));
    })
    .await
    .expect("test timed out");
}

// ── Full webhook flow ───────────────────────────────────────────────

#[tokio::test]
async fn webhook_uses_every_configured_collaborator() {
    timeout(TEST_TIMEOUT, async {
        let (stub_port, log) = start_stub().await;
        let tmp = tempfile::tempdir().unwrap();

        let config = AppConfig {
            port: 0,
            data_dir: PathBuf::from(tmp.path()),
            zapi: zapi_config(stub_port, "inst-1"),
            crm: Some(crm_config(stub_port)),
            llm: llm_config(stub_port),
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.replies.model_name(), Some("gpt-4o-mini"));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, routes(state)).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/zapi/webhook"))
            .json(&json!({
                "phone": "5511999998888",
                "senderName": "Ana",
                "message": "Olá, estou gastando muito com retrabalho, preciso falar com meu \
                            chefe antes de decidir, mas gostaria de receber uma proposta ainda \
                            este mês"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["reply"], MODEL_ANSWER);
        assert_eq!(body["stage"], "Proposta");
        assert_eq!(body["wa"]["status_code"], 200);
        assert_eq!(body["crm"]["sent"].as_array().unwrap().len(), 3);
        assert!(body["crm"].get("errors").is_none());

        let paths: Vec<String> = recorded(&log).into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/v1/chat/completions",
                "/crm/leads/LEAD-5511999998888",
                "/crm/tasks",
                "/crm/tasks",
                "/instances/inst-1/token/tok-1/send-message",
            ]
        );

        let history = std::fs::read_to_string(tmp.path().join("history.jsonl")).unwrap();
        let record: Value = serde_json::from_str(history.trim()).unwrap();
        assert_eq!(record["reply"], MODEL_ANSWER);
        assert_eq!(record["wa_send"]["body"]["messageId"], "m-1");
    })
    .await
    .expect("test timed out");
}
