//! WhatsApp channel via Z-API: webhook normalization and outbound sends.
//!
//! Z-API delivers several payload shapes depending on message type and
//! account version; `extract_event` folds them into a single
//! [`WebhookEvent`].

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ZapiConfig;
use crate::error::ChannelError;

const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Text, sender phone (digits only) and display name from an inbound webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookEvent {
    pub text: String,
    pub phone: String,
    pub sender_name: String,
}

impl WebhookEvent {
    /// Lead identifier derived from the sender phone.
    pub fn lead_id(&self) -> String {
        format!("LEAD-{}", self.phone)
    }
}

/// Normalize a Z-API webhook payload.
pub fn extract_event(payload: &Value) -> WebhookEvent {
    let candidates = [
        payload.get("message"),
        payload.get("body"),
        payload.get("text"),
        payload.get("text").and_then(|t| t.get("body")),
        payload.get("message").and_then(|m| m.get("text")),
        payload
            .get("messageData")
            .and_then(|m| m.get("textMessageData"))
            .and_then(|m| m.get("textMessage")),
    ];

    let mut text: Option<String> = None;
    let mut phone: Option<&Value> = None;
    let mut sender_name: Option<String> = None;

    // Batched shape: nothing at the top level, look at messages[0].
    if !candidates.iter().any(|c| c.is_some_and(is_truthy)) {
        if let Some(first) = payload
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|m| m.first())
        {
            text = first_truthy(&[
                first.get("text").and_then(|t| t.get("body")),
                first.get("body"),
                first.get("message"),
            ])
            .and_then(Value::as_str)
            .map(String::from);
            phone = first_truthy(&[first.get("from"), first.get("author"), first.get("phone")]);
            sender_name = first_truthy(&[
                first.get("pushName"),
                first.get("senderName"),
                first.get("name"),
            ])
            .and_then(Value::as_str)
            .map(String::from);
        }
    }

    if text.is_none() {
        text = candidates
            .iter()
            .flatten()
            .filter_map(|c| c.as_str())
            .find(|s| !s.trim().is_empty())
            .map(String::from);
    }

    let phone = phone.or_else(|| {
        first_truthy(&[
            payload.get("phone"),
            payload.get("from"),
            payload.get("sender"),
            payload.get("chatId"),
        ])
    });

    let sender_name = sender_name.or_else(|| {
        first_truthy(&[
            payload.get("senderName"),
            payload.get("pushName"),
            payload.get("name"),
        ])
        .and_then(Value::as_str)
        .map(String::from)
    });

    WebhookEvent {
        text: text.unwrap_or_default(),
        phone: phone.and_then(Value::as_str).map(digits_only).unwrap_or_default(),
        sender_name: sender_name.unwrap_or_default(),
    }
}

/// Keep only ASCII digits (`5511999998888@c.us` → `5511999998888`).
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_truthy<'a>(values: &[Option<&'a Value>]) -> Option<&'a Value> {
    values.iter().flatten().copied().find(|v| is_truthy(v))
}

// ── Outbound ────────────────────────────────────────────────────────

/// Result of an outbound send, reported back to the webhook caller as
/// `{"skipped": true, "reason"}`, `{"status_code", "body"}` or `{"error"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SendOutcome {
    /// Credentials not configured; nothing was sent.
    Skipped { skipped: bool, reason: String },
    /// Z-API answered (any HTTP status).
    Delivered { status_code: u16, body: Value },
    /// Transport-level failure.
    Failed { error: String },
}

impl SendOutcome {
    fn skipped(reason: &str) -> Self {
        Self::Skipped {
            skipped: true,
            reason: reason.to_string(),
        }
    }
}

/// Z-API client for outbound text messages.
pub struct ZapiClient {
    config: ZapiConfig,
    client: reqwest::Client,
}

impl ZapiClient {
    pub fn new(config: ZapiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn send_url(&self, instance_id: &str, token: &str) -> String {
        format!(
            "{}/instances/{instance_id}/token/{token}/send-message",
            self.config.base_url
        )
    }

    /// Send a text message. Never fails: problems are reported in the outcome.
    pub async fn send_message(&self, phone: &str, message: &str) -> SendOutcome {
        let (Some(instance_id), Some(token)) = (&self.config.instance_id, &self.config.token) else {
            return SendOutcome::skipped("Z-API não configurada");
        };

        match self
            .post_message(instance_id, token.expose_secret(), phone, message)
            .await
        {
            Ok((status_code, body)) => {
                info!(phone, status_code, "WhatsApp message sent");
                SendOutcome::Delivered { status_code, body }
            }
            Err(e) => {
                warn!(phone, error = %e, "WhatsApp send failed");
                SendOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn post_message(
        &self,
        instance_id: &str,
        token: &str,
        phone: &str,
        message: &str,
    ) -> Result<(u16, Value), ChannelError> {
        let send_failed = |reason: String| ChannelError::SendFailed {
            name: "whatsapp".into(),
            reason,
        };

        let resp = self
            .client
            .post(self.send_url(instance_id, token))
            .json(&serde_json::json!({ "phone": phone, "message": message }))
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        let status_code = resp.status().as_u16();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = if is_json {
            resp.json::<Value>()
                .await
                .map_err(|e| send_failed(e.to_string()))?
        } else {
            Value::String(resp.text().await.map_err(|e| send_failed(e.to_string()))?)
        };

        Ok((status_code, body))
    }
}
