//! CRM synchronization: pushes stage, insights, tags and tasks for a lead.
//!
//! With a CRM API configured, the lead is PATCHed and each task POSTed;
//! individual request failures are collected in the report instead of
//! aborting the sync. Without one, the update is appended to a local
//! `crm_sync.jsonl` log.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{AnalysisResult, FollowUpTask, Stage};
use crate::config::CrmConfig;
use crate::error::CrmError;
use crate::store::JsonlLog;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const LOCAL_LOG_FILE: &str = "crm_sync.jsonl";

/// What gets written to the CRM for one analyzed lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrmUpdate {
    pub lead_id: String,
    pub stage: Stage,
    pub insights: Vec<String>,
    pub tags: Vec<String>,
    pub tasks: Vec<FollowUpTask>,
    pub ts: DateTime<Utc>,
}

impl CrmUpdate {
    pub fn from_analysis(analysis: &AnalysisResult, ts: DateTime<Utc>) -> Self {
        Self {
            lead_id: analysis.lead_id.clone(),
            stage: analysis.stage,
            insights: analysis.insights.clone(),
            tags: analysis.tags.clone(),
            tasks: analysis.tasks_to_create.clone(),
            ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentRequest {
    pub endpoint: String,
    pub code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRequest {
    pub endpoint: String,
    pub error: String,
}

/// Outcome of a sync, returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CrmSyncReport {
    Remote {
        sent: Vec<SentRequest>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        errors: Vec<FailedRequest>,
    },
    Logged {
        logged: bool,
    },
}

#[derive(Serialize)]
struct LeadPatch<'a> {
    stage: Stage,
    insights: &'a [String],
    tags: &'a [String],
}

#[derive(Serialize)]
struct TaskPayload<'a> {
    lead_id: &'a str,
    #[serde(flatten)]
    task: &'a FollowUpTask,
}

/// CRM client with a local-log fallback.
pub struct CrmSync {
    remote: Option<CrmConfig>,
    client: reqwest::Client,
    log: JsonlLog,
}

impl CrmSync {
    pub fn new(remote: Option<CrmConfig>, log: JsonlLog) -> Self {
        Self {
            remote,
            client: reqwest::Client::new(),
            log,
        }
    }

    pub async fn sync(&self, update: &CrmUpdate) -> Result<CrmSyncReport, CrmError> {
        let Some(remote) = &self.remote else {
            self.log.append(LOCAL_LOG_FILE, update).await?;
            info!(lead_id = %update.lead_id, "CRM not configured, update logged locally");
            return Ok(CrmSyncReport::Logged { logged: true });
        };

        let mut sent = Vec::new();
        let mut errors = Vec::new();

        let lead_url = format!("{}/leads/{}", remote.base_url, update.lead_id);
        let patch = LeadPatch {
            stage: update.stage,
            insights: &update.insights,
            tags: &update.tags,
        };
        match self
            .send(remote, self.client.patch(&lead_url).json(&patch), "lead")
            .await
        {
            Ok(code) => sent.push(SentRequest {
                endpoint: "lead".into(),
                code,
            }),
            Err(e) => errors.push(failed("lead", e)),
        }

        let tasks_url = format!("{}/tasks", remote.base_url);
        for task in &update.tasks {
            let payload = TaskPayload {
                lead_id: &update.lead_id,
                task,
            };
            match self
                .send(remote, self.client.post(&tasks_url).json(&payload), "task")
                .await
            {
                Ok(code) => sent.push(SentRequest {
                    endpoint: "task".into(),
                    code,
                }),
                Err(e) => errors.push(failed("task", e)),
            }
        }

        info!(
            lead_id = %update.lead_id,
            sent = sent.len(),
            failed = errors.len(),
            "CRM sync finished"
        );

        Ok(CrmSyncReport::Remote { sent, errors })
    }

    async fn send(
        &self,
        remote: &CrmConfig,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<u16, CrmError> {
        let resp = request
            .bearer_auth(remote.token.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(resp.status().as_u16())
    }
}

fn failed(endpoint: &str, error: CrmError) -> FailedRequest {
    warn!(endpoint, error = %error, "CRM request failed");
    FailedRequest {
        endpoint: endpoint.to_string(),
        error: error.to_string(),
    }
}
