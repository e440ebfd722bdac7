//! Configuration types, read from the environment.

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATA_DIR: &str = "./var/data";
const DEFAULT_ZAPI_BASE: &str = "https://api.z-api.io";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Directory for the JSONL history and CRM fallback logs.
    pub data_dir: PathBuf,
    pub zapi: ZapiConfig,
    /// `None` when the CRM API is not configured (local log only).
    pub crm: Option<CrmConfig>,
    pub llm: LlmConfig,
}

/// Z-API WhatsApp credentials. Sends are skipped unless both are set.
#[derive(Debug, Clone)]
pub struct ZapiConfig {
    pub base_url: String,
    pub instance_id: Option<String>,
    pub token: Option<SecretString>,
}

impl ZapiConfig {
    pub fn is_configured(&self) -> bool {
        self.instance_id.is_some() && self.token.is_some()
    }
}

impl Default for ZapiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ZAPI_BASE.to_string(),
            instance_id: None,
            token: None,
        }
    }
}

/// Remote CRM API.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub token: SecretString,
}

/// OpenAI-compatible chat-completions endpoint for reply generation.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` disables the model; replies fall back to a fixed template.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            zapi: ZapiConfig::default(),
            crm: None,
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let zapi = ZapiConfig {
            base_url: get("Z_API_BASE")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ZAPI_BASE.to_string()),
            instance_id: get("Z_API_INSTANCE_ID"),
            token: get("Z_API_TOKEN").map(SecretString::from),
        };

        let crm = match (get("CRM_API_BASE_URL"), get("CRM_API_TOKEN")) {
            (Some(base_url), Some(token)) => Some(CrmConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: SecretString::from(token),
            }),
            _ => None,
        };

        let llm = LlmConfig {
            api_key: get("OPENAI_API_KEY").map(SecretString::from),
            base_url: get("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        Ok(Self {
            port,
            data_dir,
            zapi,
            crm,
            llm,
        })
    }
}

/// Load a `.env` file from the working directory (or a parent) into the
/// process environment. Variables already set take precedence; a missing
/// file is not an error. Returns whether a file was loaded.
pub fn load_dotenv() -> bool {
    report_env_file(dotenvy::dotenv())
}

fn report_env_file(result: Result<PathBuf, dotenvy::Error>) -> bool {
    match result {
        Ok(path) => {
            info!(path = %path.display(), "Loaded environment file");
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!(error = %e, "Failed to load .env file");
            false
        }
    }
}
