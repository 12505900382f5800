//! Runtime configuration for the check-in service.
//!
//! Layered: built-in defaults, then an optional file (path from `SOLACE_CONFIG`, default
//! `config/solace`), then `SOLACE__*` environment variables.

use crate::llm::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckinConfig {
    pub port: u16,
    /// Base directory; the session archive lives under `{storage_path}/sessions`.
    pub storage_path: String,
    pub llm_api_url: String,
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    #[serde(default)]
    pub text_classifier_url: Option<String>,
    #[serde(default)]
    pub audio_classifier_url: Option<String>,
    pub session_ttl_secs: u64,
    pub session_capacity: usize,
    pub sweep_interval_secs: u64,
}

impl CheckinConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("SOLACE_CONFIG").unwrap_or_else(|_| "config/solace".to_string());
        let built = config::Config::builder()
            .set_default("port", 8000_i64)?
            .set_default("storage_path", "./data")?
            .set_default("llm_api_url", DEFAULT_API_BASE)?
            .set_default("llm_model", DEFAULT_MODEL)?
            .set_default("llm_timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            .set_default("session_ttl_secs", 7200_i64)?
            .set_default("session_capacity", 1024_i64)?
            .set_default("sweep_interval_secs", 300_i64)?
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(config::Environment::with_prefix("SOLACE").separator("__"))
            .build()?;

        let mut cfg: CheckinConfig = built.try_deserialize()?;
        if cfg.llm_api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            cfg.llm_api_key = api_key_from_env();
        }
        Ok(cfg)
    }

    /// Directory of the sled session archive.
    pub fn archive_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.storage_path).join("sessions")
    }

    pub fn has_llm_key(&self) -> bool {
        self.llm_api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// `SOLACE_LLM_API_KEY`, then `OPENROUTER_API_KEY`; blank values are skipped.
pub fn api_key_from_env() -> Option<String> {
    ["SOLACE_LLM_API_KEY", "OPENROUTER_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
