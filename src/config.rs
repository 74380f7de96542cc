use std::fmt;

use anyhow::{Context, Result};

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// Development fallback only; deployments set CHATBOT_WORKER_URL.
const DEFAULT_WORKER_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_MAX_CHARS: u64 = 2000;

/// Settings for the relay process. The API key never leaves this struct
/// except as the upstream `Authorization` header.
#[derive(Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub upstream_url: String,
    pub default_model: String,
    pub max_body_bytes: usize,
    api_key: String,
}

impl RelayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = dotenvy::var("OPENROUTER_API_KEY")
            .context("OPENROUTER_API_KEY must be set for the relay")?;

        let mut config = Self::new(api_key);
        if let Ok(addr) = dotenvy::var("RELAY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = dotenvy::var("RELAY_UPSTREAM_URL") {
            config.upstream_url = url;
        }
        if let Ok(model) = dotenvy::var("RELAY_DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Ok(raw) = dotenvy::var("RELAY_MAX_BODY_BYTES") {
            config.max_body_bytes = raw
                .parse()
                .with_context(|| format!("RELAY_MAX_BODY_BYTES is not a byte count: {raw}"))?;
        }
        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("bind_addr", &self.bind_addr)
            .field("upstream_url", &self.upstream_url)
            .field("default_model", &self.default_model)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Settings for the chat client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub worker_url: String,
    pub model: String,
    pub max_chars: u64,
    pub referer: Option<String>,
    pub title: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            worker_url: DEFAULT_WORKER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_chars: DEFAULT_MAX_CHARS,
            referer: None,
            title: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let max_chars = match dotenvy::var("CHATBOT_MAX_CHARS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("CHATBOT_MAX_CHARS is not a number: {raw}"))?,
            Err(_) => defaults.max_chars,
        };

        Ok(Self {
            worker_url: dotenvy::var("CHATBOT_WORKER_URL").unwrap_or(defaults.worker_url),
            model: dotenvy::var("CHATBOT_MODEL").unwrap_or(defaults.model),
            max_chars,
            referer: non_empty_var("CHATBOT_REFERER"),
            title: non_empty_var("CHATBOT_TITLE"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|v| !v.trim().is_empty())
}
