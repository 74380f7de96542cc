use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::error::ClientError;
use crate::model::ChatRequest;

/// Delivers one chat request and returns the decoded reply body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<Value, ClientError>;
}

/// Posts chat requests to the relay over HTTP.
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for RelayClient {
    async fn send(&self, request: &ChatRequest) -> Result<Value, ClientError> {
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Relay {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "relay replied");
        Ok(serde_json::from_slice(&bytes)?)
    }
}
