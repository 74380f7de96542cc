use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use super::payload::UpstreamPayload;
use crate::config::RelayConfig;

const DEFAULT_CONTENT_TYPE: &str = "application/json";
const HTTP_REFERER: &str = "http-referer";
const X_TITLE: &str = "x-title";

/// Client for the hosted chat-completions endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

/// Whatever the upstream answered, kept opaque.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

/// Optional attribution headers the caller asked us to forward.
#[derive(Debug, Default)]
pub struct Attribution<'a> {
    pub referer: Option<&'a str>,
    pub title: Option<&'a str>,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.upstream_url.clone(),
            api_key: config.api_key().to_string(),
        }
    }

    /// Single attempt. Transport errors are returned as-is; any HTTP status,
    /// success or not, is a reply.
    pub async fn forward(
        &self,
        payload: &UpstreamPayload,
        attribution: &Attribution<'_>,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .headers(self.headers(attribution))
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let body = response.bytes().await?;

        debug!(status, bytes = body.len(), "upstream replied");

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }

    fn headers(&self, attribution: &Attribution<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        match HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("upstream api key is not a valid header value; sending without it"),
        }

        for (name, value) in [(HTTP_REFERER, attribution.referer), (X_TITLE, attribution.title)] {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(name), value);
                }
                Err(_) => warn!(header = name, "skipping attribution header with invalid value"),
            }
        }

        headers
    }
}
