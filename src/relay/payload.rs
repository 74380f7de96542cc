use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::prompts::system_instruction;
use crate::model::ContentItem;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Incoming relay body, read field by field.
///
/// Only the JSON syntax itself is validated. A field of the wrong shape is
/// treated as absent so a sloppy client still gets an answer.
#[derive(Debug, Default)]
pub struct RelayRequest {
    pub model: Option<String>,
    pub messages: Vec<Value>,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub max_output_tokens: Option<u64>,
    pub max_chars: Option<f64>,
}

impl RelayRequest {
    pub fn from_value(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Self::default();
        };

        let messages = match map.remove("messages") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        Self {
            model: take_string(&mut map, "model"),
            messages,
            referer: take_string(&mut map, "referer"),
            title: take_string(&mut map, "title"),
            max_output_tokens: map
                .get("max_output_tokens")
                .and_then(Value::as_u64)
                .filter(|tokens| *tokens > 0),
            max_chars: map
                .get("max_chars")
                .and_then(Value::as_f64)
                .filter(|chars| chars.is_finite() && *chars > 0.0),
        }
    }

    /// Explicit `max_output_tokens` wins over the `max_chars` estimate.
    pub fn max_output_tokens(&self) -> Option<u64> {
        resolve_max_output_tokens(self.max_output_tokens, self.max_chars)
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Roughly four characters per token.
pub fn resolve_max_output_tokens(explicit: Option<u64>, max_chars: Option<f64>) -> Option<u64> {
    explicit.or_else(|| max_chars.map(|chars| (chars / 4.0).ceil() as u64))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UpstreamPayload {
    pub model: String,
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
}

impl UpstreamPayload {
    /// System prompt first, then the client's messages with their content
    /// normalized for the upstream API.
    pub fn build(request: &mut RelayRequest, default_model: &str) -> Self {
        let client_messages = std::mem::take(&mut request.messages);
        let mut messages = Vec::with_capacity(client_messages.len() + 1);
        messages.push(system_message());
        messages.extend(normalize_messages(client_messages));

        Self {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            messages,
            max_output_tokens: request.max_output_tokens(),
        }
    }
}

fn system_message() -> Value {
    json!({
        "role": "system",
        "content": [{ "type": "text", "text": system_instruction() }]
    })
}

/// Rewrites every `image_base64` item carrying data into an `image_url` data
/// URI. Only `data` and `mime` are read; everything else is left untouched.
pub fn normalize_messages(messages: Vec<Value>) -> Vec<Value> {
    messages.into_iter().map(normalize_message).collect()
}

fn normalize_message(mut message: Value) -> Value {
    if let Some(Value::Array(items)) = message.get_mut("content") {
        for item in items.iter_mut() {
            if let Some(rewritten) = rewrite_item(item) {
                *item = rewritten;
            }
        }
    }
    message
}

fn rewrite_item(item: &Value) -> Option<Value> {
    if item.get("type").and_then(Value::as_str) != Some("image_base64") {
        return None;
    }
    let image = item.get("image_base64")?;
    let data = image
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())?;
    let mime = image
        .get("mime")
        .and_then(Value::as_str)
        .filter(|mime| !mime.is_empty())
        .unwrap_or(DEFAULT_IMAGE_MIME);

    let url = format!("data:{mime};base64,{data}");
    serde_json::to_value(ContentItem::image_url(url)).ok()
}
