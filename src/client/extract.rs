use serde_json::Value;

/// Pulls displayable text out of whatever the relay returned.
///
/// Tried in order, the first non-empty result wins:
/// 1. `choices[0].message.content` as a list of items or a plain string;
/// 2. `message.content` likewise;
/// 3. the whole response pretty-printed.
pub fn extract_reply(response: &Value) -> String {
    from_choices(response)
        .filter(|text| !text.is_empty())
        .or_else(|| from_message(response).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| pretty(response))
}

fn from_choices(response: &Value) -> Option<String> {
    let first = response.get("choices")?.as_array()?.first()?;
    match first.get("message")?.get("content")? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(render_choice_item)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

fn render_choice_item(item: &Value) -> String {
    match item.get("type").and_then(Value::as_str) {
        Some("text") => item.get("text").map(plain).unwrap_or_default(),
        Some("image_url") => {
            let url = item
                .get("image_url")
                .and_then(|i| i.get("url"))
                .map(plain)
                .unwrap_or_default();
            format!("[image] {url}")
        }
        _ => compact(item),
    }
}

fn from_message(response: &Value) -> Option<String> {
    match response.get("message")?.get("content")? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item.get("text").and_then(Value::as_str) {
                    Some(text) if !text.is_empty() => text.to_string(),
                    _ => compact(item),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::Null => None,
        other => Some(plain(other)),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => compact(other),
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| compact(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choices_with_text_items() {
        let resp = json!({"choices": [{"message": {"content": [{"type": "text", "text": "X"}]}}]});
        assert_eq!(extract_reply(&resp), "X");
    }

    #[test]
    fn choices_with_string_content() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "Siaga banjir"}}]});
        assert_eq!(extract_reply(&resp), "Siaga banjir");
    }

    #[test]
    fn choices_with_mixed_items() {
        let resp = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "Lihat peta:"},
            {"type": "image_url", "image_url": {"url": "https://x/peta.png"}},
            {"type": "audio", "id": 3}
        ]}}]});
        assert_eq!(
            extract_reply(&resp),
            "Lihat peta:\n[image] https://x/peta.png\n{\"id\":3,\"type\":\"audio\"}"
        );
    }

    #[test]
    fn message_content_string() {
        assert_eq!(extract_reply(&json!({"message": {"content": "Y"}})), "Y");
    }

    #[test]
    fn message_content_items() {
        let resp = json!({"message": {"content": [{"text": "a"}, {"kind": "b"}]}});
        assert_eq!(extract_reply(&resp), "a\n{\"kind\":\"b\"}");
    }

    #[test]
    fn empty_choices_fall_through_to_message() {
        let resp = json!({"choices": [], "message": {"content": "Z"}});
        assert_eq!(extract_reply(&resp), "Z");

        let resp = json!({"choices": [{"message": {"content": ""}}], "message": {"content": "W"}});
        assert_eq!(extract_reply(&resp), "W");
    }

    #[test]
    fn unknown_shape_is_pretty_dumped() {
        let resp = json!({"error": {"code": 429, "message": "rate limited"}});
        assert_eq!(
            extract_reply(&resp),
            serde_json::to_string_pretty(&resp).unwrap()
        );
    }
}
