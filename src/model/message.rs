use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[inline]
    pub fn is_user(&self) -> bool {
        matches!(self, Role::User)
    }
}

/// One unit of multimodal message content.
///
/// On the wire the variant name is the `type` tag and the payload sits under
/// a key with the same name, e.g. `{"type":"image_url","image_url":{"url":".."}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    VideoUrl { video_url: MediaUrl },
    InputAudio { input_audio: InputAudio },
    ImageBase64 { image_base64: ImageBase64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageBase64 {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentItem::ImageUrl {
            image_url: MediaUrl { url: url.into() },
        }
    }

    /// True for a `text` item whose text is not blank.
    pub fn has_text(&self) -> bool {
        match self {
            ContentItem::Text { text } => !text.trim().is_empty(),
            ContentItem::ImageUrl { .. }
            | ContentItem::VideoUrl { .. }
            | ContentItem::InputAudio { .. }
            | ContentItem::ImageBase64 { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentItem>,
}

impl Message {
    pub fn user(content: Vec<ContentItem>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn system_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentItem::text(text)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_base64_uses_nested_payload_key() {
        let item = ContentItem::ImageBase64 {
            image_base64: ImageBase64 {
                data: "QUJD".into(),
                mime: Some("image/jpeg".into()),
                name: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"type": "image_base64", "image_base64": {"data": "QUJD", "mime": "image/jpeg"}})
        );
    }

    #[test]
    fn parses_input_audio_item() {
        let item: ContentItem = serde_json::from_value(json!({
            "type": "input_audio",
            "input_audio": {"data": "AAAA", "format": "audio/webm"}
        }))
        .unwrap();
        assert_eq!(
            item,
            ContentItem::InputAudio {
                input_audio: InputAudio {
                    data: "AAAA".into(),
                    format: "audio/webm".into()
                }
            }
        );
    }

    #[test]
    fn blank_text_is_not_text() {
        assert!(!ContentItem::text("   ").has_text());
        assert!(ContentItem::text("halo").has_text());
        assert!(!ContentItem::image_url("https://x/y.png").has_text());
    }

    #[test]
    fn only_user_role_is_user() {
        assert!(Role::User.is_user());
        assert!(!Role::Assistant.is_user());
        assert!(!Role::System.is_user());
    }

    #[test]
    fn roles_are_lowercase_on_the_wire() {
        let msg = Message::system_text("aturan");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"][0], json!({"type": "text", "text": "aturan"}));
    }
}
