use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ClientError;
use super::recorder::AudioClip;
use crate::model::{ContentItem, ImageBase64, InputAudio, Message};

/// Uploads above this size are refused before any encoding or network call.
pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;

pub const AUDIO_HINT: &str = "Pesan suara terlampir. Mohon transkripsikan dan jawab.";
pub const IMAGE_HINT: &str = "(image)";
const AUDIO_PLACEHOLDER: &str = "(audio)";
const DEFAULT_IMAGE_MIME: &str = "image/png";
const DEFAULT_IMAGE_NAME: &str = "upload.png";

static DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(.*);base64,(.*)$").expect("invalid data url pattern")
});

/// An image picked for upload, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub name: String,
    pub mime: String,
    pub data_base64: String,
}

impl ImageAttachment {
    pub fn from_bytes(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, ClientError> {
        check_size(bytes.len() as u64)?;
        Ok(Self {
            name: name.into(),
            mime: mime.into(),
            data_base64: BASE64.encode(bytes),
        })
    }

    /// Accepts a `data:<mime>;base64,<data>` URL. Anything else is kept whole
    /// as the payload under the default mime type.
    pub fn from_data_url(name: impl Into<String>, data_url: &str) -> Self {
        let (mime, data) = split_data_url(data_url)
            .map(|(mime, data)| (mime.to_string(), data.to_string()))
            .unwrap_or_else(|| (DEFAULT_IMAGE_MIME.to_string(), data_url.to_string()));
        Self {
            name: name.into(),
            mime,
            data_base64: data,
        }
    }

    /// Reads an image from disk, checking its size before reading it.
    pub async fn load(path: &Path) -> Result<Self, ClientError> {
        let meta = tokio::fs::metadata(path).await?;
        check_size(meta.len())?;

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_IMAGE_NAME)
            .to_string();
        Self::from_bytes(name, image_mime_for(path), &bytes)
    }

    fn to_content(&self) -> ContentItem {
        let mime = if self.mime.is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            self.mime.clone()
        };
        let name = if self.name.is_empty() {
            DEFAULT_IMAGE_NAME.to_string()
        } else {
            self.name.clone()
        };
        ContentItem::ImageBase64 {
            image_base64: ImageBase64 {
                data: self.data_base64.clone(),
                mime: Some(mime),
                name: Some(name),
            },
        }
    }
}

fn check_size(size: u64) -> Result<(), ClientError> {
    if size > MAX_IMAGE_BYTES {
        return Err(ClientError::FileTooLarge { size });
    }
    Ok(())
}

/// Splits a base64 data URL into `(mime, data)`.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let caps = DATA_URL.captures(url)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn image_mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => DEFAULT_IMAGE_MIME,
    }
}

/// Builds the single user message for one send, or `None` when there is
/// nothing to send.
pub fn build_user_message(
    text: &str,
    image: Option<&ImageAttachment>,
    audio: Option<&AudioClip>,
) -> Option<Message> {
    let text = text.trim();
    if text.is_empty() && image.is_none() && audio.is_none() {
        return None;
    }

    let mut content = Vec::with_capacity(3);
    if !text.is_empty() {
        content.push(ContentItem::text(text));
    }
    if let Some(image) = image {
        content.push(image.to_content());
    }
    if let Some(audio) = audio {
        content.push(ContentItem::InputAudio {
            input_audio: InputAudio {
                data: audio.data_base64.clone(),
                format: audio.mime.clone(),
            },
        });
    }

    // Providers treat media-only messages as empty.
    if !content.iter().any(ContentItem::has_text) {
        let hint = if audio.is_some() { AUDIO_HINT } else { IMAGE_HINT };
        content.insert(0, ContentItem::text(hint));
    }

    Some(Message::user(content))
}

/// What the sender sees in their own bubble before the reply arrives.
pub fn optimistic_text(text: &str, has_image: bool, has_audio: bool) -> String {
    let text = text.trim();
    if !text.is_empty() {
        text.to_string()
    } else if has_image {
        IMAGE_HINT.to_string()
    } else if has_audio {
        AUDIO_PLACEHOLDER.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::recorder::Preview;
    use serde_json::json;

    fn clip() -> AudioClip {
        AudioClip {
            data_base64: "T2dnUw==".into(),
            mime: "audio/webm;codecs=opus".into(),
            preview: Preview {
                mime: "audio/webm;codecs=opus".into(),
                bytes: b"OggS".to_vec().into(),
            },
        }
    }

    fn image() -> ImageAttachment {
        ImageAttachment::from_bytes("banjir.jpg", "image/jpeg", b"\xff\xd8\xff").unwrap()
    }

    #[test]
    fn nothing_to_send() {
        assert!(build_user_message("   ", None, None).is_none());
    }

    #[test]
    fn text_is_trimmed() {
        let msg = build_user_message("  halo \n", None, None).unwrap();
        assert_eq!(msg.content, vec![ContentItem::text("halo")]);
    }

    #[test]
    fn image_only_gets_image_hint_first() {
        let msg = build_user_message("", Some(&image()), None).unwrap();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0], json!({"type": "text", "text": "(image)"}));
        assert_eq!(
            value["content"][1],
            json!({"type": "image_base64", "image_base64": {
                "data": "/9j/", "mime": "image/jpeg", "name": "banjir.jpg"
            }})
        );
    }

    #[test]
    fn audio_hint_wins_over_image_hint() {
        let msg = build_user_message("", Some(&image()), Some(&clip())).unwrap();
        assert_eq!(msg.content[0], ContentItem::text(AUDIO_HINT));
        assert_eq!(msg.content.len(), 3);
        assert_eq!(
            msg.content[2],
            ContentItem::InputAudio {
                input_audio: InputAudio {
                    data: "T2dnUw==".into(),
                    format: "audio/webm;codecs=opus".into()
                }
            }
        );
    }

    #[test]
    fn text_precedes_media_without_hint() {
        let msg = build_user_message("apa ini?", Some(&image()), None).unwrap();
        assert_eq!(msg.content[0], ContentItem::text("apa ini?"));
        assert_eq!(msg.content.len(), 2);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let big = vec![0u8; (MAX_IMAGE_BYTES + 1) as usize];
        let err = ImageAttachment::from_bytes("big.png", "image/png", &big).unwrap_err();
        assert!(matches!(err, ClientError::FileTooLarge { .. }));
        assert_eq!(err.to_string(), "Ukuran file terlalu besar. Maksimum 2 MB.");

        let exact = vec![0u8; MAX_IMAGE_BYTES as usize];
        assert!(ImageAttachment::from_bytes("ok.png", "image/png", &exact).is_ok());
    }

    #[test]
    fn data_url_is_split() {
        let img = ImageAttachment::from_data_url("a.gif", "data:image/gif;base64,R0lG");
        assert_eq!(img.mime, "image/gif");
        assert_eq!(img.data_base64, "R0lG");

        let raw = ImageAttachment::from_data_url("b", "R0lG");
        assert_eq!(raw.mime, "image/png");
        assert_eq!(raw.data_base64, "R0lG");
    }

    #[test]
    fn optimistic_placeholders() {
        assert_eq!(optimistic_text(" hai ", true, true), "hai");
        assert_eq!(optimistic_text("", true, true), "(image)");
        assert_eq!(optimistic_text("", false, true), "(audio)");
    }

    #[tokio::test]
    async fn load_refuses_large_file() {
        let dir = std::env::temp_dir().join(format!("klimata-img-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("huge.png");
        tokio::fs::write(&path, vec![0u8; (MAX_IMAGE_BYTES + 10) as usize])
            .await
            .unwrap();

        let err = ImageAttachment::load(&path).await.unwrap_err();
        assert!(matches!(err, ClientError::FileTooLarge { .. }));

        let small = dir.join("kecil.JPG");
        tokio::fs::write(&small, b"abc").await.unwrap();
        let img = ImageAttachment::load(&small).await.unwrap();
        assert_eq!(img.mime, "image/jpeg");
        assert_eq!(img.name, "kecil.JPG");
        assert_eq!(img.data_base64, "YWJj");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
