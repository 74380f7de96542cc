use std::path::Path;

use tracing::{info, warn};

use super::compose::{build_user_message, optimistic_text, ImageAttachment};
use super::error::ClientError;
use super::extract::extract_reply;
use super::recorder::{AudioClip, CaptureDevice, Preview, Recorder};
use super::transport::ChatTransport;
use crate::config::ClientConfig;
use crate::model::{ChatRequest, Message, Role};

pub const SEND_FAILED_TEXT: &str = "Terjadi kesalahan saat memproses permintaan.";

/// One bubble in the chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: String,
    pub audio: Option<Preview>,
}

impl DisplayMessage {
    fn now(role: Role, text: String, audio: Option<Preview>) -> Self {
        Self {
            role,
            text,
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
            audio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing to send.
    Skipped,
    Replied,
    Failed,
}

#[derive(Debug, Default)]
struct Draft {
    text: String,
    image: Option<ImageAttachment>,
    audio: Option<AudioClip>,
}

/// State of one open chat dialog. The log only grows until `close`.
pub struct ChatSession<T> {
    transport: T,
    config: ClientConfig,
    recorder: Recorder,
    messages: Vec<DisplayMessage>,
    draft: Draft,
    error: Option<String>,
    loading: bool,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, config: ClientConfig, recorder: Recorder) -> Self {
        Self {
            transport,
            config,
            recorder,
            messages: Vec::new(),
            draft: Draft::default(),
            error: None,
            loading: false,
        }
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn has_image(&self) -> bool {
        self.draft.image.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.draft.audio.is_some()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.error = None;
        self.draft.image = Some(image);
    }

    pub fn attach_image_bytes(
        &mut self,
        name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<(), ClientError> {
        match ImageAttachment::from_bytes(name, mime, bytes) {
            Ok(image) => {
                self.attach_image(image);
                Ok(())
            }
            Err(err) => Err(self.record_error(err)),
        }
    }

    pub async fn attach_image_file(&mut self, path: &Path) -> Result<(), ClientError> {
        match ImageAttachment::load(path).await {
            Ok(image) => {
                self.attach_image(image);
                Ok(())
            }
            Err(err) => Err(self.record_error(err)),
        }
    }

    pub fn clear_image(&mut self) {
        self.draft.image = None;
    }

    pub fn clear_audio(&mut self) {
        self.draft.audio = None;
    }

    pub async fn start_recording(
        &mut self,
        device: Box<dyn CaptureDevice>,
    ) -> Result<(), ClientError> {
        self.error = None;
        let result = self.recorder.start(device).await;
        result.map_err(|err| self.record_error(err))
    }

    /// Stops the running capture and keeps the clip in the draft.
    pub async fn stop_recording(&mut self) -> Result<(), ClientError> {
        match self.recorder.stop().await {
            Ok(Some(clip)) => {
                self.draft.audio = Some(clip);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(self.record_error(err)),
        }
    }

    /// Sends the draft as one user message. The user's bubble is appended
    /// before the request goes out; the reply, or a fixed error text, after.
    pub async fn send(&mut self) -> SendOutcome {
        let Some(message) = build_user_message(
            &self.draft.text,
            self.draft.image.as_ref(),
            self.draft.audio.as_ref(),
        ) else {
            return SendOutcome::Skipped;
        };

        self.error = None;
        let draft = std::mem::take(&mut self.draft);
        let echo = optimistic_text(&draft.text, draft.image.is_some(), draft.audio.is_some());
        let preview = draft.audio.map(|clip| clip.preview);
        self.messages
            .push(DisplayMessage::now(Role::User, echo, preview));

        let request = self.request_for(message);
        self.loading = true;
        let result = self.transport.send(&request).await;
        self.loading = false;

        match result {
            Ok(response) => {
                let reply = extract_reply(&response);
                info!(chars = reply.chars().count(), "assistant replied");
                self.messages
                    .push(DisplayMessage::now(Role::Assistant, reply, None));
                SendOutcome::Replied
            }
            Err(err) => {
                warn!(%err, "chat request failed");
                self.error = Some(err.to_string());
                self.messages.push(DisplayMessage::now(
                    Role::Assistant,
                    SEND_FAILED_TEXT.to_string(),
                    None,
                ));
                SendOutcome::Failed
            }
        }
    }

    /// Only the newest user turn goes out; the relay keeps no history.
    fn request_for(&self, message: Message) -> ChatRequest {
        let mut request = ChatRequest::new(vec![message]);
        request.model = Some(self.config.model.clone());
        request.max_chars = Some(self.config.max_chars);
        request.referer = self.config.referer.clone();
        request.title = self.config.title.clone();
        request
    }

    /// Closing the dialog forgets everything and releases the microphone.
    pub async fn close(&mut self) {
        self.recorder.cancel().await;
        self.messages.clear();
        self.draft = Draft::default();
        self.error = None;
    }

    fn record_error(&mut self, err: ClientError) -> ClientError {
        self.error = Some(err.to_string());
        err
    }
}
