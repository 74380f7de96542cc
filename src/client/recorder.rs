use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::error::ClientError;
use super::wav::{encode_wav, PcmBuffer};

/// Capture formats to ask for, best first.
pub const PREFERRED_MIME_TYPES: &[&str] = &[
    "audio/mp4",
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
];

const FALLBACK_MIME: &str = "audio/webm";
const WAV_MIME: &str = "audio/wav";
const DEFAULT_L16_RATE: u32 = 16000;
const MAX_L16_CHANNELS: usize = 8;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio capture is not supported here")]
    Unsupported,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("capture device failed: {0}")]
    Device(String),
}

impl From<CaptureError> for ClientError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Unsupported => ClientError::RecordingUnsupported,
            CaptureError::PermissionDenied => ClientError::MicrophoneDenied,
            CaptureError::Device(msg) => ClientError::Microphone(msg),
        }
    }
}

/// A microphone-like input producing one encoded clip per session.
#[async_trait]
pub trait CaptureDevice: Send {
    fn is_supported(&self) -> bool {
        true
    }

    fn supports_mime(&self, mime: &str) -> bool;

    /// Acquires the input. `preferred` is a hint; the device reports what it
    /// actually records through `mime_type`.
    async fn open(&mut self, preferred: Option<&str>) -> Result<(), CaptureError>;

    fn mime_type(&self) -> String;

    /// Stops capturing, flushes buffered audio and releases the input.
    async fn finish(&mut self) -> Result<Vec<u8>, CaptureError>;
}

/// Local playback capabilities used to build previews.
pub trait AudioBackend: Send + Sync {
    fn can_play(&self, mime: &str) -> bool;
    fn decode(&self, encoded: &[u8], mime: &str) -> anyhow::Result<PcmBuffer>;
}

/// Playable rendition of a clip for local preview.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

/// A finished recording. `data_base64` and `mime` are the captured encoding,
/// which is what goes upstream; `preview` may be a transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub data_base64: String,
    pub mime: String,
    pub preview: Preview,
}

enum RecorderState {
    Idle,
    Recording(Box<dyn CaptureDevice>),
}

pub struct Recorder {
    backend: Arc<dyn AudioBackend>,
    state: RecorderState,
}

impl Recorder {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            state: RecorderState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// Starts a capture session. Does nothing while one is running.
    pub async fn start(&mut self, mut device: Box<dyn CaptureDevice>) -> Result<(), ClientError> {
        if self.is_recording() {
            debug!("recording already in progress");
            return Ok(());
        }
        if !device.is_supported() {
            return Err(ClientError::RecordingUnsupported);
        }

        let preferred = PREFERRED_MIME_TYPES
            .iter()
            .copied()
            .find(|mime| device.supports_mime(mime));
        device.open(preferred).await?;

        info!(mime = %device.mime_type(), "recording started");
        self.state = RecorderState::Recording(device);
        Ok(())
    }

    /// Ends the session and returns the clip, or `None` when idle.
    pub async fn stop(&mut self) -> Result<Option<AudioClip>, ClientError> {
        let RecorderState::Recording(mut device) =
            std::mem::replace(&mut self.state, RecorderState::Idle)
        else {
            return Ok(None);
        };

        let mime = Some(device.mime_type())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let bytes = device.finish().await?;
        info!(%mime, bytes = bytes.len(), "recording stopped");

        let preview = self.preview(&bytes, &mime);
        Ok(Some(AudioClip {
            data_base64: BASE64.encode(&bytes),
            mime,
            preview,
        }))
    }

    /// Ends the session and throws the audio away. The device is still
    /// finished so the input is released.
    pub async fn cancel(&mut self) {
        let RecorderState::Recording(mut device) =
            std::mem::replace(&mut self.state, RecorderState::Idle)
        else {
            return;
        };
        match device.finish().await {
            Ok(bytes) => debug!(bytes = bytes.len(), "recording discarded"),
            Err(err) => warn!(%err, "capture device failed while cancelling"),
        }
    }

    fn preview(&self, bytes: &[u8], mime: &str) -> Preview {
        let original = || Preview {
            mime: mime.to_string(),
            bytes: Arc::from(bytes),
        };
        if self.backend.can_play(mime) {
            return original();
        }
        let transcoded = self
            .backend
            .decode(bytes, mime)
            .and_then(|pcm| Ok(encode_wav(&pcm)?));
        match transcoded {
            Ok(wav) => Preview {
                mime: WAV_MIME.to_string(),
                bytes: wav.into(),
            },
            Err(err) => {
                warn!(%err, %mime, "transcoding to WAV failed; previewing original");
                original()
            }
        }
    }
}

fn base_type(mime: &str) -> &str {
    mime.split(';').next().unwrap_or("").trim()
}

fn mime_param<'a>(mime: &'a str, key: &str) -> Option<&'a str> {
    mime.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
    })
}

/// Treats a pre-recorded file as the capture source, for terminals and
/// tests where no live microphone is available.
pub struct FileCapture {
    path: PathBuf,
    mime: String,
    opened: bool,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime = audio_mime_for(&path).to_string();
        Self {
            path,
            mime,
            opened: false,
        }
    }
}

fn audio_mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => WAV_MIME,
        Some("mp4") | Some("m4a") => "audio/mp4",
        Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("pcm") | Some("l16") | Some("raw") => "audio/L16;rate=16000;channels=1",
        _ => FALLBACK_MIME,
    }
}

fn capture_error(err: io::Error) -> CaptureError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::Device(err.to_string()),
    }
}

#[async_trait]
impl CaptureDevice for FileCapture {
    fn supports_mime(&self, mime: &str) -> bool {
        base_type(mime).eq_ignore_ascii_case(base_type(&self.mime))
    }

    async fn open(&mut self, _preferred: Option<&str>) -> Result<(), CaptureError> {
        let meta = tokio::fs::metadata(&self.path).await.map_err(capture_error)?;
        if !meta.is_file() {
            return Err(CaptureError::Device(format!(
                "{} is not a file",
                self.path.display()
            )));
        }
        self.opened = true;
        Ok(())
    }

    fn mime_type(&self) -> String {
        self.mime.clone()
    }

    async fn finish(&mut self) -> Result<Vec<u8>, CaptureError> {
        if !self.opened {
            return Err(CaptureError::Device("capture was never opened".into()));
        }
        self.opened = false;
        tokio::fs::read(&self.path).await.map_err(capture_error)
    }
}

/// Plays WAV directly and decodes raw linear PCM (`audio/L16`) so it can be
/// wrapped in a WAV container.
#[derive(Debug, Default, Clone)]
pub struct PcmBackend;

impl AudioBackend for PcmBackend {
    fn can_play(&self, mime: &str) -> bool {
        matches!(
            base_type(mime).to_ascii_lowercase().as_str(),
            "audio/wav" | "audio/x-wav" | "audio/wave"
        )
    }

    fn decode(&self, encoded: &[u8], mime: &str) -> anyhow::Result<PcmBuffer> {
        if !base_type(mime).eq_ignore_ascii_case("audio/l16") {
            bail!("no decoder for {mime}");
        }
        let sample_rate = match mime_param(mime, "rate") {
            Some(raw) => raw.parse()?,
            None => DEFAULT_L16_RATE,
        };
        let channel_count: usize = match mime_param(mime, "channels") {
            Some(raw) => raw.parse()?,
            None => 1,
        };
        if channel_count == 0 || channel_count > MAX_L16_CHANNELS {
            bail!("audio/L16 with {channel_count} channels is not supported");
        }

        let frames = encoded.len() / (2 * channel_count);
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        let mut cursor = Cursor::new(encoded);
        for _ in 0..frames {
            for channel in channels.iter_mut() {
                let sample = cursor.read_i16::<BigEndian>()?;
                channel.push(sample as f32 / 32768.0);
            }
        }

        Ok(PcmBuffer {
            sample_rate,
            channels,
        })
    }
}
