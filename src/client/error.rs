use thiserror::Error;

/// Failures the chat client surfaces to the user. `Display` is the text shown
/// in the widget's error slot.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Ukuran file terlalu besar. Maksimum 2 MB.")]
    FileTooLarge { size: u64 },

    #[error("Perekaman suara tidak didukung. Pastikan perangkat memiliki mikrofon yang dapat diakses.")]
    RecordingUnsupported,

    #[error("Izin mikrofon ditolak. Silakan izinkan akses mikrofon di pengaturan perangkat.")]
    MicrophoneDenied,

    #[error("Gagal mengakses mikrofon. Periksa izin dan coba lagi.")]
    Microphone(String),

    #[error("Worker error {status}: {body}")]
    Relay { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
