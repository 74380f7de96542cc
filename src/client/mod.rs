pub mod compose;
pub mod error;
pub mod extract;
pub mod recorder;
pub mod session;
pub mod transport;
pub mod wav;

pub use compose::{build_user_message, ImageAttachment};
pub use error::ClientError;
pub use extract::extract_reply;
pub use recorder::{AudioBackend, AudioClip, CaptureDevice, FileCapture, PcmBackend, Recorder};
pub use session::{ChatSession, DisplayMessage, SendOutcome};
pub use transport::{ChatTransport, RelayClient};
