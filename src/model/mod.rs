pub mod chat;
pub mod message;

pub use chat::ChatRequest;
pub use message::{ContentItem, ImageBase64, InputAudio, MediaUrl, Message, Role};
