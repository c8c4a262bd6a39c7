//! Streams an answer grounded in the ranked page text.

pub mod answer;
pub mod chat;

pub use answer::{AnswerStream, Synthesizer, build_messages, join_page_text};
pub use chat::{ChatClient, ChatMessage, Role, SseDeltas};

use crate::Result;

/// Text fragments from a streaming completion, in order.
///
/// Ends with `None` once the provider signals completion. An `Err` item
/// means the stream broke and no further items follow.
pub type TextDeltas = Box<dyn Iterator<Item = Result<String>>>;

/// A chat model that answers incrementally.
///
/// Errors returned directly (rather than inside the stream) happened before
/// any output was produced.
pub trait CompletionProvider: Send + Sync {
    fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextDeltas>;
}
