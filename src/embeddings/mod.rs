//! Turns question text into vectors comparable with the stored page embeddings.

pub mod client;

pub use client::EmbeddingClient;

use crate::Result;

/// Anything that can embed free text into the corpus vector space.
///
/// Callers reject blank text before calling; implementations do not
/// validate input and make at most one outbound request per call.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
