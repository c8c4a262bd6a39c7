#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingProvider;
use crate::config::Config;
use crate::providers::ProviderEndpoint;
use crate::{Result, SearchError};

const PROVIDER_NAME: &str = "embedding";

/// Client for an OpenAI-compatible `/embeddings` endpoint (Mistral, OpenAI, Ollama)
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    endpoint: ProviderEndpoint,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = ProviderEndpoint::from_config(PROVIDER_NAME, &config.embedding)?;
        Ok(Self::new(endpoint))
    }

    #[inline]
    pub fn model(&self) -> &str {
        self.endpoint.model()
    }

    /// Generate the embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Generating embedding with {} for text (length: {})",
            self.endpoint.model(),
            text.len()
        );

        let request = EmbedRequest {
            model: self.endpoint.model(),
            input: text,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            SearchError::Other(anyhow::anyhow!(
                "Failed to serialize embedding request: {e}"
            ))
        })?;

        let mut response = self.endpoint.post_json("embeddings", &request_json)?;
        let response_text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.endpoint.classify(e))?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            self.endpoint
                .unavailable(format!("Failed to parse embedding response: {e}"))
        })?;

        let embedding = embed_response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| self.endpoint.unavailable("Embedding response contained no vector"))?;

        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(self
                .endpoint
                .unavailable("Embedding response contained non-finite values"));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl EmbeddingProvider for EmbeddingClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text)
    }
}
