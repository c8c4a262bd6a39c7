use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding dimension mismatch: corpus has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Provider quota exceeded ({provider}): {message}")]
    ProviderQuotaExceeded { provider: String, message: String },

    #[error("Answer synthesis interrupted after {} characters: {message}", .partial.len())]
    SynthesisInterrupted { partial: String, message: String },

    #[error("No relevant pages found in document {document_id}")]
    EmptyResult { document_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// Whether the error came from an external model service
    #[inline]
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. }
                | Self::ProviderQuotaExceeded { .. }
                | Self::SynthesisInterrupted { .. }
        )
    }

    /// Text already streamed before an interrupted synthesis failed
    #[inline]
    pub fn partial_answer(&self) -> Option<&str> {
        match self {
            Self::SynthesisInterrupted { partial, .. } => Some(partial.as_str()),
            _ => None,
        }
    }

    /// Message suitable for showing to the person who asked the question
    #[inline]
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable { .. } | Self::ProviderQuotaExceeded { .. } => {
                "Could not complete this request.".to_string()
            }
            Self::SynthesisInterrupted { .. } => {
                "The answer was cut off before it was complete.".to_string()
            }
            Self::EmptyResult { .. } => "No relevant information found.".to_string(),
            other => other.to_string(),
        }
    }
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod synthesis;
