//! Streaming client for OpenAI-compatible `/chat/completions`.
//!
//! The response is consumed as server-sent events straight off the socket:
//! each `data:` line carries one JSON chunk, and `data: [DONE]` ends the
//! stream. Nothing is buffered beyond the current line, so a slow consumer
//! stalls the read instead of growing memory.


use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Lines, Read};
use tracing::{debug, warn};

use super::{CompletionProvider, TextDeltas};
use crate::config::Config;
use crate::providers::ProviderEndpoint;
use crate::{Result, SearchError};

const PROVIDER_NAME: &str = "completion";
const DONE_MARKER: &str = "[DONE]";
const QUOTA_ERROR_CODES: [&str; 3] = [
    "rate_limit_exceeded",
    "insufficient_quota",
    "rate_limit_error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
    /// Some providers send a string code, others a number
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl ChunkError {
    fn is_quota(&self) -> bool {
        let code = self.code.as_ref().and_then(serde_json::Value::as_str);
        [code, self.kind.as_deref()]
            .into_iter()
            .flatten()
            .any(|value| QUOTA_ERROR_CODES.contains(&value))
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: ProviderEndpoint,
}

impl ChatClient {
    #[inline]
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = ProviderEndpoint::from_config(PROVIDER_NAME, &config.completion)?;
        Ok(Self::new(endpoint))
    }

    #[inline]
    pub fn model(&self) -> &str {
        self.endpoint.model()
    }
}

impl CompletionProvider for ChatClient {
    #[inline]
    fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextDeltas> {
        debug!(
            "Requesting streamed completion from {} ({} messages)",
            self.endpoint.model(),
            messages.len()
        );

        let request = ChatRequest {
            model: self.endpoint.model(),
            messages,
            stream: true,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            SearchError::Other(anyhow::anyhow!("Failed to serialize chat request: {e}"))
        })?;

        let response = self.endpoint.post_json("chat/completions", &request_json)?;
        let reader = response.into_body().into_reader();

        Ok(Box::new(SseDeltas::new(
            self.endpoint.name().to_string(),
            reader,
        )))
    }
}

/// Pull-based iterator over the text deltas of an event stream
pub struct SseDeltas<R> {
    provider: String,
    lines: Lines<BufReader<R>>,
    finished: bool,
}

impl<R: Read> SseDeltas<R> {
    #[inline]
    pub fn new(provider: String, reader: R) -> Self {
        Self {
            provider,
            lines: BufReader::new(reader).lines(),
            finished: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<String>> {
        self.finished = true;
        warn!("{} stream failed: {}", self.provider, message);
        Some(Err(SearchError::ProviderUnavailable {
            provider: self.provider.clone(),
            message,
        }))
    }

    fn fail_quota(&mut self, message: String) -> Option<Result<String>> {
        self.finished = true;
        warn!("{} rate limit or quota exceeded mid-stream: {}", self.provider, message);
        Some(Err(SearchError::ProviderQuotaExceeded {
            provider: self.provider.clone(),
            message,
        }))
    }
}

impl<R: Read> Iterator for SseDeltas<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(format!("Stream read failed: {e}")),
                None => {
                    return self.fail("Stream ended before the completion signal".to_string());
                }
            };

            // Blank lines separate events; lines starting with ':' are comments
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == DONE_MARKER {
                debug!("{} stream completed", self.provider);
                self.finished = true;
                return None;
            }

            let chunk: ChatChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(format!("Malformed stream chunk: {e}")),
            };

            if let Some(error) = chunk.error {
                if error.is_quota() {
                    return self.fail_quota(error.message);
                }
                return self.fail(error.message);
            }

            let text: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();

            if !text.is_empty() {
                return Some(Ok(text));
            }
        }
    }
}
