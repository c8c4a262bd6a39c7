#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ChatMessage, CompletionProvider, TextDeltas};
use crate::retrieval::RankedPage;
use crate::{Result, SearchError};

pub const SYSTEM_PROMPT: &str =
    "You are an expert in gathering information from sustainability reports.";

const GROUNDING_INSTRUCTION: &str = "Be concise and provide the most relevant information from the texts only. \
     Do not use the internet or general knowledge.";

/// Join ranked page contents in ranked order, newlines and tabs flattened to spaces
#[inline]
pub fn join_page_text(ranked: &[RankedPage<'_>]) -> String {
    let joined = ranked.iter().map(RankedPage::content).join("\n");
    normalize_whitespace(&joined)
}

fn normalize_whitespace(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

/// Prompt restricting the model to the supplied report text
#[inline]
pub fn build_messages(question: &str, ranked_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Answer diligently on this question {question} from the following texts of the report:"
        )),
        ChatMessage::user(normalize_whitespace(ranked_text)),
        ChatMessage::user(GROUNDING_INSTRUCTION),
    ]
}

/// Turns ranked page text into a streamed, text-grounded answer
#[derive(Clone)]
pub struct Synthesizer {
    provider: Arc<dyn CompletionProvider>,
}

impl Synthesizer {
    #[inline]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Start one answer. Each call issues a fresh request; streams cannot be resumed.
    ///
    /// Provider failures before the first fragment are returned here as
    /// `ProviderUnavailable` or `ProviderQuotaExceeded`.
    #[inline]
    pub fn synthesize(&self, question: &str, ranked_text: &str) -> Result<AnswerStream> {
        debug!(
            "Synthesizing answer from {} characters of report text",
            ranked_text.len()
        );
        let messages = build_messages(question, ranked_text);
        let deltas = self.provider.stream_chat(&messages)?;
        Ok(AnswerStream::new(deltas))
    }
}

/// Lazy, ordered answer fragments.
///
/// `next()` blocks until the provider sends the next fragment. Once the
/// provider fails after some text was emitted, the failure is reported as
/// [`SearchError::SynthesisInterrupted`] carrying everything emitted so far;
/// a failure before any text keeps its provider error. The stream is fused
/// after its first error or after completion.
pub struct AnswerStream {
    deltas: TextDeltas,
    emitted: String,
    finished: bool,
}

impl AnswerStream {
    #[inline]
    pub fn new(deltas: TextDeltas) -> Self {
        Self {
            deltas,
            emitted: String::new(),
            finished: false,
        }
    }

    /// Text emitted so far
    #[inline]
    pub fn partial(&self) -> &str {
        &self.emitted
    }

    /// Drain the stream into the full answer
    #[inline]
    pub fn collect_answer(mut self) -> Result<String> {
        for fragment in self.by_ref() {
            fragment?;
        }
        Ok(self.emitted)
    }
}

impl Iterator for AnswerStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.deltas.next() {
            Some(Ok(fragment)) => {
                self.emitted.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(error)) => {
                self.finished = true;
                if self.emitted.is_empty() {
                    warn!("Answer stream failed before any output: {}", error);
                    Some(Err(error))
                } else {
                    warn!(
                        "Answer stream interrupted after {} characters: {}",
                        self.emitted.len(),
                        error
                    );
                    Some(Err(SearchError::SynthesisInterrupted {
                        partial: self.emitted.clone(),
                        message: error.to_string(),
                    }))
                }
            }
            None => {
                self.finished = true;
                info!("Answer complete ({} characters)", self.emitted.len());
                None
            }
        }
    }
}
