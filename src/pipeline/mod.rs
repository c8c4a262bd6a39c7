//! Question answering over one or more report documents.
//!
//! Per document the stages run in sequence: embed the question, rank the
//! document's pages, stream an answer from the ranked text. Separate
//! documents share nothing mutable, so [`ReportSearch::search_documents`]
//! runs them side by side on blocking worker threads.


use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, RetrievalConfig};
use crate::corpus::Document;
use crate::embeddings::{EmbeddingClient, EmbeddingProvider};
use crate::retrieval::{RankedPage, Ranker, render_indices};
use crate::synthesis::{AnswerStream, ChatClient, CompletionProvider, Synthesizer, join_page_text};
use crate::{Result, SearchError};

/// Ranked pages of one document for one question
#[derive(Debug, Clone)]
pub struct Retrieval<'d> {
    pub document: &'d Document,
    pub ranked: Vec<RankedPage<'d>>,
    /// PDF render indices of `ranked`, best match first
    pub render_pages: Vec<i64>,
}

impl Retrieval<'_> {
    /// False when every ranked page scored 0, i.e. nothing substantive matched
    #[inline]
    pub fn has_relevant_pages(&self) -> bool {
        self.ranked.iter().any(|hit| hit.score > 0.0)
    }

    /// Ranked page text joined for the synthesizer
    #[inline]
    pub fn text(&self) -> String {
        join_page_text(&self.ranked)
    }
}

/// Completed answer for one document
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub render_pages: Vec<i64>,
    pub relevant: bool,
}

/// Outcome for one selected document; failures stay per document
#[derive(Debug)]
pub struct DocumentAnswer {
    pub document_id: String,
    pub outcome: Result<Answer>,
}

pub struct ReportSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    synthesizer: Synthesizer,
    ranker: Ranker,
    top_k: usize,
    max_documents: usize,
}

impl ReportSearch {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            synthesizer: Synthesizer::new(completer),
            ranker: Ranker::from_config(retrieval),
            top_k: retrieval.top_k,
            max_documents: retrieval.max_documents,
        }
    }

    /// Build with HTTP clients for the configured providers
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        let embedder = EmbeddingClient::from_config(config)?;
        let completer = ChatClient::from_config(config)?;
        info!(
            "Using embedding model {} and completion model {}",
            embedder.model(),
            completer.model()
        );

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(completer),
            &config.retrieval,
        ))
    }

    /// Override the number of pages answered from, within the configured bounds
    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self> {
        let mut retrieval = RetrievalConfig::default();
        retrieval
            .set_top_k(top_k)
            .map_err(|e| SearchError::Config(e.to_string()))?;
        self.top_k = retrieval.top_k;
        Ok(self)
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed the question and rank the document's pages against it.
    ///
    /// Returns [`SearchError::EmptyResult`] when the document has no pages.
    #[inline]
    pub fn retrieve<'d>(&self, question: &str, document: &'d Document) -> Result<Retrieval<'d>> {
        let question = validate_question(question)?;

        if !document.is_indexed() {
            warn!("Document {} has no indexed pages", document.id());
            return Err(SearchError::EmptyResult {
                document_id: document.id().to_string(),
            });
        }

        let query = self.embedder.embed(question)?;
        if let Some(expected) = document.dimension() {
            if query.len() != expected {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let ranked = self.ranker.rank(&query, document.pages(), self.top_k);
        if ranked.is_empty() {
            return Err(SearchError::EmptyResult {
                document_id: document.id().to_string(),
            });
        }

        let render_pages = render_indices(&ranked, document.start_page());
        debug!(
            "Document {}: render pages {:?}",
            document.id(),
            render_pages
        );

        Ok(Retrieval {
            document,
            ranked,
            render_pages,
        })
    }

    /// Start streaming an answer from retrieved pages
    #[inline]
    pub fn answer(&self, question: &str, retrieval: &Retrieval<'_>) -> Result<AnswerStream> {
        let question = validate_question(question)?;
        self.synthesizer.synthesize(question, &retrieval.text())
    }

    /// Retrieve and answer for one document, draining the stream
    #[inline]
    pub fn answer_document(&self, question: &str, document: &Document) -> Result<Answer> {
        let retrieval = self.retrieve(question, document)?;
        let text = self.answer(question, &retrieval)?.collect_answer()?;

        Ok(Answer {
            text,
            relevant: retrieval.has_relevant_pages(),
            render_pages: retrieval.render_pages,
        })
    }

    /// Answer the question for every selected document concurrently.
    ///
    /// Results come back in selection order regardless of completion order.
    #[inline]
    pub async fn search_documents(
        self: Arc<Self>,
        question: &str,
        documents: Vec<Arc<Document>>,
    ) -> Result<Vec<DocumentAnswer>> {
        let question = validate_question(question)?.to_string();
        self.check_selection(documents.len())?;

        info!(
            "Searching {} documents for: {}",
            documents.len(),
            question
        );

        let tasks = documents.into_iter().map(|document| {
            let search = Arc::clone(&self);
            let question = question.clone();
            let document_id = document.id().to_string();
            let handle = tokio::task::spawn_blocking(move || {
                search.answer_document(&question, &document)
            });
            async move {
                let outcome = handle.await.unwrap_or_else(|e| {
                    Err(SearchError::Other(anyhow::anyhow!(
                        "Search task for document failed: {e}"
                    )))
                });
                DocumentAnswer {
                    document_id,
                    outcome,
                }
            }
        });

        Ok(join_all(tasks).await)
    }

    /// Reject empty selections and selections above the configured maximum
    #[inline]
    pub fn check_selection(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(SearchError::InvalidQuery(
                "Select at least one document".to_string(),
            ));
        }
        if count > self.max_documents {
            return Err(SearchError::InvalidQuery(format!(
                "You can only select a maximum of {} documents ({count} selected)",
                self.max_documents
            )));
        }
        Ok(())
    }
}

/// Trimmed question, or an error when there is nothing to embed
#[inline]
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(
            "Question cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
