//! Pre-embedded report pages.
//!
//! A [`Corpus`] is a read-only set of [`Document`]s, each holding the pages
//! that were extracted and embedded at ingestion time. Everything is
//! validated once, when the corpus is built, so ranking can rely on every
//! page of a document sharing one embedding dimension.
//!
//! Embeddings are assumed to come from the same model and model version as
//! the query embeddings. Vectors of equal length from different model
//! versions are not detected and produce meaningless scores.


use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{Result, SearchError};

/// One page of a source document. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    document_id: String,
    page_number: u32,
    content: String,
    embedding: Vec<f32>,
}

impl Page {
    #[inline]
    pub fn new(
        document_id: impl Into<String>,
        page_number: u32,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<Self> {
        let document_id = document_id.into();

        if page_number == 0 {
            return Err(SearchError::Corpus(format!(
                "Document {document_id}: page numbers start at 1"
            )));
        }

        if embedding.is_empty() {
            return Err(SearchError::Corpus(format!(
                "Document {document_id}, page {page_number}: embedding is empty"
            )));
        }

        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(SearchError::Corpus(format!(
                "Document {document_id}, page {page_number}: embedding contains non-finite values"
            )));
        }

        Ok(Self {
            document_id,
            page_number,
            content: content.into(),
            embedding,
        })
    }

    #[inline]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// 1-based page number in the document's own numbering
    #[inline]
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// A report together with its embedded pages
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    company: Option<String>,
    link: Option<String>,
    start_page: u32,
    pages: Vec<Page>,
}

impl Document {
    /// `start_page` is the PDF page on which the document's logical page 1 begins
    #[inline]
    pub fn new(id: impl Into<String>, start_page: u32, pages: Vec<Page>) -> Result<Self> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(SearchError::Corpus("Document id cannot be empty".to_string()));
        }

        if start_page == 0 {
            return Err(SearchError::Corpus(format!(
                "Document {id}: start page must be at least 1"
            )));
        }

        if let Some(page) = pages.iter().find(|page| page.document_id != id) {
            return Err(SearchError::Corpus(format!(
                "Document {id}: page {} belongs to document {}",
                page.page_number, page.document_id
            )));
        }

        if let Some(first) = pages.first() {
            let expected = first.embedding.len();
            if let Some(page) = pages.iter().find(|page| page.embedding.len() != expected) {
                return Err(SearchError::Corpus(format!(
                    "Document {id}: page {} has {} dimensions, expected {expected}",
                    page.page_number,
                    page.embedding.len()
                )));
            }
        }

        Ok(Self {
            id,
            company: None,
            link: None,
            start_page,
            pages,
        })
    }

    #[inline]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    #[inline]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    #[inline]
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    #[inline]
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    #[inline]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Documents listed in the archive but never split into embedded pages
    #[inline]
    pub fn is_indexed(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Embedding length shared by all pages, if there are any
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.pages.first().map(|page| page.embedding.len())
    }

    /// Name shown to users: the company when known, the id otherwise
    #[inline]
    pub fn display_name(&self) -> &str {
        self.company.as_deref().unwrap_or(&self.id)
    }
}

/// Read-only collection of documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    #[inline]
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let mut seen = HashSet::new();
        for document in &documents {
            if !seen.insert(document.id.as_str()) {
                return Err(SearchError::Corpus(format!(
                    "Duplicate document id: {}",
                    document.id
                )));
            }
        }

        Ok(Self { documents })
    }

    /// Parse a corpus from its JSON representation
    #[inline]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CorpusFile = serde_json::from_str(json)
            .map_err(|e| SearchError::Corpus(format!("Invalid corpus JSON: {e}")))?;

        let documents = file
            .documents
            .into_iter()
            .map(DocumentRecord::into_document)
            .collect::<Result<Vec<_>>>()?;

        Self::new(documents)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

        let corpus = Self::from_json_str(&content)?;
        info!(
            "Loaded corpus with {} documents ({} pages) from {}",
            corpus.documents.len(),
            corpus.page_count(),
            path.display()
        );
        Ok(corpus)
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[inline]
    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|document| document.id == id)
    }

    /// Look up documents in the given order, failing on the first unknown id
    #[inline]
    pub fn select(&self, ids: &[String]) -> Result<Vec<&Document>> {
        ids.iter()
            .map(|id| {
                self.document(id)
                    .ok_or_else(|| SearchError::Corpus(format!("Unknown document: {id}")))
            })
            .collect()
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.documents.iter().map(|document| document.pages.len()).sum()
    }

    /// Check every indexed document against the expected embedding length
    #[inline]
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        for document in &self.documents {
            match document.dimension() {
                Some(actual) if actual != expected => {
                    return Err(SearchError::Corpus(format!(
                        "Document {} has {actual}-dimensional embeddings, expected {expected}",
                        document.id
                    )));
                }
                _ => {}
            }
        }
        debug!("All documents use {}-dimensional embeddings", expected);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    documents: Vec<DocumentRecord>,
}

#[derive(Debug, Deserialize)]
struct DocumentRecord {
    id: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default = "default_start_page")]
    start_page: u32,
    #[serde(default)]
    pages: Vec<PageRecord>,
}

#[derive(Debug, Deserialize)]
struct PageRecord {
    #[serde(alias = "page")]
    page_number: u32,
    #[serde(default)]
    content: String,
    embedding: EmbeddingField,
}

/// Document stores often hand vectors back as text, e.g. `"[0.1, 0.2]"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingField {
    Values(Vec<f32>),
    Encoded(String),
}

const fn default_start_page() -> u32 {
    1
}

impl EmbeddingField {
    fn into_values(self) -> std::result::Result<Vec<f32>, serde_json::Error> {
        match self {
            Self::Values(values) => Ok(values),
            Self::Encoded(text) => serde_json::from_str(&text),
        }
    }
}

impl DocumentRecord {
    fn into_document(self) -> Result<Document> {
        let id = self.id;
        let pages = self
            .pages
            .into_iter()
            .map(|record| {
                let page_number = record.page_number;
                let embedding = record.embedding.into_values().map_err(|e| {
                    SearchError::Corpus(format!(
                        "Document {id}, page {page_number}: malformed embedding: {e}"
                    ))
                })?;
                Page::new(id.as_str(), page_number, record.content, embedding)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut document = Document::new(id, self.start_page, pages)?;
        document.company = self.company;
        document.link = self.link;
        Ok(document)
    }
}
