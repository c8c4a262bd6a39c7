use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::SearchError;
use crate::config::Config;
use crate::corpus::{Corpus, Document};
use crate::pipeline::{DocumentAnswer, ReportSearch, validate_question};

/// Some documents could not be answered. Each failure was already printed,
/// so callers only need to exit with a failure status.
#[derive(Debug, Error)]
#[error("{failed} of {total} documents could not be answered")]
pub struct AnswerFailures {
    pub failed: usize,
    pub total: usize,
}

/// Load a corpus and check it against the configured embedding dimension
#[inline]
pub fn load_corpus(path: &Path, config: &Config) -> Result<Corpus> {
    let corpus = Corpus::load(path)?;
    if let Some(dimension) = config.retrieval.embedding_dimension {
        corpus.check_dimension(dimension)?;
    }
    Ok(corpus)
}

/// List the documents of a corpus
#[inline]
pub fn list_documents(corpus_path: &Path) -> Result<()> {
    let config = Config::load()?;
    let corpus = load_corpus(corpus_path, &config)?;

    if corpus.documents().is_empty() {
        println!("The corpus contains no documents.");
        return Ok(());
    }

    println!(
        "Documents ({} total, {} pages):",
        corpus.documents().len(),
        corpus.page_count()
    );
    println!();

    for document in corpus.documents() {
        // Documents without embedded pages cannot be searched yet
        let marker = if document.is_indexed() { "" } else { "*" };
        println!("📄 {}{} (ID: {})", document.display_name(), marker, document.id());
        println!("   Pages: {}", document.pages().len());
        println!("   Starts on PDF page: {}", document.start_page());
        if let Some(link) = document.link() {
            println!("   Link: {}", link);
        }
        println!();
    }

    if corpus.documents().iter().any(|document| !document.is_indexed()) {
        println!("* not indexed yet; questions about these documents return no results");
    }

    Ok(())
}

/// Show the pages a question would be answered from, without calling the completion model
#[inline]
pub fn show_ranking(
    corpus_path: &Path,
    document_id: &str,
    question: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let config = Config::load()?;
    let corpus = load_corpus(corpus_path, &config)?;
    let document = corpus
        .document(document_id)
        .ok_or_else(|| SearchError::Corpus(format!("Unknown document: {document_id}")))?;

    let search = build_search(&config, top_k)?;
    let retrieval = search.retrieve(question, document)?;

    println!(
        "Top {} pages of {} for: {}",
        retrieval.ranked.len(),
        document.display_name(),
        validate_question(question)?
    );
    println!();

    for (hit, render_index) in retrieval.ranked.iter().zip(&retrieval.render_pages) {
        let preview: String = hit.content().trim().chars().take(80).collect();
        println!(
            "  page {:>4}  (PDF {:>4})  score {:.4}  {}",
            hit.page_number(),
            render_index,
            hit.score,
            style(preview).dim()
        );
    }

    if !retrieval.has_relevant_pages() {
        println!();
        println!(
            "{}",
            style("⚠ No page had enough text to score; results are not meaningful.").yellow()
        );
    }

    Ok(())
}

/// Answer a question from one or more documents
#[inline]
pub async fn ask(
    corpus_path: &Path,
    document_ids: &[String],
    question: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let config = Config::load()?;
    let corpus = load_corpus(corpus_path, &config)?;
    let search = Arc::new(build_search(&config, top_k)?);

    search.check_selection(document_ids.len())?;
    let documents: Vec<Arc<Document>> = corpus
        .select(document_ids)?
        .into_iter()
        .map(|document| Arc::new(document.clone()))
        .collect();

    if let [document] = documents.as_slice() {
        let search = Arc::clone(&search);
        let document = Arc::clone(document);
        let question = question.to_string();
        return tokio::task::spawn_blocking(move || stream_answer(&search, &document, &question))
            .await
            .context("Answer task failed")?;
    }

    let names: Vec<String> = documents
        .iter()
        .map(|document| document.display_name().to_string())
        .collect();

    let bar = spinner("Searching the selected reports");
    let answers = search.search_documents(question, documents).await?;
    bar.finish_and_clear();

    for (answer, name) in answers.iter().zip(&names) {
        print_document_answer(name, answer);
    }

    check_outcomes(&answers)
}

fn check_outcomes(answers: &[DocumentAnswer]) -> Result<()> {
    let failed = answers
        .iter()
        .filter(|answer| answer.outcome.is_err())
        .count();
    if failed > 0 {
        return Err(AnswerFailures {
            failed,
            total: answers.len(),
        }
        .into());
    }
    Ok(())
}

fn build_search(config: &Config, top_k: Option<usize>) -> Result<ReportSearch> {
    let search = ReportSearch::from_config(config)?;
    Ok(match top_k {
        Some(top_k) => search.with_top_k(top_k)?,
        None => search,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Stream one document's answer to stdout as fragments arrive
fn stream_answer(search: &ReportSearch, document: &Document, question: &str) -> Result<()> {
    let bar = spinner("Finding the relevant pages");
    let retrieval = match search.retrieve(question, document) {
        Ok(retrieval) => retrieval,
        Err(e) => {
            bar.finish_and_clear();
            report_failure(document.display_name(), &e, false);
            return Err(AnswerFailures { failed: 1, total: 1 }.into());
        }
    };
    bar.finish_and_clear();

    if !retrieval.has_relevant_pages() {
        eprintln!(
            "{}",
            style("⚠ No substantive pages matched; the answer may be empty.").yellow()
        );
    }

    println!("{}", style(format!("Answer from {}:", document.display_name())).bold());

    let mut stdout = io::stdout().lock();
    let stream = match search.answer(question, &retrieval) {
        Ok(stream) => stream,
        Err(e) => {
            drop(stdout);
            report_failure(document.display_name(), &e, false);
            return Err(AnswerFailures { failed: 1, total: 1 }.into());
        }
    };

    for fragment in stream {
        match fragment {
            Ok(text) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Err(e) => {
                writeln!(stdout)?;
                drop(stdout);
                report_failure(document.display_name(), &e, false);
                return Err(AnswerFailures { failed: 1, total: 1 }.into());
            }
        }
    }
    writeln!(stdout)?;
    writeln!(stdout)?;
    writeln!(stdout, "Relevant PDF pages: {}", format_pages(&retrieval.render_pages))?;

    info!("Answered question from document {}", document.id());
    Ok(())
}

fn print_document_answer(name: &str, answer: &DocumentAnswer) {
    println!("{}", style(format!("── {name} ──")).bold());
    match &answer.outcome {
        Ok(result) => {
            if !result.relevant {
                println!(
                    "{}",
                    style("⚠ No substantive pages matched; the answer may be empty.").yellow()
                );
            }
            println!("{}", result.text);
            println!();
            println!("Relevant PDF pages: {}", format_pages(&result.render_pages));
        }
        Err(e) => report_failure(name, e, true),
    }
    println!();
}

/// Print a user-facing message. Partial answers are shown rather than
/// discarded unless they were already streamed to the terminal.
fn report_failure(name: &str, error: &SearchError, show_partial: bool) {
    error!("Question failed for {}: {}", name, error);

    if let Some(partial) = error.partial_answer().filter(|_| show_partial) {
        println!("{}", partial);
        println!();
    }
    eprintln!(
        "{} {}",
        style(format!("{name}:")).red(),
        error.user_message()
    );
}

fn format_pages(pages: &[i64]) -> String {
    pages.iter().join(", ")
}
