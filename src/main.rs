use anyhow::Result;
use clap::{Parser, Subcommand};
use report_search::commands::{AnswerFailures, ask, list_documents, show_ranking};
use report_search::config::{run_interactive_config, show_config};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "report-search")]
#[command(about = "Ask questions about sustainability reports using embedding search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and completion providers
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// List the documents of a corpus file
    List {
        /// Path to the corpus JSON file
        corpus: PathBuf,
    },
    /// Show the pages that best match a question, without generating an answer
    Rank {
        /// Path to the corpus JSON file
        corpus: PathBuf,
        /// Document ID to search
        #[arg(long, short)]
        document: String,
        /// Number of pages to return, 1 to 50 (defaults to the configured top_k)
        #[arg(long)]
        top_k: Option<usize>,
        /// The question to rank pages against
        question: String,
    },
    /// Answer a question from one or more documents
    Ask {
        /// Path to the corpus JSON file
        corpus: PathBuf,
        /// Document ID to search; repeat to compare several reports
        #[arg(long = "document", short, required = true)]
        documents: Vec<String>,
        /// Number of pages to answer from, 1 to 50 (defaults to the configured top_k)
        #[arg(long)]
        top_k: Option<usize>,
        /// The question to answer
        question: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Per-document failures have already been printed
            if e.downcast_ref::<AnswerFailures>().is_none() {
                eprintln!("Error: {e:?}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::List { corpus } => {
            list_documents(&corpus)?;
        }
        Commands::Rank {
            corpus,
            document,
            top_k,
            question,
        } => {
            show_ranking(&corpus, &document, &question, top_k)?;
        }
        Commands::Ask {
            corpus,
            documents,
            top_k,
            question,
        } => {
            ask(&corpus, &documents, &question, top_k).await?;
        }
    }

    Ok(())
}
