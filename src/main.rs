use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docchat::Result;
use docchat::commands::{
    ask, delete_document, ingest_document, list_documents, reindex_document, search_chunks,
};
use docchat::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Chat with your documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure API keys, storage, and chunking
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a document (pdf, docx, txt, or md)
    Ingest {
        /// Path to the document file
        file: PathBuf,
        /// Owner of the document
        #[arg(long, default_value_t = 1)]
        owner: i64,
    },
    /// Ask a question about an ingested document
    Ask {
        /// ID of the document to ask about
        document_id: i64,
        /// The question to ask
        message: String,
        /// Chat backend to use (OPENAI or GEMINI)
        #[arg(long, default_value = "OPENAI")]
        provider: String,
        /// Model name; defaults to the provider's standard model
        #[arg(long)]
        model: Option<String>,
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<i64>,
        /// Owner asking the question
        #[arg(long, default_value_t = 1)]
        owner: i64,
    },
    /// Search stored chunks by similarity
    Search {
        /// The search query
        query: String,
        /// Restrict the search to one document
        #[arg(long)]
        document: Option<i64>,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// List ingested documents
    List {
        /// Owner whose documents to list
        #[arg(long, default_value_t = 1)]
        owner: i64,
    },
    /// Delete a document and its index entries
    Delete {
        /// ID of the document to delete
        document_id: i64,
        /// Owner of the document
        #[arg(long, default_value_t = 1)]
        owner: i64,
    },
    /// Re-run ingestion for a document
    Reindex {
        /// ID of the document to reindex
        document_id: i64,
        /// Owner of the document
        #[arg(long, default_value_t = 1)]
        owner: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { file, owner } => {
            ingest_document(&file, owner).await?;
        }
        Commands::Ask {
            document_id,
            message,
            provider,
            model,
            conversation,
            owner,
        } => {
            ask(
                document_id,
                &message,
                &provider,
                model.as_deref(),
                conversation,
                owner,
            )
            .await?;
        }
        Commands::Search {
            query,
            document,
            limit,
        } => {
            search_chunks(&query, document, limit).await?;
        }
        Commands::List { owner } => {
            list_documents(owner).await?;
        }
        Commands::Delete { document_id, owner } => {
            delete_document(document_id, owner).await?;
        }
        Commands::Reindex { document_id, owner } => {
            reindex_document(document_id, owner).await?;
        }
    }

    Ok(())
}
