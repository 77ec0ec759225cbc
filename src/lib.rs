use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocchatError>;

#[derive(Error, Debug)]
pub enum DocchatError {
    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunker;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod llm;
pub mod loader;
pub mod rag;
pub mod vectorizer;
