use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{Conversation, DocumentStatus, MessageRole, NewDocument};
use crate::embeddings::OpenAiEmbeddings;
use crate::llm::{ModelRegistry, Provider};
use crate::rag::{DocumentRef, HISTORY_LIMIT, RagEngine};
use crate::vectorizer::{DocumentMeta, Vectorizer};
use crate::{DocchatError, Result};

/// Model used when `--model` is not given.
#[inline]
#[must_use]
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o",
        Provider::Gemini => "gemini-1.5-flash",
    }
}

/// A conversation only continues the document it was opened for; resuming it
/// against another document would replay unrelated history.
#[inline]
pub fn check_conversation_document(conversation: &Conversation, document_id: i64) -> Result<()> {
    if conversation.document_id != document_id {
        return Err(DocchatError::Retrieval(format!(
            "Conversation {} belongs to document {}, not document {}",
            conversation.id, conversation.document_id, document_id
        )));
    }
    Ok(())
}

async fn open_database(config: &Config) -> Result<Database> {
    let base_dir = config
        .base_dir()
        .map_err(|e| DocchatError::Config(e.to_string()))?;
    Ok(Database::initialize_from_base_dir(&base_dir).await?)
}

async fn build_vectorizer(config: &Config) -> Result<Vectorizer> {
    let embedder = Arc::new(OpenAiEmbeddings::new(config)?);
    let store = VectorStore::new(config, embedder).await?;
    Ok(Vectorizer::new(store, config.chunking))
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

/// Register a document and run the ingestion pipeline over it.
#[inline]
pub async fn ingest_document(path: &Path, owner_id: i64) -> Result<()> {
    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let database = open_database(&config).await?;

    let metadata = std::fs::metadata(path)
        .map_err(|e| DocchatError::Ingestion(format!("Cannot read {}: {e}", path.display())))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    let document = database
        .create_document(NewDocument {
            filename: filename.clone(),
            storage_path: path.display().to_string(),
            file_size: metadata.len() as i64,
            owner_id,
        })
        .await?;

    println!("Registered document: {} (ID: {})", filename, document.id);

    if !database.claim_document_for_processing(document.id).await? {
        println!("Document {} is already being processed.", document.id);
        return Ok(());
    }

    let vectorizer = build_vectorizer(&config).await?;
    let meta = DocumentMeta {
        document_id: document.id,
        owner_id,
        filename: filename.clone(),
    };

    let bar = spinner(&format!("Ingesting {filename}"));
    match vectorizer.process_and_store(path, &meta).await {
        Ok(chunk_count) => {
            database.mark_document_completed(document.id).await?;
            bar.finish_and_clear();
            println!("Ingested {filename} into {chunk_count} chunks.");
            info!("Document {} completed with {} chunks", document.id, chunk_count);
            Ok(())
        }
        Err(e) => {
            database
                .mark_document_failed(document.id, &e.to_string())
                .await?;
            bar.finish_and_clear();
            error!("Ingestion failed for document {}: {}", document.id, e);
            Err(e)
        }
    }
}

/// Ask a question about an ingested document, continuing a conversation if
/// one is given.
#[inline]
pub async fn ask(
    document_id: i64,
    message: &str,
    provider_name: &str,
    model: Option<&str>,
    conversation_id: Option<i64>,
    owner_id: i64,
) -> Result<()> {
    let provider: Provider = provider_name.parse()?;
    let model_name = model.unwrap_or_else(|| default_model(provider));

    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let database = open_database(&config).await?;

    let document = database
        .get_owned_document(document_id, owner_id)
        .await?
        .ok_or_else(|| DocchatError::Retrieval(format!("Document {document_id} not found")))?;

    if document.status != DocumentStatus::Completed {
        return Err(DocchatError::Retrieval(format!(
            "Document {} is not ready for questions (status: {})",
            document.id, document.status
        )));
    }

    let conversation = match conversation_id {
        Some(id) => {
            let conversation = database
                .get_owned_conversation(id, owner_id)
                .await?
                .ok_or_else(|| DocchatError::Retrieval(format!("Conversation {id} not found")))?;
            check_conversation_document(&conversation, document.id)?;
            conversation
        }
        None => {
            database
                .create_conversation(
                    &format!("Chat about {}", document.filename),
                    owner_id,
                    document.id,
                )
                .await?
        }
    };

    // History is captured before the current question is stored, so the
    // question appears exactly once in the prompt.
    let history = database
        .recent_user_messages(conversation.id, HISTORY_LIMIT)
        .await?;

    let vectorizer = build_vectorizer(&config).await?;
    let registry = ModelRegistry::with_default_providers(config);
    let engine = RagEngine::new(vectorizer, registry);

    let document_ref = DocumentRef {
        id: document.id,
        filename: document.filename.clone(),
    };

    let bar = spinner("Thinking");
    let result = engine
        .answer(message, &history, &document_ref, provider, model_name)
        .await;
    bar.finish_and_clear();
    let answer = result?;

    database
        .add_message(conversation.id, MessageRole::User, message)
        .await?;
    database
        .add_message(conversation.id, MessageRole::Assistant, &answer)
        .await?;

    println!("Conversation: {}", conversation.id);
    println!();
    println!("{answer}");

    Ok(())
}

/// Run a similarity search over stored chunks.
#[inline]
pub async fn search_chunks(query: &str, document_id: Option<i64>, limit: usize) -> Result<()> {
    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let vectorizer = build_vectorizer(&config).await?;

    let results = vectorizer.search_similar(query, document_id, limit).await?;

    if results.is_empty() {
        println!("No matching chunks found.");
        return Ok(());
    }

    println!("Found {} matching chunks:", results.len());
    println!();
    for result in &results {
        println!(
            "[{:.3}] {} (document {}, chunk {})",
            result.similarity_score,
            result.chunk.metadata.filename,
            result.chunk.metadata.document_id,
            result.chunk.metadata.chunk_idx
        );
        let preview: String = result.chunk.text.chars().take(160).collect();
        println!("   {}", preview.replace('\n', " "));
        println!();
    }

    Ok(())
}

/// List registered documents and their ingestion state.
#[inline]
pub async fn list_documents(owner_id: i64) -> Result<()> {
    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let database = open_database(&config).await?;

    let documents = database.list_documents(owner_id).await?;

    if documents.is_empty() {
        println!("No documents have been ingested yet.");
        println!("Use 'docchat ingest <file>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();
    for document in &documents {
        println!("{} (ID: {})", document.filename, document.id);
        println!("   Status: {}", document.status);
        println!("   Size: {} bytes", document.file_size);
        if let Some(error) = &document.error_message {
            println!("   Error: {error}");
        }
        println!("   Added: {}", document.created_at);
        println!();
    }

    Ok(())
}

/// Delete a document, its chunk embeddings, and its conversations.
#[inline]
pub async fn delete_document(document_id: i64, owner_id: i64) -> Result<()> {
    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let database = open_database(&config).await?;

    let document = database
        .get_owned_document(document_id, owner_id)
        .await?
        .ok_or_else(|| DocchatError::Retrieval(format!("Document {document_id} not found")))?;

    let vectorizer = build_vectorizer(&config).await?;
    vectorizer.delete_document_vectors(document.id).await?;
    database.delete_document(document.id).await?;

    println!("Deleted document: {} (ID: {})", document.filename, document.id);
    Ok(())
}

/// Re-run the ingestion pipeline over an already registered document.
#[inline]
pub async fn reindex_document(document_id: i64, owner_id: i64) -> Result<()> {
    let config = Config::load().map_err(|e| DocchatError::Config(e.to_string()))?;
    let database = open_database(&config).await?;

    let document = database
        .get_owned_document(document_id, owner_id)
        .await?
        .ok_or_else(|| DocchatError::Retrieval(format!("Document {document_id} not found")))?;

    if !database.reset_document_for_reindex(document.id).await? {
        return Err(DocchatError::Ingestion(format!(
            "Document {} cannot be reindexed right now (status: {})",
            document.id, document.status
        )));
    }
    if !database.claim_document_for_processing(document.id).await? {
        println!("Document {} is already being processed.", document.id);
        return Ok(());
    }

    let vectorizer = build_vectorizer(&config).await?;
    vectorizer.delete_document_vectors(document.id).await?;

    let meta = DocumentMeta {
        document_id: document.id,
        owner_id,
        filename: document.filename.clone(),
    };

    let bar = spinner(&format!("Reindexing {}", document.filename));
    match vectorizer
        .process_and_store(Path::new(&document.storage_path), &meta)
        .await
    {
        Ok(chunk_count) => {
            database.mark_document_completed(document.id).await?;
            bar.finish_and_clear();
            println!(
                "Reindexed {} into {chunk_count} chunks.",
                document.filename
            );
            Ok(())
        }
        Err(e) => {
            database
                .mark_document_failed(document.id, &e.to_string())
                .await?;
            bar.finish_and_clear();
            error!("Reindex failed for document {}: {}", document.id, e);
            Err(e)
        }
    }
}
