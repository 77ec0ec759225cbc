#[cfg(test)]
mod tests;

use std::path::Path;

use tracing::{debug, info};

use crate::chunker::{SplitterConfig, split_segments};
use crate::database::lancedb::{Chunk, ChunkMetadata, ScoredChunk, VectorStore};
use crate::loader::load_document;
use crate::{DocchatError, Result};

/// Default number of chunks returned by a standalone similarity search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Identity of the document being processed, carried into chunk metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub document_id: i64,
    pub owner_id: i64,
    pub filename: String,
}

/// Runs the ingestion pipeline (load, split, embed, store) and fronts the
/// vector store for retrieval.
pub struct Vectorizer {
    store: VectorStore,
    splitter: SplitterConfig,
}

impl Vectorizer {
    #[inline]
    #[must_use]
    pub fn new(store: VectorStore, splitter: SplitterConfig) -> Self {
        Self { store, splitter }
    }

    /// Load a document from disk, split it, and store embedded chunks.
    /// Returns the number of chunks stored. Chunk positions start at 1.
    #[inline]
    pub async fn process_and_store(&self, path: &Path, meta: &DocumentMeta) -> Result<usize> {
        debug!("Processing document {} from {:?}", meta.document_id, path);

        let segments = load_document(path).map_err(wrap_ingestion)?;
        let texts = split_segments(&segments, &self.splitter);

        if texts.is_empty() {
            return Err(DocchatError::Ingestion(format!(
                "No text content could be extracted from {}",
                meta.filename
            )));
        }

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                text,
                metadata: ChunkMetadata {
                    document_id: meta.document_id.to_string(),
                    owner_id: meta.owner_id.to_string(),
                    filename: meta.filename.clone(),
                    chunk_idx: i as u32 + 1,
                },
            })
            .collect();

        let stored = self
            .store
            .insert(&chunks)
            .await
            .map_err(wrap_ingestion)?;

        info!(
            "Document {} vectorized into {} chunks",
            meta.document_id, stored
        );
        Ok(stored)
    }

    /// Similarity search over stored chunks, optionally scoped to one
    /// document.
    #[inline]
    pub async fn search_similar(
        &self,
        query: &str,
        document_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let filter = document_id.map(|id| id.to_string());
        self.store
            .search(query, limit, filter.as_deref())
            .await
            .map_err(|e| DocchatError::Retrieval(e.to_string()))
    }

    /// Remove every stored chunk belonging to a document.
    #[inline]
    pub async fn delete_document_vectors(&self, document_id: i64) -> Result<()> {
        self.store.delete_document(&document_id.to_string()).await
    }

    /// Total number of stored chunk embeddings.
    #[inline]
    pub async fn chunk_count(&self) -> Result<u64> {
        self.store.count().await
    }
}

/// Unsupported formats surface as themselves so callers can distinguish a
/// bad extension from a processing failure; everything else is an ingestion
/// failure.
fn wrap_ingestion(error: DocchatError) -> DocchatError {
    match error {
        DocchatError::UnsupportedFormat(_) | DocchatError::Ingestion(_) => error,
        other => DocchatError::Ingestion(other.to_string()),
    }
}
