// LanceDB vector index module
// Handles embedding storage and scoped similarity search for document chunks

pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{ScoredChunk, VectorStore};

/// A chunk of document text ready for embedding and storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The chunk text itself.
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each chunk embedding. The field set is fixed;
/// every row carries all of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// ID of the document row in the SQLite registry.
    pub document_id: String,
    /// ID of the user that owns the document.
    pub owner_id: String,
    /// Original filename of the source document.
    pub filename: String,
    /// 1-based position of this chunk within the document.
    pub chunk_idx: u32,
}

/// Embedding record as stored in the vector table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier, derived from the document ID and chunk position.
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Timestamp when this embedding was created (RFC 3339).
    pub created_at: String,
}

/// Stable vector ID for a chunk. Chunk positions start at 1, so re-ingesting
/// a document overwrites the same ID space.
#[inline]
#[must_use]
pub fn vector_id(document_id: &str, chunk_idx: u32) -> String {
    format!("doc_{document_id}_{chunk_idx}")
}
