
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info};

use super::{Chunk, ChunkMetadata, EmbeddingRecord, vector_id};
use crate::config::{Config, StorageMode};
use crate::embeddings::EmbeddingProvider;
use crate::{DocchatError, Result};

const TABLE_NAME: &str = "chunks";

/// Vector index over document chunks, backed by LanceDB. The embedding
/// provider is injected at construction so ingestion and query embedding go
/// through the same backend.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

/// A chunk returned from similarity search, with its relevance scores.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Similarity score where higher is better (`1.0 - distance`).
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    #[inline]
    pub async fn new(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let uri = config
            .vector_db_uri()
            .map_err(|e| DocchatError::Config(e.to_string()))?;
        debug!("Connecting to LanceDB at {}", uri);

        if config.storage.mode == StorageMode::Embedded {
            let base_dir = config
                .base_dir()
                .map_err(|e| DocchatError::Config(e.to_string()))?;
            std::fs::create_dir_all(&base_dir).map_err(|e| {
                DocchatError::Database(format!("Failed to create data directory: {e}"))
            })?;
        }

        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to connect to LanceDB: {e}")))?;

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension: embedder.dimension(),
            embedder,
        };

        store.initialize_table().await?;

        info!("Vector store initialized ({} dimensions)", store.dimension);
        Ok(store)
    }

    /// Create the chunks table if missing. An existing table with a different
    /// vector dimension is dropped and recreated, since its contents cannot
    /// be searched with the configured embedding backend.
    async fn initialize_table(&mut self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&self.table_name) {
            let existing = self.detect_existing_dimension().await?;
            if existing == self.dimension {
                debug!("Chunks table already exists with matching dimension");
                return Ok(());
            }

            info!(
                "Vector dimension changed from {} to {}, recreating table",
                existing, self.dimension
            );
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| DocchatError::Database(format!("Failed to drop table: {e}")))?;
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to create table: {e}")))?;

        debug!("Chunks table created with {} dimensions", self.dimension);
        Ok(())
    }

    async fn detect_existing_dimension(&self) -> Result<usize> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to get table schema: {e}")))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(DocchatError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("owner_id", DataType::Utf8, false),
            Field::new("filename", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("chunk_idx", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Embed and store a batch of chunks. Returns the number of stored rows.
    #[inline]
    pub async fn insert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            debug!("No chunks to store");
            return Ok(0);
        }

        debug!("Embedding and storing {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;

        let created_at = Utc::now().to_rfc3339();
        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if vector.len() != self.dimension {
                return Err(DocchatError::Embedding(format!(
                    "Expected {}-dimensional vector, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
            records.push(EmbeddingRecord {
                id: vector_id(&chunk.metadata.document_id, chunk.metadata.chunk_idx),
                vector,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                created_at: created_at.clone(),
            });
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to insert chunks: {e}")))?;

        info!("Stored {} chunk embeddings", records.len());
        Ok(records.len())
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut vectors = Vec::with_capacity(len);
        let mut document_ids = Vec::with_capacity(len);
        let mut owner_ids = Vec::with_capacity(len);
        let mut filenames = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            vectors.push(record.vector.clone());
            document_ids.push(record.metadata.document_id.as_str());
            owner_ids.push(record.metadata.owner_id.as_str());
            filenames.push(record.metadata.filename.as_str());
            contents.push(record.text.as_str());
            chunk_indices.push(record.metadata.chunk_idx);
            created_ats.push(record.created_at.as_str());
        }

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for vector in &vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, self.dimension as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    DocchatError::Database(format!("Failed to create vector array: {e}"))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(document_ids)),
            Arc::new(StringArray::from(owner_ids)),
            Arc::new(StringArray::from(filenames)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| DocchatError::Database(format!("Failed to create record batch: {e}")))
    }

    /// Embed the query text and return the `limit` most similar chunks,
    /// optionally restricted to a single document.
    #[inline]
    pub async fn search(
        &self,
        query_text: &str,
        limit: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        debug!("Searching for similar chunks with limit: {}", limit);

        let query_vector = self.embedder.embed(query_text)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let mut query = table
            .vector_search(query_vector.as_slice())
            .map_err(|e| DocchatError::Database(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .limit(limit);

        if let Some(document_id) = document_filter {
            query = query.only_if(format!("document_id = '{}'", escape_literal(document_id)));
        }

        let results = query
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to execute search: {e}")))?;

        self.parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredChunk>> {
        let mut scored = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to read result stream: {e}")))?
        {
            scored.extend(parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results", scored.len());
        Ok(scored)
    }

    /// Delete specific chunk embeddings by vector ID. Deleting IDs that do
    /// not exist is not an error.
    #[inline]
    pub async fn delete_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!("Deleting {} chunk embeddings", ids.len());

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("'{}'", escape_literal(id)))
            .collect();
        let predicate = format!("id IN ({})", quoted.join(", "));

        table
            .delete(&predicate)
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to delete embeddings: {e}")))?;

        Ok(())
    }

    /// Delete all chunk embeddings belonging to a document.
    #[inline]
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        debug!("Deleting embeddings for document: {}", document_id);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let predicate = format!("document_id = '{}'", escape_literal(document_id));
        table.delete(&predicate).await.map_err(|e| {
            DocchatError::Database(format!("Failed to delete document embeddings: {e}"))
        })?;

        info!("Deleted embeddings for document: {}", document_id);
        Ok(())
    }

    /// Total number of chunk embeddings stored.
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to open table: {e}")))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| DocchatError::Database(format!("Failed to count rows: {e}")))?;

        Ok(count as u64)
    }
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
    let num_rows = batch.num_rows();
    let mut scored = Vec::with_capacity(num_rows);

    let document_ids = string_column(batch, "document_id")?;
    let owner_ids = string_column(batch, "owner_id")?;
    let filenames = string_column(batch, "filename")?;
    let contents = string_column(batch, "content")?;

    let chunk_indices = batch
        .column_by_name("chunk_idx")
        .ok_or_else(|| DocchatError::Database("Missing chunk_idx column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| DocchatError::Database("Invalid chunk_idx column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let metadata = ChunkMetadata {
            document_id: document_ids.value(row).to_string(),
            owner_id: owner_ids.value(row).to_string(),
            filename: filenames.value(row).to_string(),
            chunk_idx: chunk_indices.value(row),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        scored.push(ScoredChunk {
            chunk: Chunk {
                text: contents.value(row).to_string(),
                metadata,
            },
            similarity_score: 1.0 - distance,
            distance,
        });
    }

    Ok(scored)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DocchatError::Database(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DocchatError::Database(format!("Invalid {name} column type")))
}

/// Escape a string for use inside a single-quoted SQL literal.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
