pub mod openai;

pub use openai::OpenAiEmbeddings;

use crate::Result;

/// Text-to-vector backend used by the vector store for both ingestion and
/// query embedding. Implementations must be shareable across threads.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, returning vectors in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of the vectors this provider produces.
    fn dimension(&self) -> usize;
}
