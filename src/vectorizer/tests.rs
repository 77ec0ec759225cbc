use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::config::Config;
use crate::embeddings::EmbeddingProvider;

struct StubEmbedder;

impl StubEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[(byte as usize + i) % 8] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        Ok(Self::vector_for(text))
    }

    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        8
    }
}

async fn create_test_vectorizer() -> (Vectorizer, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: Some(temp_dir.path().to_path_buf()),
        ..Config::default()
    };
    let store = VectorStore::new(&config, Arc::new(StubEmbedder))
        .await
        .expect("should create vector store");
    (Vectorizer::new(store, SplitterConfig::default()), temp_dir)
}

fn meta(document_id: i64) -> DocumentMeta {
    DocumentMeta {
        document_id,
        owner_id: 1,
        filename: format!("doc{document_id}.txt"),
    }
}

#[tokio::test]
async fn processes_text_document_into_chunks() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path = temp_dir.path().join("doc1.txt");
    std::fs::write(&path, "a brief document about nothing in particular").unwrap();

    let stored = vectorizer
        .process_and_store(&path, &meta(1))
        .await
        .expect("should process document");

    assert_eq!(stored, 1);
    assert_eq!(vectorizer.chunk_count().await.unwrap(), 1);
}

#[tokio::test]
async fn chunk_positions_start_at_one_and_are_gapless() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let paragraphs: Vec<String> = (0..8)
        .map(|i| format!("paragraph {i} ").repeat(40))
        .collect();
    let path = temp_dir.path().join("doc2.txt");
    std::fs::write(&path, paragraphs.join("\n\n")).unwrap();

    let stored = vectorizer
        .process_and_store(&path, &meta(2))
        .await
        .expect("should process document");
    assert!(stored > 1);

    let results = vectorizer
        .search_similar("paragraph", Some(2), 100)
        .await
        .expect("should search");

    let mut positions: Vec<u32> = results
        .iter()
        .map(|r| r.chunk.metadata.chunk_idx)
        .collect();
    positions.sort_unstable();
    let expected: Vec<u32> = (1..=stored as u32).collect();
    assert_eq!(positions, expected);
}

#[tokio::test]
async fn unsupported_format_passes_through() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path = temp_dir.path().join("image.png");
    std::fs::write(&path, b"not really a png").unwrap();

    let err = vectorizer
        .process_and_store(&path, &meta(3))
        .await
        .expect_err("png is unsupported");
    assert!(
        matches!(err, DocchatError::UnsupportedFormat(ref ext) if ext == "png"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn missing_file_is_an_ingestion_error() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path = temp_dir.path().join("missing.txt");
    let err = vectorizer
        .process_and_store(&path, &meta(4))
        .await
        .expect_err("missing file should fail");
    assert!(matches!(err, DocchatError::Ingestion(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_document_is_an_ingestion_error() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path = temp_dir.path().join("empty.txt");
    std::fs::write(&path, "   \n\n ").unwrap();

    let err = vectorizer
        .process_and_store(&path, &meta(5))
        .await
        .expect_err("empty document should fail");
    assert!(matches!(err, DocchatError::Ingestion(_)), "got {err:?}");
}

#[tokio::test]
async fn search_is_scoped_per_document() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path_a = temp_dir.path().join("a.txt");
    std::fs::write(&path_a, "the alpha document discusses kestrels").unwrap();
    let path_b = temp_dir.path().join("b.txt");
    std::fs::write(&path_b, "the beta document discusses kestrels").unwrap();

    vectorizer
        .process_and_store(&path_a, &meta(10))
        .await
        .expect("should process a");
    vectorizer
        .process_and_store(&path_b, &meta(11))
        .await
        .expect("should process b");

    let scoped = vectorizer
        .search_similar("discusses kestrels", Some(11), DEFAULT_SEARCH_LIMIT)
        .await
        .expect("should search");
    assert!(!scoped.is_empty());
    assert!(scoped.iter().all(|r| r.chunk.metadata.document_id == "11"));

    let global = vectorizer
        .search_similar("discusses kestrels", None, DEFAULT_SEARCH_LIMIT)
        .await
        .expect("should search");
    assert_eq!(global.len(), 2);
}

#[tokio::test]
async fn delete_document_vectors_clears_scope() {
    let (vectorizer, temp_dir) = create_test_vectorizer().await;

    let path = temp_dir.path().join("doomed.txt");
    std::fs::write(&path, "ephemeral content slated for deletion").unwrap();

    vectorizer
        .process_and_store(&path, &meta(20))
        .await
        .expect("should process");
    assert_eq!(vectorizer.chunk_count().await.unwrap(), 1);

    vectorizer
        .delete_document_vectors(20)
        .await
        .expect("should delete");
    vectorizer
        .delete_document_vectors(20)
        .await
        .expect("repeat delete is fine");

    assert_eq!(vectorizer.chunk_count().await.unwrap(), 0);
}
