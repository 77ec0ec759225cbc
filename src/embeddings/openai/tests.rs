use super::*;
use crate::config::Config;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.embedding.api_key = "test-key".to_string();
    config.embedding.base_url = base_url.to_string();
    config.embedding.dimension = 3;
    config.embedding.batch_size = 2;
    config
}

#[test]
fn client_configuration() {
    let mut config = test_config("https://api.openai.com");
    config.embedding.model = "custom-embedding-model".to_string();

    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "custom-embedding-model");
    assert_eq!(client.dimension, 3);
    assert_eq!(client.batch_size, 2);
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = test_config("https://api.openai.com");
    let client = OpenAiEmbeddings::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn missing_api_key_is_a_config_error() {
    let mut config = test_config("https://api.openai.com");
    config.embedding.api_key = String::new();
    config.openai.api_key = String::new();

    let err = OpenAiEmbeddings::new(&config).expect_err("expected missing key error");
    assert!(matches!(err, crate::DocchatError::Config(_)), "got {err:?}");
}

#[test]
fn falls_back_to_openai_chat_key() {
    let mut config = test_config("https://api.openai.com");
    config.embedding.api_key = String::new();
    config.openai.api_key = "chat-key".to_string();

    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");
    assert_eq!(client.api_key, "chat-key");
}

#[test]
fn empty_batch_skips_the_network() {
    let config = test_config("http://127.0.0.1:9"); // nothing listens here
    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    let vectors = client.embed_batch(&[]).expect("empty batch should succeed");
    assert!(vectors.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_batch_and_restores_input_order() {
    let mock_server = MockServer::start().await;

    // Entries deliberately out of order; the client must sort by index.
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.4, 0.5, 0.6], "index": 1},
                {"embedding": [0.1, 0.2, 0.3], "index": 0},
            ]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    let texts = vec!["first".to_string(), "second".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task panicked")
        .expect("embed_batch should succeed");

    assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn splits_requests_by_batch_size() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [1.0, 0.0, 0.0], "index": 0},
                {"embedding": [0.0, 1.0, 0.0], "index": 1},
            ]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    // batch_size is 2, so 4 texts means exactly 2 requests.
    let config = test_config(&mock_server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    let texts: Vec<String> = (0..4).map(|i| format!("text {i}")).collect();
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task panicked")
        .expect("embed_batch should succeed");

    assert_eq!(vectors.len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    let err = tokio::task::spawn_blocking(move || client.embed("some text"))
        .await
        .expect("task panicked")
        .expect_err("401 should fail");

    assert!(err.to_string().contains("401"), "got {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.9, 0.8, 0.7], "index": 0}]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let client = OpenAiEmbeddings::new(&config).expect("Failed to create client");

    let vector = tokio::task::spawn_blocking(move || client.embed("retry me"))
        .await
        .expect("task panicked")
        .expect("embed should succeed after retry");

    assert_eq!(vector, vec![0.9, 0.8, 0.7]);
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let base = Url::parse("https://gateway.example/openai").expect("valid url");
    let url = endpoint_url(&base, "v1/embeddings").expect("should join");
    assert_eq!(url.as_str(), "https://gateway.example/openai/v1/embeddings");

    let base = Url::parse("https://api.openai.com").expect("valid url");
    let url = endpoint_url(&base, "v1/embeddings").expect("should join");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/embeddings");
}
