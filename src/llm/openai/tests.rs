use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.openai.api_key = "test-key".to_string();
    config.openai.base_url = base_url.to_string();
    config
}

#[test]
fn rejects_unknown_model() {
    let config = test_config("https://api.openai.com");
    let err = OpenAiChatModel::new(&config, "gpt-3.5-turbo").expect_err("unknown model");
    assert!(
        matches!(err, DocchatError::UnsupportedProvider(_)),
        "got {err:?}"
    );
}

#[test]
fn requires_api_key() {
    let mut config = test_config("https://api.openai.com");
    config.openai.api_key = String::new();
    let err = OpenAiChatModel::new(&config, "gpt-4o").expect_err("missing key");
    assert!(matches!(err, DocchatError::Config(_)), "got {err:?}");
}

#[test]
fn request_maps_roles_and_temperature() {
    let config = test_config("https://api.openai.com");
    let model = OpenAiChatModel::new(&config, "gpt-4o").expect("should create model");

    let messages = vec![
        ChatMessage::system("answer from context"),
        ChatMessage::user("what is this?"),
        ChatMessage::assistant("a document"),
    ];
    let request = model.build_request(&messages);

    assert_eq!(request.model, "gpt-4o");
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    let roles: Vec<&str> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec!["system", "user", "assistant"]);
    assert_eq!(request.messages[1].content, "what is this?");
}

#[test]
fn parses_first_choice() {
    let body = json!({
        "choices": [
            {"message": {"role": "assistant", "content": "grounded answer"}},
            {"message": {"role": "assistant", "content": "ignored"}},
        ]
    })
    .to_string();

    assert_eq!(parse_response(&body).expect("should parse"), "grounded answer");
}

#[test]
fn empty_choices_is_a_generation_error() {
    let err = parse_response("{\"choices\": []}").expect_err("no choices");
    assert!(matches!(err, DocchatError::Generation(_)), "got {err:?}");

    let err = parse_response("not json").expect_err("invalid json");
    assert!(matches!(err, DocchatError::Generation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn invoke_posts_chat_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.3,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "the answer"}}]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let model = OpenAiChatModel::new(&config, "gpt-4o-mini").expect("should create model");

    let answer = tokio::task::spawn_blocking(move || {
        model.invoke(&[ChatMessage::user("question")])
    })
    .await
    .expect("task panicked")
    .expect("invoke should succeed");

    assert_eq!(answer, "the answer");
}

#[tokio::test(flavor = "multi_thread")]
async fn invoke_does_not_retry_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let model = OpenAiChatModel::new(&config, "gpt-4o").expect("should create model");

    let err = tokio::task::spawn_blocking(move || model.invoke(&[ChatMessage::user("q")]))
        .await
        .expect("task panicked")
        .expect_err("500 should fail");

    assert!(matches!(err, DocchatError::Generation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn base_url_path_prefix_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gateway/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "proxied"}}]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/gateway", mock_server.uri()));
    let model = OpenAiChatModel::new(&config, "gpt-4o").expect("should create model");

    let answer = tokio::task::spawn_blocking(move || model.invoke(&[ChatMessage::user("q")]))
        .await
        .expect("task panicked")
        .expect("invoke should succeed");

    assert_eq!(answer, "proxied");
}
