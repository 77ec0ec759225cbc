use super::*;

fn config_with_keys() -> Config {
    let mut config = Config::default();
    config.openai.api_key = "openai-key".to_string();
    config.gemini.api_key = "gemini-key".to_string();
    config
}

#[test]
fn provider_parses_case_insensitively() {
    assert_eq!("OPENAI".parse::<Provider>().unwrap(), Provider::OpenAi);
    assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
    assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
}

#[test]
fn unknown_provider_is_rejected() {
    let err = "anthropic".parse::<Provider>().unwrap_err();
    match err {
        DocchatError::UnsupportedProvider(name) => assert_eq!(name, "ANTHROPIC"),
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
}

#[test]
fn provider_display_round_trips() {
    for provider in [Provider::OpenAi, Provider::Gemini] {
        let parsed: Provider = provider.to_string().parse().unwrap();
        assert_eq!(parsed, provider);
    }
}

#[test]
fn chat_message_helpers() {
    assert_eq!(ChatMessage::system("s").role, ChatRole::System);
    assert_eq!(ChatMessage::user("u").role, ChatRole::User);
    assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
    assert_eq!(ChatMessage::user("hello").content, "hello");
}

#[test]
fn registry_resolves_both_backends() {
    let registry = ModelRegistry::with_default_providers(config_with_keys());

    let openai = registry
        .get_model(Provider::OpenAi, "gpt-4o")
        .expect("should resolve OPENAI model");
    assert_eq!(openai.provider(), Provider::OpenAi);
    assert_eq!(openai.model_id(), "gpt-4o");

    let gemini = registry
        .get_model(Provider::Gemini, "gemini-1.5-flash")
        .expect("should resolve GEMINI model");
    assert_eq!(gemini.provider(), Provider::Gemini);
    assert_eq!(gemini.model_id(), "gemini-1.5-flash");
}

#[test]
fn registry_rejects_unknown_model_names() {
    let registry = ModelRegistry::with_default_providers(config_with_keys());

    let err = registry
        .get_model(Provider::OpenAi, "gpt-2")
        .expect_err("unknown model should fail");
    assert!(
        matches!(&err, DocchatError::UnsupportedProvider(msg) if msg.contains("gpt-2")),
        "got {err:?}"
    );

    let err = registry
        .get_model(Provider::Gemini, "gemini-0.1")
        .expect_err("unknown model should fail");
    assert!(
        matches!(&err, DocchatError::UnsupportedProvider(msg) if msg.contains("gemini-0.1")),
        "got {err:?}"
    );
}

#[test]
fn registry_requires_api_keys() {
    let registry = ModelRegistry::with_default_providers(Config::default());

    let err = registry
        .get_model(Provider::OpenAi, "gpt-4o")
        .expect_err("missing key should fail");
    assert!(matches!(err, DocchatError::Config(_)), "got {err:?}");
}

#[test]
fn registry_without_backend_rejects_provider() {
    let registry = ModelRegistry::new(config_with_keys());

    let err = registry
        .get_model(Provider::Gemini, "gemini-1.5-pro")
        .expect_err("unregistered provider should fail");
    assert!(matches!(err, DocchatError::UnsupportedProvider(_)), "got {err:?}");
}
