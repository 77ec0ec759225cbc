#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::llm::{CHAT_TEMPERATURE, ChatMessage, ChatModel, ChatRole, Provider};
use crate::{DocchatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Model names accepted for the OpenAI backend.
pub const SUPPORTED_MODELS: [&str; 2] = ["gpt-4o", "gpt-4o-mini"];

/// Chat client for the OpenAI completions API (`/v1/chat/completions`).
#[derive(Debug)]
pub struct OpenAiChatModel {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<RequestMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiChatModel {
    #[inline]
    pub fn new(config: &Config, model: &str) -> Result<Self> {
        if !SUPPORTED_MODELS.contains(&model) {
            return Err(DocchatError::UnsupportedProvider(format!(
                "OPENAI has no model '{model}' (expected one of {SUPPORTED_MODELS:?})"
            )));
        }

        if config.openai.api_key.is_empty() {
            return Err(DocchatError::Config(
                "No API key configured for OPENAI".to_string(),
            ));
        }

        let base_url = Url::parse(&config.openai.base_url)
            .map_err(|e| DocchatError::Config(format!("Invalid OpenAI base URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.openai.api_key.clone(),
            model: model.to_string(),
            agent,
        })
    }

    fn build_request(&self, messages: &[ChatMessage]) -> ChatRequest {
        let messages = messages
            .iter()
            .map(|m| RequestMessage {
                role: match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: m.content.clone(),
            })
            .collect();

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: CHAT_TEMPERATURE,
        }
    }
}

/// Join an API path onto the configured base URL, keeping any path prefix
/// the base carries (gateway and reverse-proxy setups).
fn endpoint_url(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let padded = format!("{}/", base.path());
        base.set_path(&padded);
    }
    base.join(path)
        .map_err(|e| DocchatError::Config(format!("Failed to build request URL: {e}")))
}

fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| DocchatError::Generation(format!("Failed to parse response: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| DocchatError::Generation("Response contained no choices".to_string()))
}

impl ChatModel for OpenAiChatModel {
    #[inline]
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = endpoint_url(&self.base_url, "v1/chat/completions")?;

        debug!(
            "Invoking OPENAI model {} with {} messages",
            self.model,
            messages.len()
        );

        let request = self.build_request(messages);
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocchatError::Generation(format!("Failed to serialize request: {e}")))?;

        let body = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| DocchatError::Generation(format!("Chat request failed: {e}")))?;

        parse_response(&body)
    }
}
