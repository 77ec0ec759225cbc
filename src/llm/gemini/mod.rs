
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::llm::{CHAT_TEMPERATURE, ChatMessage, ChatModel, ChatRole, Provider};
use crate::{DocchatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Model names accepted for the Gemini backend.
pub const SUPPORTED_MODELS: [&str; 3] =
    ["gemini-1.5-pro", "gemini-1.5-flash", "gemini-2.0-flash"];

/// Chat client for the Gemini `generateContent` API.
#[derive(Debug)]
pub struct GeminiChatModel {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiChatModel {
    #[inline]
    pub fn new(config: &Config, model: &str) -> Result<Self> {
        if !SUPPORTED_MODELS.contains(&model) {
            return Err(DocchatError::UnsupportedProvider(format!(
                "GEMINI has no model '{model}' (expected one of {SUPPORTED_MODELS:?})"
            )));
        }

        if config.gemini.api_key.is_empty() {
            return Err(DocchatError::Config(
                "No API key configured for GEMINI".to_string(),
            ));
        }

        let base_url = Url::parse(&config.gemini.base_url)
            .map_err(|e| DocchatError::Config(format!("Invalid Gemini base URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.gemini.api_key.clone(),
            model: model.to_string(),
            agent,
        })
    }
}

/// System turns become `systemInstruction`; user and assistant turns map to
/// the `user` and `model` roles of the `contents` array.
fn build_request(messages: &[ChatMessage]) -> GenerateRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            ChatRole::System => system_parts.push(Part {
                text: message.content.clone(),
            }),
            ChatRole::User => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            }),
            ChatRole::Assistant => contents.push(Content {
                role: Some("model".to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            }),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(Content {
            role: None,
            parts: system_parts,
        })
    };

    GenerateRequest {
        system_instruction,
        contents,
        generation_config: GenerationConfig {
            temperature: CHAT_TEMPERATURE,
        },
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
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| DocchatError::Generation(format!("Failed to parse response: {e}")))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| DocchatError::Generation("Response contained no candidates".to_string()))
}

impl ChatModel for GeminiChatModel {
    #[inline]
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = endpoint_url(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )?;

        debug!(
            "Invoking GEMINI model {} with {} messages",
            self.model,
            messages.len()
        );

        let request = build_request(messages);
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocchatError::Generation(format!("Failed to serialize request: {e}")))?;

        let body = self
            .agent
            .post(url.as_str())
            .query("key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| DocchatError::Generation(format!("Chat request failed: {e}")))?;

        parse_response(&body)
    }
}
