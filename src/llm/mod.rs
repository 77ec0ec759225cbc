// Chat model backends and provider selection

#[cfg(test)]
mod tests;

pub mod gemini;
pub mod openai;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::{DocchatError, Result};

pub use gemini::GeminiChatModel;
pub use openai::OpenAiChatModel;

/// Sampling temperature used for all grounded answering.
pub const CHAT_TEMPERATURE: f32 = 0.3;

/// Supported chat backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl FromStr for Provider {
    type Err = DocchatError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "OPENAI" => Ok(Provider::OpenAi),
            "GEMINI" => Ok(Provider::Gemini),
            other => Err(DocchatError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Provider::OpenAi => write!(f, "OPENAI"),
            Provider::Gemini => write!(f, "GEMINI"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single turn in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A configured chat model that can run one completion over a message list.
pub trait ChatModel: std::fmt::Debug + Send + Sync {
    fn provider(&self) -> Provider;

    fn model_id(&self) -> &str;

    /// Run a single completion. Failures map onto
    /// [`DocchatError::Generation`] and are not retried.
    fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;
}

type ModelFactory = Box<dyn Fn(&Config, &str) -> Result<Arc<dyn ChatModel>> + Send + Sync>;

/// Registry mapping providers to model constructors. Selection happens per
/// request, so one process can serve answers from multiple backends.
pub struct ModelRegistry {
    config: Config,
    factories: HashMap<Provider, ModelFactory>,
}

impl ModelRegistry {
    #[inline]
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factories: HashMap::new(),
        }
    }

    #[inline]
    pub fn register(&mut self, provider: Provider, factory: ModelFactory) {
        self.factories.insert(provider, factory);
    }

    /// Registry with both built-in backends registered.
    #[inline]
    #[must_use]
    pub fn with_default_providers(config: Config) -> Self {
        let mut registry = Self::new(config);
        registry.register(
            Provider::OpenAi,
            Box::new(|config, model| {
                Ok(Arc::new(OpenAiChatModel::new(config, model)?) as Arc<dyn ChatModel>)
            }),
        );
        registry.register(
            Provider::Gemini,
            Box::new(|config, model| {
                Ok(Arc::new(GeminiChatModel::new(config, model)?) as Arc<dyn ChatModel>)
            }),
        );
        registry
    }

    /// Resolve a provider and model name into a ready-to-invoke chat model.
    /// Unknown providers and unknown model names both fail before any network
    /// traffic happens.
    #[inline]
    pub fn get_model(&self, provider: Provider, model: &str) -> Result<Arc<dyn ChatModel>> {
        let factory = self.factories.get(&provider).ok_or_else(|| {
            DocchatError::UnsupportedProvider(provider.to_string())
        })?;
        factory(&self.config, model)
    }
}
