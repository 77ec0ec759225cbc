#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::{DocchatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for the OpenAI embeddings API (`/v1/embeddings`).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    base_url: Url,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbeddings {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .embedding
            .resolved_api_key(&config.openai)
            .ok_or_else(|| {
                DocchatError::Config("No API key configured for embeddings".to_string())
            })?;

        let base_url = Url::parse(&config.embedding.base_url)
            .map_err(|e| DocchatError::Config(format!("Invalid embedding base URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            model: config.embedding.model.clone(),
            dimension: config.embedding.dimension,
            batch_size: config.embedding.batch_size,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = endpoint_url(&self.base_url, "v1/embeddings")?;

        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocchatError::Embedding(format!("Failed to serialize request: {e}")))?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Authorization", &format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| DocchatError::Embedding(format!("Failed to parse response: {e}")))?;

        if response.data.len() != texts.len() {
            return Err(DocchatError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API is allowed to return entries out of order.
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("Embedding request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 || *status == 429 {
                                warn!(
                                    "Retryable status {}, attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                return Err(DocchatError::Embedding(format!(
                                    "Embedding API returned HTTP {status}"
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(DocchatError::Embedding(format!(
                            "Embedding request failed: {error}"
                        )));
                    }

                    last_error = Some(error);

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(
                            EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000,
                        );
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        Err(DocchatError::Embedding(match last_error {
            Some(error) => format!(
                "Embedding request failed after {} attempts: {error}",
                self.retry_attempts
            ),
            None => "Embedding request failed".to_string(),
        }))
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

impl EmbeddingProvider for OpenAiEmbeddings {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_single_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| DocchatError::Embedding("Empty embedding response".to_string()))
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        Ok(vectors)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
