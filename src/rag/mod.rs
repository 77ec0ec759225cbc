
use tracing::{debug, info};

use crate::llm::{ChatMessage, ModelRegistry, Provider};
use crate::vectorizer::Vectorizer;
use crate::{DocchatError, Result};

/// Number of chunks retrieved as grounding context for each answer.
pub const CONTEXT_CHUNK_LIMIT: usize = 10;

/// Maximum number of prior user turns replayed as follow-up context.
pub const HISTORY_LIMIT: u32 = 10;

/// The document a question is being asked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: i64,
    pub filename: String,
}

/// Answers questions about a single document, grounded in retrieved chunks.
pub struct RagEngine {
    vectorizer: Vectorizer,
    registry: ModelRegistry,
}

/// System prompt constraining the model to the retrieved context.
#[inline]
#[must_use]
pub fn build_system_prompt(context: &str, filename: &str) -> String {
    format!(
        "You are an assistant that answers questions about the document \"{filename}\".\n\
         Answer using only the context excerpts below. If the answer is not in the \
         context, say clearly that the document does not contain it. Be direct and \
         concise. Use the conversation history to resolve follow-up questions. Light \
         Markdown formatting is fine.\n\n\
         Context excerpts:\n{context}"
    )
}

/// Assemble the full message list for one completion: system prompt first,
/// prior user turns in order, then the current question.
fn build_messages(system_prompt: String, history: &[String], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    for past in history {
        messages.push(ChatMessage::user(past.clone()));
    }
    messages.push(ChatMessage::user(message.to_string()));
    messages
}

impl RagEngine {
    #[inline]
    #[must_use]
    pub fn new(vectorizer: Vectorizer, registry: ModelRegistry) -> Self {
        Self {
            vectorizer,
            registry,
        }
    }

    #[inline]
    #[must_use]
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Answer a question about one document. Retrieval is scoped to that
    /// document; the raw model output is returned without post-processing.
    #[inline]
    pub async fn answer(
        &self,
        message: &str,
        history: &[String],
        document: &DocumentRef,
        provider: Provider,
        model_name: &str,
    ) -> Result<String> {
        debug!(
            "Answering question about document {} via {} {}",
            document.id, provider, model_name
        );

        let chunks = self
            .vectorizer
            .search_similar(message, Some(document.id), CONTEXT_CHUNK_LIMIT)
            .await?;

        let context = chunks
            .iter()
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!("Retrieved {} context chunks", chunks.len());

        let system_prompt = build_system_prompt(&context, &document.filename);
        let messages = build_messages(system_prompt, history, message);

        let model = self.registry.get_model(provider, model_name)?;
        let answer = tokio::task::spawn_blocking(move || model.invoke(&messages))
            .await
            .map_err(|e| DocchatError::Generation(format!("Model invocation panicked: {e}")))??;

        info!(
            "Generated answer for document {} ({} chars)",
            document.id,
            answer.len()
        );
        Ok(answer)
    }
}
