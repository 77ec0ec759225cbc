
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{Conversation, Document, Message, MessageRole, NewDocument};

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_document: NewDocument) -> Result<Document> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO documents (filename, storage_path, status, file_size, owner_id, created_at) \
             VALUES (?, ?, 'pending', ?, ?, ?)",
        )
        .bind(&new_document.filename)
        .bind(&new_document.storage_path)
        .bind(new_document.file_size)
        .bind(new_document.owner_id)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create document")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created document"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get document by id")
    }

    /// Fetch a document only if it belongs to the given owner. A document
    /// owned by someone else is indistinguishable from a missing one.
    #[inline]
    pub async fn get_owned(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get owned document")
    }

    #[inline]
    pub async fn list_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list documents")
    }

    /// Atomically claim a pending document for processing. Returns `false`
    /// when the document is missing or already claimed, so two concurrent
    /// ingestions cannot both process the same document.
    #[inline]
    pub async fn claim_for_processing(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'processing', error_message = NULL \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to claim document for processing")?;

        let claimed = result.rows_affected() > 0;
        debug!("Claim for document {}: {}", id, claimed);
        Ok(claimed)
    }

    #[inline]
    pub async fn mark_completed(pool: &SqlitePool, id: i64) -> Result<()> {
        sqlx::query("UPDATE documents SET status = 'completed', error_message = NULL WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to mark document completed")?;
        Ok(())
    }

    #[inline]
    pub async fn mark_failed(pool: &SqlitePool, id: i64, error_message: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET status = 'failed', error_message = ? WHERE id = ?")
            .bind(error_message)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to mark document failed")?;
        Ok(())
    }

    /// Return a document to the pending state so it can be claimed again for
    /// reindexing. Accepts the processing state too: an ingestion that died
    /// mid-run must not leave the document stuck forever.
    #[inline]
    pub async fn reset_for_reindex(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'pending', error_message = NULL \
             WHERE id = ? AND status IN ('completed', 'failed', 'processing')",
        )
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to reset document for reindex")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ConversationQueries;

impl ConversationQueries {
    #[inline]
    pub async fn create(
        pool: &SqlitePool,
        title: &str,
        owner_id: i64,
        document_id: i64,
    ) -> Result<Conversation> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO conversations (title, owner_id, document_id, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(owner_id)
        .bind(document_id)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create conversation")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created conversation"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get conversation by id")
    }

    #[inline]
    pub async fn get_owned(
        pool: &SqlitePool,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get owned conversation")
    }
}

pub struct MessageQueries;

impl MessageQueries {
    #[inline]
    pub async fn create(
        pool: &SqlitePool,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create message")?
        .last_insert_rowid();

        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to retrieve created message")?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created message"))
    }

    #[inline]
    pub async fn list_for_conversation(
        pool: &SqlitePool,
        conversation_id: i64,
    ) -> Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
        .context("Failed to list messages")
    }

    /// The most recent user messages in a conversation, oldest first, for use
    /// as follow-up context when answering.
    #[inline]
    pub async fn recent_user_messages(
        pool: &SqlitePool,
        conversation_id: i64,
        limit: u32,
    ) -> Result<Vec<String>> {
        let mut contents = sqlx::query_scalar::<_, String>(
            "SELECT content FROM messages WHERE conversation_id = ? AND role = 'user' \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to fetch recent user messages")?;

        contents.reverse();
        Ok(contents)
    }
}
