use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{
    Conversation, Document, Message, MessageRole, NewDocument,
};
use crate::database::sqlite::queries::{ConversationQueries, DocumentQueries, MessageQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// SQLite registry for documents, conversations, and chat history.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_base_dir(base_dir: &Path) -> Result<Self> {
        let db_path = base_dir.join("docchat.db");

        std::fs::create_dir_all(base_dir)
            .with_context(|| format!("Failed to create data directory: {}", base_dir.display()))?;

        Self::new(db_path).await
    }

    // Document operations
    #[inline]
    pub async fn create_document(&self, new_document: NewDocument) -> Result<Document> {
        DocumentQueries::create(&self.pool, new_document).await
    }

    #[inline]
    pub async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn get_owned_document(&self, id: i64, owner_id: i64) -> Result<Option<Document>> {
        DocumentQueries::get_owned(&self.pool, id, owner_id).await
    }

    #[inline]
    pub async fn list_documents(&self, owner_id: i64) -> Result<Vec<Document>> {
        DocumentQueries::list_by_owner(&self.pool, owner_id).await
    }

    #[inline]
    pub async fn claim_document_for_processing(&self, id: i64) -> Result<bool> {
        DocumentQueries::claim_for_processing(&self.pool, id).await
    }

    #[inline]
    pub async fn mark_document_completed(&self, id: i64) -> Result<()> {
        DocumentQueries::mark_completed(&self.pool, id).await
    }

    #[inline]
    pub async fn mark_document_failed(&self, id: i64, error_message: &str) -> Result<()> {
        DocumentQueries::mark_failed(&self.pool, id, error_message).await
    }

    #[inline]
    pub async fn reset_document_for_reindex(&self, id: i64) -> Result<bool> {
        DocumentQueries::reset_for_reindex(&self.pool, id).await
    }

    #[inline]
    pub async fn delete_document(&self, id: i64) -> Result<bool> {
        DocumentQueries::delete(&self.pool, id).await
    }

    // Conversation operations
    #[inline]
    pub async fn create_conversation(
        &self,
        title: &str,
        owner_id: i64,
        document_id: i64,
    ) -> Result<Conversation> {
        ConversationQueries::create(&self.pool, title, owner_id, document_id).await
    }

    #[inline]
    pub async fn get_owned_conversation(
        &self,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<Conversation>> {
        ConversationQueries::get_owned(&self.pool, id, owner_id).await
    }

    // Message operations
    #[inline]
    pub async fn add_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        MessageQueries::create(&self.pool, conversation_id, role, content).await
    }

    #[inline]
    pub async fn recent_user_messages(
        &self,
        conversation_id: i64,
        limit: u32,
    ) -> Result<Vec<String>> {
        MessageQueries::recent_user_messages(&self.pool, conversation_id, limit).await
    }
}
