//! Per-user chat history.
//!
//! Append-only log of human/assistant exchanges, read back oldest-first
//! when building the prompt context.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub human: String,
    pub assistant: String,
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                human TEXT NOT NULL,
                assistant TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_user ON chat_messages(user_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn append(
        &self,
        user_id: &str,
        human: &str,
        assistant: &str,
    ) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO chat_messages (user_id, human, assistant, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(human)
        .bind(assistant)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        tracing::info!("saved chat exchange for user {user_id}");
        Ok(())
    }

    /// Read up to `limit` exchanges for a user, oldest first.
    pub async fn read(&self, user_id: &str, limit: i64) -> Result<Vec<ChatExchange>, ApiError> {
        let rows = sqlx::query(
            "SELECT human, assistant FROM chat_messages
             WHERE user_id = ?1 ORDER BY id ASC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| ChatExchange {
                human: row.get("human"),
                assistant: row.get("assistant"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> HistoryStore {
        let path = std::env::temp_dir().join(format!("scriba-history-{}.db", uuid::Uuid::new_v4()));
        HistoryStore::new(path).await.unwrap()
    }

    #[tokio::test]
    async fn reads_oldest_first_and_respects_limit() {
        let store = test_store().await;
        for i in 0..5 {
            store
                .append("u1", &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let all = store.read("u1", 20).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].human, "q0");
        assert_eq!(all[4].assistant, "a4");

        let limited = store.read("u1", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].human, "q0");
    }

    #[tokio::test]
    async fn users_do_not_see_each_other() {
        let store = test_store().await;
        store.append("u1", "mine", "yours").await.unwrap();

        let other = store.read("u2", 20).await.unwrap();
        assert!(other.is_empty());
    }
}
