use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use teloxide::types::ChatId;

use crate::models::Session;
use crate::store::{SessionStore, StoreError};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                chat_id BIGINT PRIMARY KEY,
                session JSONB NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_pending \
             ON subscriptions ((session->>'pending_job_id')) \
             WHERE session->>'pending_job_id' IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Сессии хранятся одним JSONB-документом на пользователя.
#[derive(Clone, Debug)]
pub struct PgSessionStore {
    db: Database,
}

impl PgSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, user_id: ChatId) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT session FROM subscriptions WHERE chat_id = $1")
            .bind(user_id.0)
            .fetch_optional(&self.db.pool)
            .await?;

        match row {
            Some(row) => {
                let session: serde_json::Value = row.get("session");
                Ok(Some(serde_json::from_value(session)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        let document = serde_json::to_value(session)?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (chat_id, session, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (chat_id)
            DO UPDATE SET
                session = EXCLUDED.session,
                updated_at = NOW()
            "#,
        )
        .bind(session.user_id.0)
        .bind(document)
        .execute(&self.db.pool)
        .await?;

        log::debug!("💾 Session saved for user {}", session.user_id);
        Ok(())
    }

    async fn delete(&self, user_id: ChatId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subscriptions WHERE chat_id = $1")
            .bind(user_id.0)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT chat_id, session FROM subscriptions")
            .fetch_all(&self.db.pool)
            .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let chat_id: i64 = row.get("chat_id");
            let document: serde_json::Value = row.get("session");
            match serde_json::from_value::<Session>(document) {
                Ok(session) => sessions.push(session),
                Err(e) => log::error!("Skipping unreadable session for user {}: {}", chat_id, e),
            }
        }

        Ok(sessions)
    }
}
