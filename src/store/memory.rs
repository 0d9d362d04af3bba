use std::collections::HashMap;

use async_trait::async_trait;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use super::{SessionStore, StoreError};
use crate::models::Session;

/// Бэкенд в памяти; после перезапуска сессии пропадают.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<ChatId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, user_id: ChatId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.user_id, session.clone());
        Ok(())
    }

    async fn delete(&self, user_id: ChatId) -> Result<(), StoreError> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }
}
