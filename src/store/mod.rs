//! Хранилище пользовательских сессий.
//!
//! [`SessionStore`] это простой key-value бэкенд (память или PostgreSQL).
//! [`SessionRegistry`] ставит перед ним асинхронную блокировку на пользователя:
//! всё чтение и запись сессии идут через [`SessionGuard`], поэтому события и
//! напоминания одного пользователя обрабатываются по очереди, а разные
//! пользователи друг друга не ждут.

pub mod memory;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use teloxide::types::ChatId;
use tokio::sync::OwnedMutexGuard;

use crate::models::Session;

pub use memory::MemorySessionStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: ChatId) -> Result<Option<Session>, StoreError>;

    async fn put(&self, session: &Session) -> Result<(), StoreError>;

    async fn delete(&self, user_id: ChatId) -> Result<(), StoreError>;

    /// Все сохранённые сессии; нужны, чтобы перезапустить напоминания после рестарта.
    async fn load_all(&self) -> Result<Vec<Session>, StoreError>;
}

type UserLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    locks: Arc<Mutex<HashMap<ChatId, UserLock>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ждёт, пока с сессией пользователя никто больше не работает.
    pub async fn lock(&self, user_id: ChatId) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id).or_default().clone()
        };

        SessionGuard {
            user_id,
            store: self.store.clone(),
            _lock: lock.lock_owned().await,
        }
    }

    pub async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        self.store.load_all().await
    }

    /// Удаляет блокировки, которые никто не держит и не ждёт. Возвращает их число.
    pub fn evict_idle_locks(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

/// Монопольный доступ к сессии одного пользователя, пока жив guard.
pub struct SessionGuard {
    user_id: ChatId,
    store: Arc<dyn SessionStore>,
    _lock: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn user_id(&self) -> ChatId {
        self.user_id
    }

    /// Нечитаемая запись удаляется, дальше пользователь начинает с чистой сессии.
    pub async fn load(&self) -> Result<Option<Session>, StoreError> {
        match self.store.get(self.user_id).await {
            Err(StoreError::Serialization(e)) => {
                log::error!("Dropping unreadable session for user {}: {}", self.user_id, e);
                self.store.delete(self.user_id).await?;
                Ok(None)
            }
            other => other,
        }
    }

    pub async fn load_or_new(&self) -> Result<Session, StoreError> {
        Ok(self
            .load()
            .await?
            .unwrap_or_else(|| Session::new(self.user_id)))
    }

    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        debug_assert_eq!(session.user_id, self.user_id);
        self.store.put(session).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::models::Awaiting;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(MemorySessionStore::new()))
    }

    #[tokio::test]
    async fn guard_reads_back_what_it_saved() {
        let sessions = registry();
        let guard = sessions.lock(ChatId(1)).await;
        assert_eq!(guard.load().await.unwrap(), None);

        let mut session = guard.load_or_new().await.unwrap();
        session.awaiting = Awaiting::Amount;
        guard.save(&session).await.unwrap();

        assert_eq!(guard.load().await.unwrap(), Some(session));
    }

    /// Память, в которой часть записей не читается.
    #[derive(Default)]
    struct DamagedStore {
        inner: MemorySessionStore,
        damaged: Mutex<HashSet<ChatId>>,
    }

    #[async_trait]
    impl SessionStore for DamagedStore {
        async fn get(&self, user_id: ChatId) -> Result<Option<Session>, StoreError> {
            if self.damaged.lock().unwrap().contains(&user_id) {
                let broken = serde_json::from_str::<Session>("{\"user_id\": \"x\"}").unwrap_err();
                return Err(broken.into());
            }
            self.inner.get(user_id).await
        }

        async fn put(&self, session: &Session) -> Result<(), StoreError> {
            self.inner.put(session).await
        }

        async fn delete(&self, user_id: ChatId) -> Result<(), StoreError> {
            self.damaged.lock().unwrap().remove(&user_id);
            self.inner.delete(user_id).await
        }

        async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
            self.inner.load_all().await
        }
    }

    #[tokio::test]
    async fn unreadable_session_is_dropped() {
        let store = Arc::new(DamagedStore::default());
        store.inner.put(&Session::new(ChatId(1))).await.unwrap();
        store.damaged.lock().unwrap().insert(ChatId(1));
        let sessions = SessionRegistry::new(store.clone());

        let guard = sessions.lock(ChatId(1)).await;
        assert_eq!(guard.load().await.unwrap(), None);
        assert_eq!(store.inner.get(ChatId(1)).await.unwrap(), None);
        assert_eq!(guard.load_or_new().await.unwrap(), Session::new(ChatId(1)));
    }

    #[tokio::test]
    async fn database_errors_are_not_swallowed() {
        struct DownStore;

        #[async_trait]
        impl SessionStore for DownStore {
            async fn get(&self, _: ChatId) -> Result<Option<Session>, StoreError> {
                Err(sqlx::Error::PoolTimedOut.into())
            }
            async fn put(&self, _: &Session) -> Result<(), StoreError> {
                Err(sqlx::Error::PoolTimedOut.into())
            }
            async fn delete(&self, _: ChatId) -> Result<(), StoreError> {
                panic!("nothing to drop")
            }
            async fn load_all(&self) -> Result<Vec<Session>, StoreError> {
                Ok(Vec::new())
            }
        }

        let sessions = SessionRegistry::new(Arc::new(DownStore));
        let guard = sessions.lock(ChatId(1)).await;
        assert!(matches!(guard.load().await, Err(StoreError::Database(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn same_user_is_serialized() {
        let sessions = registry();
        let held = sessions.lock(ChatId(1)).await;

        let contender = {
            let sessions = sessions.clone();
            tokio::spawn(async move {
                let _guard = sessions.lock(ChatId(1)).await;
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn other_users_do_not_wait() {
        let sessions = registry();
        let _held = sessions.lock(ChatId(1)).await;

        let other = tokio::time::timeout(Duration::from_secs(1), sessions.lock(ChatId(2))).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_evicted() {
        let sessions = registry();
        let held = sessions.lock(ChatId(1)).await;
        drop(sessions.lock(ChatId(2)).await);

        assert_eq!(sessions.evict_idle_locks(), 1);
        drop(held);
        assert_eq!(sessions.evict_idle_locks(), 1);
        assert_eq!(sessions.evict_idle_locks(), 0);
    }
}
