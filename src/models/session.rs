use std::fmt;

use serde::{Serialize, Deserialize};
use teloxide::types::ChatId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Идентификатор запущенного напоминания.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Какой текст бот ждёт от пользователя следующим.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awaiting {
    #[default]
    Idle,
    Amount,
    PeopleCount,
    TotalSum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: ChatId,
    #[serde(default)]
    pub awaiting: Awaiting,
    /// 0, пока сценарий разделения его не запросил.
    #[serde(default)]
    pub people_count: u32,
    #[serde(default)]
    pub amount_per_person: u64,
    /// Оплаченные периоды; 0 значит подписки нет.
    #[serde(default)]
    pub period: u64,
    pub expire_at: Option<DateTime<Utc>>,
    pub pending_job_id: Option<JobId>,
}

impl Session {
    pub fn new(user_id: ChatId) -> Self {
        Self {
            user_id,
            awaiting: Awaiting::Idle,
            people_count: 0,
            amount_per_person: 0,
            period: 0,
            expire_at: None,
            pending_job_id: None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.period > 0
    }

    /// Переключает режим ввода и сбрасывает то, что собрал прошлый сценарий.
    pub fn begin(&mut self, awaiting: Awaiting) {
        self.awaiting = awaiting;
        self.people_count = 0;
    }

    pub fn subscribe(
        &mut self,
        amount_per_person: u64,
        period: u64,
        expire_at: DateTime<Utc>,
        job_id: JobId,
    ) {
        self.awaiting = Awaiting::Idle;
        self.amount_per_person = amount_per_person;
        self.period = period;
        self.expire_at = Some(expire_at);
        self.pending_job_id = Some(job_id);
    }

    /// Возвращает сессию к первому контакту. Отдаёт ожидавшее напоминание, если было.
    pub fn reset(&mut self) -> Option<JobId> {
        let pending = self.pending_job_id.take();
        *self = Session::new(self.user_id);
        pending
    }
}
