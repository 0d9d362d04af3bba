//! Одноразовые таймеры напоминаний, не больше одного живого таймера на пользователя.
//!
//! Сработавший таймер сам ничего не отправляет: он передаёт запись [`FiredJob`]
//! циклу доставки, а тот сверяет её с текущей сессией пользователя.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::clock::Clock;
use crate::models::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredJob {
    pub user_id: ChatId,
    pub job_id: JobId,
    pub fire_at: DateTime<Utc>,
}

struct ArmedJob {
    id: JobId,
    handle: AbortHandle,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    jobs: Arc<Mutex<HashMap<ChatId, ArmedJob>>>,
    fired: mpsc::UnboundedSender<FiredJob>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<FiredJob>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            fired,
            clock,
        };
        (scheduler, rx)
    }

    /// Запускает таймер для `user_id` с новым идентификатором.
    pub fn arm(&self, user_id: ChatId, fire_at: DateTime<Utc>) -> JobId {
        let id = JobId::new();
        self.arm_with_id(user_id, fire_at, id);
        id
    }

    /// Запускает таймер с заранее выбранным `id`, прерывая предыдущий таймер
    /// пользователя. Прошедший `fire_at` срабатывает сразу.
    pub fn arm_with_id(&self, user_id: ChatId, fire_at: DateTime<Utc>, id: JobId) {
        let delay = (fire_at - self.clock.now()).to_std().unwrap_or_default();

        // Держим блокировку во время spawn, иначе задача может не найти свою запись.
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);

        let task = {
            let jobs = self.jobs.clone();
            let fired = self.fired.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                {
                    let mut jobs = jobs.lock().unwrap_or_else(PoisonError::into_inner);
                    if jobs.get(&user_id).is_some_and(|job| job.id == id) {
                        jobs.remove(&user_id);
                    }
                }
                let job = FiredJob { user_id, job_id: id, fire_at };
                if fired.send(job).is_err() {
                    log::warn!("Reminder {} for user {} fired after delivery stopped", id, user_id);
                }
            })
        };

        let armed = ArmedJob { id, handle: task.abort_handle() };
        if let Some(previous) = jobs.insert(user_id, armed) {
            previous.handle.abort();
            log::debug!("⏹️ Reminder {} for user {} replaced by {}", previous.id, user_id, id);
        }

        log::info!("⏰ Reminder {} armed for user {} at {} (in {:?})", id, user_id, fire_at, delay);
    }

    /// Прерывает таймер пользователя, если это всё ещё `job_id`. Возвращает, было ли что отменять.
    pub fn cancel(&self, user_id: ChatId, job_id: JobId) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(&user_id) {
            Some(job) if job.id == job_id => {
                if let Some(job) = jobs.remove(&user_id) {
                    job.handle.abort();
                }
                log::info!("⏹️ Reminder {} for user {} cancelled", job_id, user_id);
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self, user_id: ChatId) -> Option<JobId> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&user_id).map(|job| job.id)
    }

    pub fn live_jobs(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::FixedClock;

    fn scheduler() -> (ReminderScheduler, mpsc::UnboundedReceiver<FiredJob>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock(Utc::now()));
        let (scheduler, rx) = ReminderScheduler::new(clock.clone());
        (scheduler, rx, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn job_fires_once_at_deadline() {
        let (scheduler, mut rx, clock) = scheduler();
        let fire_at = clock.now() + chrono::Duration::minutes(40);

        let id = scheduler.arm(ChatId(1), fire_at);
        assert_eq!(scheduler.pending(ChatId(1)), Some(id));

        tokio::time::sleep(Duration::from_secs(40 * 60 - 1)).await;
        assert!(rx.try_recv().is_err());

        let job = rx.recv().await.unwrap();
        assert_eq!(job, FiredJob { user_id: ChatId(1), job_id: id, fire_at });
        assert_eq!(scheduler.pending(ChatId(1)), None);
        assert_eq!(scheduler.live_jobs(), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_keeps_a_single_live_job() {
        let (scheduler, mut rx, clock) = scheduler();
        let first = scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(1));
        let second = scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(2));

        assert_ne!(first, second);
        assert_eq!(scheduler.live_jobs(), 1);
        assert_eq!(scheduler.pending(ChatId(1)), Some(second));

        let job = rx.recv().await.unwrap();
        assert_eq!(job.job_id, second);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn users_have_independent_jobs() {
        let (scheduler, mut rx, clock) = scheduler();
        scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(2));
        scheduler.arm(ChatId(2), clock.now() + chrono::Duration::minutes(1));
        assert_eq!(scheduler.live_jobs(), 2);

        assert_eq!(rx.recv().await.unwrap().user_id, ChatId(2));
        assert_eq!(rx.recv().await.unwrap().user_id, ChatId(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_only_matches_current_job() {
        let (scheduler, mut rx, clock) = scheduler();
        let first = scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(1));
        let second = scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(1));

        assert!(!scheduler.cancel(ChatId(1), first));
        assert!(scheduler.cancel(ChatId(1), second));
        assert!(!scheduler.cancel(ChatId(1), second));
        assert_eq!(scheduler.live_jobs(), 0);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn arm_with_id_keeps_the_given_id() {
        let (scheduler, mut rx, clock) = scheduler();
        let id = JobId::new();
        scheduler.arm(ChatId(1), clock.now() + chrono::Duration::minutes(1));
        scheduler.arm_with_id(ChatId(1), clock.now() + chrono::Duration::minutes(2), id);

        assert_eq!(scheduler.pending(ChatId(1)), Some(id));
        assert_eq!(scheduler.live_jobs(), 1);
        assert_eq!(rx.recv().await.unwrap().job_id, id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_fires_immediately() {
        let (scheduler, mut rx, clock) = scheduler();
        let id = scheduler.arm(ChatId(1), clock.now() - chrono::Duration::hours(1));

        let job = tokio::time::timeout(Duration::from_millis(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(job.job_id, id);
    }
}
