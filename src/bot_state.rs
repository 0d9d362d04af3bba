use std::sync::Arc;

use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::models::PaymentConfig;
use crate::scheduler::{FiredJob, ReminderScheduler};
use crate::store::{SessionRegistry, SessionStore};
use crate::transport::Transport;

/// Всё, что делят обработчики и цикл напоминаний.
#[derive(Clone)]
pub struct BotState {
    pub sessions: SessionRegistry,
    pub scheduler: ReminderScheduler,
    pub transport: Arc<dyn Transport>,
    pub config: Arc<PaymentConfig>,
    pub clock: Arc<dyn Clock>,
}

impl BotState {
    /// Получатель отдаёт сработавшие напоминания и принадлежит циклу доставки.
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        config: PaymentConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<FiredJob>) {
        let (scheduler, fired) = ReminderScheduler::new(clock.clone());
        let state = Self {
            sessions: SessionRegistry::new(store),
            scheduler,
            transport,
            config: Arc::new(config),
            clock,
        };
        (state, fired)
    }

    pub fn cleanup_locks(&self) {
        let evicted = self.sessions.evict_idle_locks();
        log::debug!(
            "🧹 Evicted {} idle session locks, {} reminders armed",
            evicted,
            self.scheduler.live_jobs()
        );
    }
}
