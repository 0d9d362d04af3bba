//! Диалог с пользователем: что бот ждёт дальше и что делает ответ.
//!
//! Каждая точка входа сначала берёт блокировку сессии, поэтому событие и
//! напоминание одного пользователя не перемешиваются.

pub mod menus;

use teloxide::types::ChatId;
use tokio::sync::mpsc;

use crate::billing::{self, Quote, SubscriptionError};
use crate::bot_state::BotState;
use crate::models::{Action, Awaiting, JobId, Session};
use crate::scheduler::FiredJob;
use crate::store::{SessionGuard, StoreError};
use crate::transport::{Keyboard, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Help,
    Status,
    Button(Action),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub async fn handle_event(
    state: &BotState,
    user_id: ChatId,
    event: Event,
) -> Result<(), ConversationError> {
    let guard = state.sessions.lock(user_id).await;

    match event {
        Event::Start => start(state, &guard).await,
        Event::Help => reply(state, user_id, menus::HELP, None).await,
        Event::Status => {
            let session = guard.load_or_new().await?;
            reply(state, user_id, &menus::status(&session), None).await
        }
        Event::Button(action) => on_action(state, &guard, action).await,
        Event::Text(text) => on_text(state, &guard, &text).await,
    }
}

async fn start(state: &BotState, guard: &SessionGuard) -> Result<(), ConversationError> {
    let mut session = guard.load_or_new().await?;
    session.begin(Awaiting::Idle);
    guard.save(&session).await?;

    reply(
        state,
        guard.user_id(),
        &menus::greeting(&state.config),
        Some(menus::start_keyboard(&state.config)),
    )
    .await
}

async fn on_action(
    state: &BotState,
    guard: &SessionGuard,
    action: Action,
) -> Result<(), ConversationError> {
    let user_id = guard.user_id();

    match action {
        Action::PayFixed | Action::PayFixedAgain => {
            let mut session = guard.load_or_new().await?;
            session.begin(Awaiting::Idle);
            let quote = Quote {
                amount_per_person: state.config.unit_cost,
                period: 1,
            };
            if activate(state, guard, session, quote).await? {
                reply(
                    state,
                    user_id,
                    &menus::fixed_selected(&state.config),
                    Some(menus::pay_keyboard(&state.config)),
                )
                .await?;
            }
            Ok(())
        }
        Action::CustomAmount | Action::CustomAmountAgain => {
            let mut session = guard.load_or_new().await?;
            session.begin(Awaiting::Amount);
            guard.save(&session).await?;
            reply(state, user_id, menus::ASK_AMOUNT, None).await
        }
        Action::Split | Action::SplitAgain => {
            let mut session = guard.load_or_new().await?;
            session.begin(Awaiting::PeopleCount);
            guard.save(&session).await?;
            reply(state, user_id, menus::ASK_PEOPLE, None).await
        }
        Action::Stop => stop(state, guard).await,
    }
}

async fn on_text(
    state: &BotState,
    guard: &SessionGuard,
    text: &str,
) -> Result<(), ConversationError> {
    let user_id = guard.user_id();
    let Some(mut session) = guard.load().await? else {
        return Ok(());
    };
    let unit_cost = state.config.unit_cost;

    match session.awaiting {
        Awaiting::Idle => Ok(()),

        Awaiting::Amount => {
            let Ok(amount) = billing::parse_amount(text) else {
                return reply(state, user_id, menus::BAD_AMOUNT, None).await;
            };
            match billing::compute_period(amount, unit_cost) {
                Ok(quote) => {
                    if activate(state, guard, session, quote).await? {
                        reply(
                            state,
                            user_id,
                            &menus::amount_accepted(amount, quote.period),
                            Some(menus::pay_keyboard(&state.config)),
                        )
                        .await?;
                    }
                    Ok(())
                }
                Err(e) => refuse(state, user_id, e).await,
            }
        }

        Awaiting::PeopleCount => {
            let Some(people) = billing::parse_people_count(text) else {
                return reply(state, user_id, menus::BAD_PEOPLE, None).await;
            };
            session.people_count = people;
            session.awaiting = Awaiting::TotalSum;
            guard.save(&session).await?;
            reply(state, user_id, &menus::ask_total(people), None).await
        }

        Awaiting::TotalSum => {
            let Ok(total) = billing::parse_amount(text) else {
                return reply(state, user_id, menus::BAD_AMOUNT, None).await;
            };
            let people = session.people_count;
            match billing::compute_split(total, people, unit_cost) {
                Ok(quote) => {
                    if activate(state, guard, session, quote).await? {
                        reply(
                            state,
                            user_id,
                            &menus::split_accepted(total, people, quote.amount_per_person, quote.period),
                            Some(menus::pay_keyboard(&state.config)),
                        )
                        .await?;
                    }
                    Ok(())
                }
                Err(SubscriptionError::InvalidPeopleCount) => {
                    // Число людей потерялось; спрашиваем заново.
                    session.begin(Awaiting::PeopleCount);
                    guard.save(&session).await?;
                    reply(state, user_id, menus::ASK_PEOPLE, None).await
                }
                Err(SubscriptionError::InsufficientAmount { amount, unit_cost }) => {
                    reply(state, user_id, &menus::insufficient_share(amount, unit_cost), None).await
                }
                Err(e) => refuse(state, user_id, e).await,
            }
        }
    }
}

/// Сохраняет новую подписку и перезапускает её напоминание.
/// Возвращает `false`, если из периода не вышло время окончания; пользователю
/// уже ответили, ничего не изменилось.
async fn activate(
    state: &BotState,
    guard: &SessionGuard,
    mut session: Session,
    quote: Quote,
) -> Result<bool, ConversationError> {
    let user_id = guard.user_id();
    let expire_at = match billing::expiry(state.clock.now(), quote.period, state.config.billing_unit) {
        Ok(at) => at,
        Err(e) => {
            refuse(state, user_id, e).await?;
            return Ok(false);
        }
    };

    // Сначала сохраняем: пока запись не удалась, старый таймер продолжает жить.
    let job_id = JobId::new();
    session.subscribe(quote.amount_per_person, quote.period, expire_at, job_id);
    guard.save(&session).await?;
    state.scheduler.arm_with_id(user_id, expire_at, job_id);

    log::info!(
        "✅ User {} subscribed: {} per person, {} periods, reminder at {}",
        user_id,
        quote.amount_per_person,
        quote.period,
        expire_at
    );
    Ok(true)
}

async fn refuse(
    state: &BotState,
    user_id: ChatId,
    error: SubscriptionError,
) -> Result<(), ConversationError> {
    let text = match error {
        SubscriptionError::InsufficientAmount { amount, unit_cost } => {
            menus::insufficient(amount, unit_cost)
        }
        SubscriptionError::PeriodTooLong { period } => menus::too_long(period),
        SubscriptionError::InvalidPeopleCount => menus::BAD_PEOPLE.to_string(),
    };
    reply(state, user_id, &text, None).await
}

async fn stop(state: &BotState, guard: &SessionGuard) -> Result<(), ConversationError> {
    let user_id = guard.user_id();
    let mut session = guard.load_or_new().await?;

    if let Some(job_id) = session.reset() {
        state.scheduler.cancel(user_id, job_id);
    }
    if let Some(orphan) = state.scheduler.pending(user_id) {
        state.scheduler.cancel(user_id, orphan);
    }
    guard.save(&session).await?;

    log::info!("🛑 Subscription stopped for user {}", user_id);
    reply(state, user_id, menus::STOPPED, None).await
}

async fn reply(
    state: &BotState,
    user_id: ChatId,
    text: &str,
    keyboard: Option<Keyboard>,
) -> Result<(), ConversationError> {
    state.transport.send(user_id, text, keyboard).await?;
    Ok(())
}

/// Обрабатывает один сработавший таймер. Устаревшие (заменённые или
/// отменённые после срабатывания) игнорируются.
pub async fn deliver_reminder(state: &BotState, job: FiredJob) -> Result<(), StoreError> {
    let guard = state.sessions.lock(job.user_id).await;
    let Some(mut session) = guard.load().await? else {
        log::debug!("Reminder {} for unknown user {} dropped", job.job_id, job.user_id);
        return Ok(());
    };
    if session.pending_job_id != Some(job.job_id) {
        log::debug!("Stale reminder {} for user {} ignored", job.job_id, job.user_id);
        return Ok(());
    }

    session.pending_job_id = None;
    guard.save(&session).await?;

    let sent = state
        .transport
        .send(
            job.user_id,
            &menus::reminder(&session),
            Some(menus::renewal_keyboard(&state.config)),
        )
        .await;

    match sent {
        Ok(()) => log::info!("🔔 Reminder {} delivered to user {}", job.job_id, job.user_id),
        Err(e) => log::warn!("Reminder {} for user {} not delivered: {}", job.job_id, job.user_id, e),
    }
    Ok(())
}

/// Работает, пока жив планировщик. Каждое напоминание доставляется в своей
/// задаче, медленный чат не задерживает остальные.
pub async fn run_reminder_delivery(state: BotState, mut fired: mpsc::UnboundedReceiver<FiredJob>) {
    while let Some(job) = fired.recv().await {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = deliver_reminder(&state, job).await {
                log::error!("Error delivering reminder for user {}: {}", job.user_id, e);
            }
        });
    }
}

/// Перезапускает напоминания, которых сессии ждали до рестарта.
pub async fn restore_reminders(state: &BotState) -> Result<usize, StoreError> {
    let mut restored = 0;

    for stored in state.sessions.load_all().await? {
        if stored.pending_job_id.is_none() {
            continue;
        }

        let guard = state.sessions.lock(stored.user_id).await;
        let Some(mut session) = guard.load().await? else {
            continue;
        };

        match (session.pending_job_id, session.expire_at) {
            (Some(_), Some(expire_at)) if session.is_subscribed() => {
                session.pending_job_id = Some(state.scheduler.arm(session.user_id, expire_at));
                guard.save(&session).await?;
                restored += 1;
            }
            (Some(_), _) => {
                log::warn!("Dropping pending reminder of user {} without a subscription", session.user_id);
                session.pending_job_id = None;
                guard.save(&session).await?;
            }
            (None, _) => {}
        }
    }

    Ok(restored)
}
