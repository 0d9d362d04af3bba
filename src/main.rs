use teloxide::{prelude::*, utils::command::BotCommands};
use std::env;
use std::error::Error;
use std::sync::Arc;

mod billing;
mod bot_state;
mod clock;
mod conversation;
mod database;
mod handlers;
mod models;
mod scheduler;
mod store;
mod transport;

use crate::bot_state::BotState;
use crate::clock::SystemClock;
use crate::database::{Database, PgSessionStore};
use crate::handlers::{callback_handler, command_handler, message_handler};
use crate::models::PaymentConfig;
use crate::store::{MemorySessionStore, SessionStore};
use crate::transport::TelegramTransport;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
enum Command {
    #[command(description = "выбрать вариант оплаты")]
    Start,
    #[command(description = "показать помощь")]
    Help,
    #[command(description = "текущая подписка")]
    Status,
    #[command(description = "остановить подписку")]
    Stop,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting subscription reminder bot...");

    let config = PaymentConfig::from_env()?;
    log::info!(
        "💳 Unit cost {} per {:?}, pay link {}",
        config.unit_cost,
        config.billing_unit,
        config.payment_url
    );

    let store: Arc<dyn SessionStore> = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let db = Database::new(&database_url).await?;
            db.init().await?;
            log::info!("✅ Database initialized");
            Arc::new(PgSessionStore::new(db))
        }
        Err(_) => {
            log::warn!("DATABASE_URL is not set, sessions live in memory only");
            Arc::new(MemorySessionStore::new())
        }
    };

    let bot = Bot::from_env();
    let transport = Arc::new(TelegramTransport::new(bot.clone(), config.send_timeout));
    let (state, fired) = BotState::new(store, transport, config, Arc::new(SystemClock));

    let restored = conversation::restore_reminders(&state).await?;
    log::info!("⏰ {} pending reminders restored", restored);

    // Доставка напоминаний
    let state_clone = state.clone();
    tokio::spawn(async move {
        conversation::run_reminder_delivery(state_clone, fired).await;
    });

    // Очистка неиспользуемых блокировок
    let state_clone = state.clone();
    tokio::spawn(async move {
        handlers::cleanup_locks_task(state_clone).await;
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler)
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
