pub mod commands;
pub mod messages;
pub mod callbacks;

pub use commands::command_handler;
pub use messages::message_handler;
pub use callbacks::callback_handler;

use std::time::Duration;
use teloxide::types::{ChatId, User};
use tokio::time;

use crate::bot_state::BotState;

/// Сессия принадлежит тому, кто пишет или нажимает кнопку, а не чату:
/// в группе у каждого участника своя подписка. Без отправителя (посты
/// каналов) остаётся идентификатор чата.
pub fn sender_id(from: Option<&User>, chat_id: ChatId) -> ChatId {
    from.map(|user| ChatId::from(user.id)).unwrap_or(chat_id)
}

pub async fn cleanup_locks_task(state: BotState) {
    let mut interval = time::interval(Duration::from_secs(600));

    loop {
        interval.tick().await;
        state.cleanup_locks();
    }
}
