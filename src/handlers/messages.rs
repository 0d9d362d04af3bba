use teloxide::prelude::*;
use std::error::Error;

use crate::bot_state::BotState;
use crate::conversation::{self, Event};

pub async fn message_handler(
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Неизвестные команды; известные сюда не доходят.
    if text.starts_with('/') {
        return Ok(());
    }

    let user_id = super::sender_id(msg.from.as_ref(), msg.chat.id);
    conversation::handle_event(&state, user_id, Event::Text(text.to_string())).await?;
    Ok(())
}
