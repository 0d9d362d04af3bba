use teloxide::prelude::*;
use std::error::Error;

use crate::bot_state::BotState;
use crate::conversation::{self, Event};
use crate::models::Action;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    // Убираем индикатор загрузки на нажатой кнопке.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Could not answer callback query {}: {}", q.id, e);
    }

    let Some(action) = q.data.as_deref().and_then(Action::from_payload) else {
        log::debug!("Ignoring callback {:?} from user {}", q.data, q.from.id);
        return Ok(());
    };

    let user_id = ChatId::from(q.from.id);
    conversation::handle_event(&state, user_id, Event::Button(action)).await?;
    Ok(())
}
