use teloxide::prelude::*;
use std::error::Error;

use crate::bot_state::BotState;
use crate::conversation::{self, Event};
use crate::models::Action;
use crate::Command;

pub async fn command_handler(
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let event = match cmd {
        Command::Start => Event::Start,
        Command::Help => Event::Help,
        Command::Status => Event::Status,
        Command::Stop => Event::Button(Action::Stop),
    };

    let user_id = super::sender_id(msg.from.as_ref(), msg.chat.id);
    log::debug!("Command {:?} from user {} in chat {}", event, user_id, msg.chat.id);
    conversation::handle_event(&state, user_id, event).await?;
    Ok(())
}
