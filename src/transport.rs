use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::RequestError;

use crate::models::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Возвращается боту как callback query.
    Action { label: String, action: Action },
    /// Открывает внешнюю страницу, обратно ничего не приходит.
    Link { label: String, url: Url },
}

impl Button {
    pub fn action(label: impl Into<String>, action: Action) -> Self {
        Button::Action { label: label.into(), action }
    }

    pub fn link(label: impl Into<String>, url: Url) -> Self {
        Button::Link { label: label.into(), url }
    }
}

/// Ряды кнопок под сообщением.
pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(RequestError),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    /// Telegram ответил отказом (бот заблокирован, чат не найден и т.п.).
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl From<RequestError> for TransportError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Api(api) => TransportError::Rejected(api.to_string()),
            other => TransportError::Request(other),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        user_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError>;
}

pub struct TelegramTransport {
    bot: Bot,
    timeout: Duration,
}

impl TelegramTransport {
    pub fn new(bot: Bot, timeout: Duration) -> Self {
        Self { bot, timeout }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(
        &self,
        user_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.send_message(user_id, text.to_string());
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(inline_markup(keyboard));
        }

        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}

fn inline_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.into_iter().map(|row| {
        row.into_iter()
            .map(|button| match button {
                Button::Action { label, action } => {
                    InlineKeyboardButton::callback(label, action.payload())
                }
                Button::Link { label, url } => InlineKeyboardButton::url(label, url),
            })
            .collect::<Vec<_>>()
    }))
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use teloxide::ApiError;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMessage {
        pub user_id: ChatId,
        pub text: String,
        pub keyboard: Option<Keyboard>,
    }

    impl SentMessage {
        pub fn actions(&self) -> Vec<Action> {
            self.keyboard
                .iter()
                .flatten()
                .flatten()
                .filter_map(|button| match button {
                    Button::Action { action, .. } => Some(*action),
                    Button::Link { .. } => None,
                })
                .collect()
        }

        pub fn has_link(&self) -> bool {
            self.keyboard
                .iter()
                .flatten()
                .flatten()
                .any(|button| matches!(button, Button::Link { .. }))
        }
    }

    /// Запоминает сообщения вместо отправки; умеет падать по команде.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<SentMessage>>,
        failing: AtomicBool,
    }

    impl RecordingTransport {
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }

        pub fn take(&self) -> Vec<SentMessage> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }

        pub fn last(&self) -> Option<SentMessage> {
            self.sent.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(
            &self,
            user_id: ChatId,
            text: &str,
            keyboard: Option<Keyboard>,
        ) -> Result<(), TransportError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RequestError::Api(ApiError::BotBlocked).into());
            }
            self.sent.lock().unwrap().push(SentMessage {
                user_id,
                text: text.to_string(),
                keyboard,
            });
            Ok(())
        }
    }
}
