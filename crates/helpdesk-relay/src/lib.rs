//! Relay between the staff support chat and users' private chats.
//!
//! [`Relay`] is the [`UpdateHandler`] the dispatcher feeds. Support-chat
//! traffic is handled in [`support`], private-chat traffic in [`user`].

pub mod commands;
pub mod format;
mod support;
mod user;


use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use helpdesk_db::{Database, StorageError};
use helpdesk_gateway::{ApiError, BotApi, Incoming, Origin, UpdateHandler, UpdateKind};
use helpdesk_types::{Message, SendMessage};

pub use format::SupportChat;

pub const DEFAULT_WELCOME_TEXT: &str = "Welcome to support! Please describe your question.";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("bot api: {0}")]
    Api(#[from] ApiError),
    #[error("blocking task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub support_chat: SupportChat,
    /// Our own account; only replies to its messages reach users.
    pub bot_user_id: i64,
    pub bot_username: Option<String>,
    pub welcome_text: String,
}

pub struct Relay<A> {
    db: Arc<Database>,
    api: Arc<A>,
    settings: RelaySettings,
}

impl<A: BotApi> Relay<A> {
    pub fn new(db: Arc<Database>, api: Arc<A>, settings: RelaySettings) -> Self {
        Self { db, api, settings }
    }

    /// Runs a database call off the async runtime.
    async fn storage<F, T>(&self, f: F) -> Result<T, RelayError>
    where
        F: FnOnce(&Database) -> helpdesk_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let out = tokio::task::spawn_blocking(move || f(&db)).await??;
        Ok(out)
    }

    async fn say(&self, chat_id: i64, text: impl Into<String>) -> Result<Message, RelayError> {
        Ok(self.api.send_message(SendMessage::text(chat_id, text)).await?)
    }

    fn bot_username(&self) -> Option<&str> {
        self.settings.bot_username.as_deref()
    }
}

#[async_trait]
impl<A: BotApi> UpdateHandler for Relay<A> {
    async fn handle(&self, incoming: Incoming) {
        let Incoming {
            origin,
            kind,
            message,
        } = incoming;
        debug!(
            "{:?} {:?} message {} in chat {}",
            kind, origin, message.message_id, message.chat.id
        );

        let result = match (origin, kind) {
            (Origin::SupportChat, UpdateKind::New) => self.on_support_message(&message).await,
            (Origin::SupportChat, UpdateKind::Edited) => self.on_support_edited(&message).await,
            (Origin::UserChat, UpdateKind::New) => self.on_user_message(&message).await,
            (Origin::UserChat, UpdateKind::Edited) => self.on_user_edited(&message).await,
        };

        if let Err(e) = result {
            error!(
                "Failed to relay message {} from chat {}: {}",
                message.message_id, message.chat.id, e
            );
        }
    }
}
