use tracing::{debug, info, warn};

use helpdesk_gateway::BotApi;
use helpdesk_types::{EditMessageText, Message, SendMessage};

use crate::commands::{self, Parsed, UserCommand};
use crate::format;
use crate::{Relay, RelayError};

pub(crate) const UNKNOWN_COMMAND: &str = "There is no such command";

impl<A: BotApi> Relay<A> {
    pub(crate) async fn on_user_message(&self, message: &Message) -> Result<(), RelayError> {
        let Some(user_id) = message.from.as_ref().map(|from| from.id) else {
            return Ok(());
        };

        match self.storage(move |db| db.remember_user(user_id)).await {
            Ok(true) => info!("New user {}", user_id),
            Ok(false) => {}
            Err(e) => warn!("Failed to record user {}: {}", user_id, e),
        }

        let Some(text) = message.text.as_deref() else {
            debug!("Ignoring non-text message {} from user {}", message.message_id, user_id);
            return Ok(());
        };

        let command = match commands::parse(text, self.bot_username()) {
            Parsed::Command(name) => UserCommand::from_name(name),
            // No other bot shares a private chat.
            Parsed::ForAnotherBot => UserCommand::Unknown,
            Parsed::Plain => return self.forward_to_support(message, user_id, text).await,
        };
        let reply = match command {
            UserCommand::Start => self.settings.welcome_text.as_str(),
            UserCommand::Unknown => UNKNOWN_COMMAND,
        };
        self.say(user_id, reply).await?;
        Ok(())
    }

    /// The user edited a message: rewrite its copy in the support chat.
    pub(crate) async fn on_user_edited(&self, message: &Message) -> Result<(), RelayError> {
        let (Some(user_id), Some(text)) = (
            message.from.as_ref().map(|from| from.id),
            message.text.as_deref(),
        ) else {
            return Ok(());
        };

        let message_id = message.message_id;
        let Some(link) = self
            .storage(move |db| db.find_message_by_user_message_id(user_id, message_id))
            .await?
        else {
            debug!("Edited message {} of user {} was never relayed", message_id, user_id);
            return Ok(());
        };

        let copy = self.support_copy(message, user_id, text).await;
        self.api
            .edit_message_text(
                EditMessageText::markdown(
                    self.settings.support_chat.id,
                    link.support_chat_message_id,
                    copy,
                )
                .without_preview(),
            )
            .await?;
        Ok(())
    }

    async fn forward_to_support(
        &self,
        message: &Message,
        user_id: i64,
        text: &str,
    ) -> Result<(), RelayError> {
        let copy = self.support_copy(message, user_id, text).await;
        let sent = self
            .api
            .send_message(SendMessage::markdown(self.settings.support_chat.id, copy).without_preview())
            .await?;

        let user_message_id = message.message_id;
        self.storage(move |db| db.remember_message(user_id, user_message_id, sent.message_id))
            .await?;
        debug!("User message {} relayed to support", user_message_id);
        Ok(())
    }

    /// Header plus body. A failed assignee lookup only costs the `@staff` tag.
    async fn support_copy(&self, message: &Message, user_id: i64, text: &str) -> String {
        let assigned_to = match self.storage(move |db| db.find_assigned_to(user_id)).await {
            Ok(assigned) => assigned,
            Err(e) => {
                warn!("Failed to look up assignee of user {}: {}", user_id, e);
                None
            }
        };
        format::support_copy(user_id, message.sender_username(), assigned_to.as_deref(), text)
    }
}
