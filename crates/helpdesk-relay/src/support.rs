use tracing::{debug, info, warn};

use helpdesk_db::MessageLink;
use helpdesk_gateway::BotApi;
use helpdesk_types::{EditMessageText, Message, SendMessage};

use crate::commands::{self, Parsed, SupportCommand};
use crate::{Relay, RelayError};

/// Username Telegram shows for admins posting anonymously as the group.
const ANONYMOUS_ADMIN: &str = "GroupAnonymousBot";

pub(crate) const HELP_TEXT: &str =
    "Доступные команды:\n/take - назначить на себя\n/close - завершить разговор";
pub(crate) const NEED_REPLY: &str = "Не получится! Этой командой надо ответить на сообщение";
pub(crate) const NEED_USERNAME: &str =
    "Не получится! У вас либо скрыт username, либо вы анонимный админ";
pub(crate) const UNKNOWN_COMMAND: &str = "Такой команды нету";
pub(crate) const CONVERSATION_CLOSED: &str = "Разговор завершён";

impl<A: BotApi> Relay<A> {
    pub(crate) async fn on_support_message(&self, message: &Message) -> Result<(), RelayError> {
        let Some(text) = message.text.as_deref() else {
            debug!("Ignoring non-text message {} in support chat", message.message_id);
            return Ok(());
        };

        match commands::parse(text, self.bot_username()) {
            Parsed::Command(name) => self.on_support_command(SupportCommand::from_name(name), message).await,
            Parsed::ForAnotherBot => Ok(()),
            Parsed::Plain => self.forward_to_user(message, text).await,
        }
    }

    /// Staff edited a reply: mirror the edit onto the user's copy.
    pub(crate) async fn on_support_edited(&self, message: &Message) -> Result<(), RelayError> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };

        let Some(link) = self.link_for_support_message(message.message_id).await? else {
            debug!("Edited support message {} was never relayed", message.message_id);
            return Ok(());
        };

        self.api
            .edit_message_text(EditMessageText::text(
                link.user_id,
                link.user_chat_message_id,
                text,
            ))
            .await?;
        Ok(())
    }

    async fn on_support_command(
        &self,
        command: SupportCommand,
        message: &Message,
    ) -> Result<(), RelayError> {
        debug!("Support command {:?} in message {}", command, message.message_id);
        match command {
            SupportCommand::Help => {
                self.reply_in_support(HELP_TEXT).await?;
            }
            SupportCommand::Take => self.take(message).await?,
            SupportCommand::Close => self.close(message).await?,
            SupportCommand::Unknown => {
                self.reply_in_support(UNKNOWN_COMMAND).await?;
            }
        }
        Ok(())
    }

    async fn take(&self, message: &Message) -> Result<(), RelayError> {
        let Some(target) = message.reply_to_message.as_deref() else {
            self.reply_in_support(NEED_REPLY).await?;
            return Ok(());
        };
        let Some(username) = staff_username(message) else {
            self.reply_in_support(NEED_USERNAME).await?;
            return Ok(());
        };
        let Some(link) = self.link_for_support_message(target.message_id).await? else {
            return self.report_unknown_sender(target.message_id).await;
        };

        let staff = username.to_string();
        let user_id = link.user_id;
        let assigned = self.storage(move |db| db.assign_to(user_id, &staff)).await?;
        if assigned {
            info!("User {} taken by @{}", user_id, username);
        } else {
            warn!("User {} is gone, /take by @{} changed nothing", user_id, username);
        }

        self.reply_in_support(format!("@{} взял в работу", username)).await?;
        Ok(())
    }

    async fn close(&self, message: &Message) -> Result<(), RelayError> {
        let Some(target) = message.reply_to_message.as_deref() else {
            self.reply_in_support(NEED_REPLY).await?;
            return Ok(());
        };
        let Some(link) = self.link_for_support_message(target.message_id).await? else {
            return self.report_unknown_sender(target.message_id).await;
        };

        let user_id = link.user_id;
        if self.storage(move |db| db.forget_user(user_id)).await? {
            info!("Conversation with user {} closed", user_id);
        }

        self.reply_in_support(CONVERSATION_CLOSED).await?;
        Ok(())
    }

    /// A plain staff message. Only replies to something the relay posted
    /// carry a user to forward to; other chatter stays in the group.
    async fn forward_to_user(&self, message: &Message, text: &str) -> Result<(), RelayError> {
        let Some(target) = message.reply_to_message.as_deref() else {
            return Ok(());
        };
        if !self.posted_by_relay(target) {
            debug!("Reply {} is not to a relayed message", message.message_id);
            return Ok(());
        }

        let Some(link) = self.link_for_support_message(target.message_id).await? else {
            return self.report_unknown_sender(target.message_id).await;
        };

        let sent = self
            .api
            .send_message(SendMessage::text(link.user_id, text))
            .await?;

        let (user_id, staff_message_id) = (link.user_id, message.message_id);
        self.storage(move |db| db.remember_message(user_id, sent.message_id, staff_message_id))
            .await?;
        debug!("Staff message {} delivered to user {}", staff_message_id, user_id);
        Ok(())
    }

    fn posted_by_relay(&self, message: &Message) -> bool {
        message
            .from
            .as_ref()
            .is_some_and(|author| author.id == self.settings.bot_user_id)
    }

    async fn link_for_support_message(&self, message_id: i64) -> Result<Option<MessageLink>, RelayError> {
        self.storage(move |db| db.find_message_by_support_id(message_id))
            .await
    }

    async fn report_unknown_sender(&self, message_id: i64) -> Result<(), RelayError> {
        let support = self.settings.support_chat;
        let text = format!(
            "Отправитель [сообщения]({}) не найден в БД",
            support.message_link(message_id)
        );
        self.api
            .send_message(SendMessage::markdown(support.id, text))
            .await?;
        Ok(())
    }

    async fn reply_in_support(&self, text: impl Into<String>) -> Result<(), RelayError> {
        self.say(self.settings.support_chat.id, text).await?;
        Ok(())
    }
}

/// The sender's public username, unless they post anonymously on behalf of
/// the group.
fn staff_username(message: &Message) -> Option<&str> {
    if message.sender_chat.is_some() {
        return None;
    }
    message
        .sender_username()
        .filter(|name| *name != ANONYMOUS_ADMIN)
}
