use serde::{Deserialize, Serialize};

/// One item of the `getUpdates` long-poll result.
///
/// Only the two update kinds the relay subscribes to are modelled; any other
/// field in the payload is ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
}

impl Update {
    /// Chat the update belongs to, if it carries a message at all.
    pub fn chat_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .map(|m| m.chat.id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Set when the message was sent on behalf of a chat (anonymous admins,
    /// linked channels).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_chat: Option<Chat>,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    pub fn sender_username(&self) -> Option<&str> {
        self.from
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edited_reply_with_unknown_fields() {
        let raw = r##"{
            "update_id": 881,
            "edited_message": {
                "message_id": 17,
                "date": 1700000000,
                "edit_date": 1700000100,
                "from": {"id": 5, "is_bot": false, "first_name": "Ann", "username": "ann"},
                "chat": {"id": -1001234567890, "type": "supergroup", "title": "Support"},
                "text": "fixed typo",
                "reply_to_message": {
                    "message_id": 12,
                    "from": {"id": 999, "is_bot": true, "first_name": "Relay"},
                    "chat": {"id": -1001234567890, "type": "supergroup"},
                    "text": "#42\n\nHello"
                }
            }
        }"##;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert!(update.message.is_none());
        assert_eq!(update.chat_id(), Some(-1001234567890));

        let edited = update.edited_message.unwrap();
        assert_eq!(edited.sender_username(), Some("ann"));
        let reply = edited.reply_to_message.unwrap();
        assert_eq!(reply.message_id, 12);
        assert!(reply.from.unwrap().is_bot);
    }

    #[test]
    fn update_without_message_has_no_chat() {
        let update: Update = serde_json::from_str(r#"{"update_id": 1, "poll": {}}"#).unwrap();
        assert_eq!(update.chat_id(), None);
    }

    #[test]
    fn empty_username_counts_as_hidden() {
        let message = Message {
            from: Some(User {
                id: 1,
                username: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(message.sender_username(), None);
    }
}
