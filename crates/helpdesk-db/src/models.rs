//! Database row types, mapped straight from SQLite rows.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub assigned_to: Option<String>,
    pub created_at: String,
}

/// A relayed message: the copy in the user's private chat and its
/// counterpart in the support chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLink {
    pub user_id: i64,
    pub user_chat_message_id: i64,
    pub support_chat_message_id: i64,
}
