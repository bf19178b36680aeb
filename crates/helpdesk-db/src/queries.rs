use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::{MessageLink, UserRow};
use crate::{Database, Result};

impl Database {
    // -- Users --

    /// Records a user on first contact. Returns `false` when the row already
    /// existed.
    pub fn remember_user(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute("INSERT OR IGNORE INTO users (id) VALUES (?1)", [user_id])?;
            Ok(inserted > 0)
        })
    }

    /// Deletes the user; their message links go with it (ON DELETE CASCADE).
    pub fn forget_user(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            Ok(deleted > 0)
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, user_id))
    }

    pub fn find_assigned_to(&self, user_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let assigned = conn
                .query_row(
                    "SELECT assigned_to FROM users WHERE id = ?1",
                    [user_id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(assigned.flatten().filter(|name| !name.is_empty()))
        })
    }

    /// Returns `false` if there is no such user, in which case nothing changed.
    pub fn assign_to(&self, user_id: i64, staff_username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET assigned_to = ?1 WHERE id = ?2",
                rusqlite::params![staff_username, user_id],
            )?;
            Ok(updated > 0)
        })
    }

    // -- Message links --

    pub fn remember_message(
        &self,
        user_id: i64,
        user_chat_message_id: i64,
        support_chat_message_id: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, user_chat_message_id, support_chat_message_id)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, user_chat_message_id, support_chat_message_id],
            )?;
            Ok(())
        })
    }

    pub fn find_message_by_support_id(&self, support_chat_message_id: i64) -> Result<Option<MessageLink>> {
        self.with_conn(|conn| {
            let link = conn
                .query_row(
                    "SELECT user_id, user_chat_message_id, support_chat_message_id
                     FROM messages
                     WHERE support_chat_message_id = ?1
                     LIMIT 1",
                    [support_chat_message_id],
                    map_link,
                )
                .optional()?;
            Ok(link)
        })
    }

    /// Private-chat message ids are only unique within one chat, so the
    /// lookup is scoped to the user.
    pub fn find_message_by_user_message_id(
        &self,
        user_id: i64,
        user_chat_message_id: i64,
    ) -> Result<Option<MessageLink>> {
        self.with_conn(|conn| {
            let link = conn
                .query_row(
                    "SELECT user_id, user_chat_message_id, support_chat_message_id
                     FROM messages
                     WHERE user_id = ?1 AND user_chat_message_id = ?2
                     LIMIT 1",
                    [user_id, user_chat_message_id],
                    map_link,
                )
                .optional()?;
            Ok(link)
        })
    }

    pub fn count_links(&self, user_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}

fn query_user(conn: &Connection, user_id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare("SELECT id, assigned_to, created_at FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([user_id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                assigned_to: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_link(row: &Row<'_>) -> rusqlite::Result<MessageLink> {
    Ok(MessageLink {
        user_id: row.get(0)?,
        user_chat_message_id: row.get(1)?,
        support_chat_message_id: row.get(2)?,
    })
}
