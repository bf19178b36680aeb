//! Text the relay composes: user headers and support-chat deep links.

/// Offset Telegram adds to supergroup ids (`-100XXXXXXXXXX`).
const SUPERGROUP_OFFSET: i64 = 1_000_000_000_000;

/// The staff group and the id its messages use in `t.me/c/` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportChat {
    pub id: i64,
    pub link_id: i64,
}

impl SupportChat {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            link_id: link_id_for(id),
        }
    }

    pub fn with_link_id(id: i64, link_id: i64) -> Self {
        Self { id, link_id }
    }

    pub fn message_link(&self, message_id: i64) -> String {
        format!("https://t.me/c/{}/{}", self.link_id, message_id)
    }
}

/// `-1001234567890` -> `1234567890`; a basic group id just loses its sign.
pub fn link_id_for(chat_id: i64) -> i64 {
    if chat_id <= -SUPERGROUP_OFFSET {
        -(chat_id + SUPERGROUP_OFFSET)
    } else {
        chat_id.abs()
    }
}

/// Escapes the characters legacy Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn user_header(user_id: i64, username: Option<&str>, assigned_to: Option<&str>) -> String {
    let mut header = match username {
        Some(name) => format!("[#{}](t.me/{})", user_id, name),
        None => format!("#{}", user_id),
    };
    if let Some(staff) = assigned_to {
        header.push_str(" @");
        header.push_str(&escape_markdown(staff));
    }
    header
}

/// The support-chat copy of a user's message, in Markdown.
pub fn support_copy(
    user_id: i64,
    username: Option<&str>,
    assigned_to: Option<&str>,
    body: &str,
) -> String {
    format!(
        "{}\n\n{}",
        user_header(user_id, username, assigned_to),
        escape_markdown(body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supergroup_link_id() {
        assert_eq!(link_id_for(-1001234567890), 1234567890);
        assert_eq!(link_id_for(-4567), 4567);
        assert_eq!(link_id_for(i64::MIN), i64::MAX - SUPERGROUP_OFFSET + 1);

        let chat = SupportChat::new(-1001234567890);
        assert_eq!(chat.message_link(77), "https://t.me/c/1234567890/77");
        assert_eq!(SupportChat::with_link_id(-1, 9).message_link(3), "https://t.me/c/9/3");
    }

    #[test]
    fn header_variants() {
        assert_eq!(user_header(42, None, None), "#42");
        assert_eq!(user_header(42, Some("ann"), None), "[#42](t.me/ann)");
        assert_eq!(user_header(42, None, Some("bob")), "#42 @bob");
        assert_eq!(user_header(42, Some("ann"), Some("bob_s")), "[#42](t.me/ann) @bob\\_s");
    }

    #[test]
    fn body_is_escaped() {
        assert_eq!(support_copy(42, None, None, "Hello"), "#42\n\nHello");
        assert_eq!(
            support_copy(42, None, None, "file_name *now* [x]"),
            "#42\n\nfile\\_name \\*now\\* \\[x]"
        );
    }
}
