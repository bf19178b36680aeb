use serde::{Deserialize, Serialize};

// -- Response envelope --

/// Every Bot API method answers with this envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i32>,
    pub description: Option<String>,
}

// -- Requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    /// Legacy Markdown: `*bold*`, `_italic_`, `[text](url)`.
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkPreviewOptions {
    pub is_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
}

impl SendMessage {
    /// Plain text, no formatting.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            link_preview_options: None,
        }
    }

    pub fn markdown(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::text(chat_id, text)
        }
    }

    pub fn without_preview(mut self) -> Self {
        self.link_preview_options = Some(LinkPreviewOptions { is_disabled: true });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditMessageText {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
}

impl EditMessageText {
    pub fn text(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
            parse_mode: None,
            link_preview_options: None,
        }
    }

    pub fn markdown(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::text(chat_id, message_id, text)
        }
    }

    pub fn without_preview(mut self) -> Self {
        self.link_preview_options = Some(LinkPreviewOptions { is_disabled: true });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_send_omits_optional_fields() {
        let body = serde_json::to_value(SendMessage::text(42, "Sure, got it")).unwrap();
        assert_eq!(body, json!({"chat_id": 42, "text": "Sure, got it"}));
    }

    #[test]
    fn markdown_edit_without_preview() {
        let req = EditMessageText::markdown(-100, 7, "#42\n\nHello").without_preview();
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["parse_mode"], "Markdown");
        assert_eq!(body["link_preview_options"]["is_disabled"], true);
        assert_eq!(body["message_id"], 7);
    }
}
