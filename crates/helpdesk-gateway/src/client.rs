use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use helpdesk_types::{ApiResponse, EditMessageText, Message, SendMessage, Update, User};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_SLACK: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} failed ({code}): {description}")]
    Api {
        method: &'static str,
        code: i32,
        description: String,
    },
    #[error("{0}: response has no result")]
    MissingResult(&'static str),
}

/// The outbound half of the Bot API the relay handlers need.
#[async_trait]
pub trait BotApi: Send + Sync + 'static {
    /// Sends a message and returns it as the platform stored it (with its id).
    async fn send_message(&self, req: SendMessage) -> Result<Message, ApiError>;

    async fn edit_message_text(&self, req: EditMessageText) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-polls for new updates. Blocks server-side for up to `timeout_secs`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ApiError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "edited_message"],
        });
        let timeout = Duration::from_secs(timeout_secs) + POLL_SLACK;
        self.call("getUpdates", &body, timeout).await
    }

    async fn call<B, T>(&self, method: &'static str, body: &B, timeout: Duration) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let resp: ApiResponse<T> = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            return Err(ApiError::Api {
                method,
                code: resp.error_code.unwrap_or_default(),
                description: resp.description.unwrap_or_default(),
            });
        }

        resp.result.ok_or(ApiError::MissingResult(method))
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn send_message(&self, req: SendMessage) -> Result<Message, ApiError> {
        debug!("sendMessage to {}", req.chat_id);
        self.call("sendMessage", &req, REQUEST_TIMEOUT).await
    }

    async fn edit_message_text(&self, req: EditMessageText) -> Result<(), ApiError> {
        debug!("editMessageText {} in {}", req.message_id, req.chat_id);
        // Result is either the edited Message or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &req, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_ignores_trailing_slash() {
        let client = TelegramClient::new("https://api.example.org/", "123:abc").unwrap();
        assert_eq!(client.base_url, "https://api.example.org/bot123:abc");
    }

    #[test]
    fn api_error_names_the_method() {
        let err = ApiError::Api {
            method: "sendMessage",
            code: 403,
            description: "Forbidden: bot was blocked by the user".into(),
        };
        assert_eq!(
            err.to_string(),
            "sendMessage failed (403): Forbidden: bot was blocked by the user"
        );
    }
}
