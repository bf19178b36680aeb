use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use helpdesk_gateway::client::DEFAULT_API_URL;
use helpdesk_relay::{DEFAULT_WELCOME_TEXT, SupportChat};

/// Placeholder tokens copied from docs that must not reach the API.
const PLACEHOLDER_TOKENS: &[&str] = &["change-me", "123456:ABC-DEF"];

#[derive(Debug, Clone)]
pub struct Config {
    pub support_chat: SupportChat,
    pub bot_token: String,
    pub db_path: PathBuf,
    pub api_url: String,
    pub poll_timeout_secs: u64,
    pub max_concurrency: usize,
    pub queue_capacity: usize,
    pub worker_idle: Duration,
    pub welcome_text: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chat_id: i64 = var("HELPDESK_SUPPORT_CHAT_ID")
            .context("HELPDESK_SUPPORT_CHAT_ID is not set")?
            .trim()
            .parse()
            .context("HELPDESK_SUPPORT_CHAT_ID must be a numeric chat id")?;
        if chat_id >= 0 {
            bail!("HELPDESK_SUPPORT_CHAT_ID must be a group id (negative), got {}", chat_id);
        }

        let support_chat = match var("HELPDESK_SUPPORT_CHAT_LINK_ID") {
            Some(raw) => {
                let link_id = raw
                    .trim()
                    .parse()
                    .context("HELPDESK_SUPPORT_CHAT_LINK_ID must be numeric")?;
                SupportChat::with_link_id(chat_id, link_id)
            }
            None => SupportChat::new(chat_id),
        };

        let bot_token = var("HELPDESK_BOT_TOKEN").context("HELPDESK_BOT_TOKEN is not set")?;
        if PLACEHOLDER_TOKENS.contains(&bot_token.as_str()) {
            bail!("HELPDESK_BOT_TOKEN is still a placeholder");
        }

        Ok(Self {
            support_chat,
            bot_token,
            db_path: var("HELPDESK_DB_PATH")
                .unwrap_or_else(|| "helpdesk.db".into())
                .into(),
            api_url: var("HELPDESK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            poll_timeout_secs: parse_or(&var, "HELPDESK_POLL_TIMEOUT_SECS", 30)?,
            max_concurrency: parse_or(&var, "HELPDESK_MAX_CONCURRENCY", 16)?,
            queue_capacity: parse_or(&var, "HELPDESK_QUEUE_CAPACITY", 32)?,
            worker_idle: Duration::from_secs(parse_or(&var, "HELPDESK_WORKER_IDLE_SECS", 60)?),
            welcome_text: var("HELPDESK_WELCOME_TEXT")
                .unwrap_or_else(|| DEFAULT_WELCOME_TEXT.into()),
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-1001234567890"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
        ])
        .unwrap();

        assert_eq!(config.support_chat.id, -1001234567890);
        assert_eq!(config.support_chat.link_id, 1234567890);
        assert_eq!(config.db_path, PathBuf::from("helpdesk.db"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_timeout_secs, 30);
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.worker_idle, Duration::from_secs(60));
        assert_eq!(config.welcome_text, DEFAULT_WELCOME_TEXT);
    }

    #[test]
    fn explicit_link_id_wins() {
        let config = load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-1001234567890"),
            ("HELPDESK_SUPPORT_CHAT_LINK_ID", "555"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
            ("HELPDESK_MAX_CONCURRENCY", " 4 "),
        ])
        .unwrap();
        assert_eq!(config.support_chat.link_id, 555);
        assert_eq!(config.max_concurrency, 4);
    }

    #[test]
    fn most_negative_chat_id_still_loads() {
        let config = load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-9223372036854775808"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
        ])
        .unwrap();
        assert_eq!(config.support_chat.id, i64::MIN);
        assert!(config.support_chat.link_id > 0);
    }

    #[test]
    fn required_values_are_enforced() {
        assert!(load(&[("HELPDESK_BOT_TOKEN", "42:secret")]).is_err());
        assert!(load(&[("HELPDESK_SUPPORT_CHAT_ID", "-100123")]).is_err());
        assert!(load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-100123"),
            ("HELPDESK_BOT_TOKEN", "   "),
        ])
        .is_err());
        assert!(load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-100123"),
            ("HELPDESK_BOT_TOKEN", "change-me"),
        ])
        .is_err());
    }

    #[test]
    fn malformed_values_are_fatal() {
        assert!(load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "support"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
        ])
        .is_err());
        assert!(load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "42"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
        ])
        .is_err());
        assert!(load(&[
            ("HELPDESK_SUPPORT_CHAT_ID", "-100123"),
            ("HELPDESK_BOT_TOKEN", "42:secret"),
            ("HELPDESK_POLL_TIMEOUT_SECS", "soon"),
        ])
        .is_err());
    }
}
