pub mod client;
pub mod dispatcher;
pub mod polling;

pub use client::{ApiError, BotApi, TelegramClient};
pub use dispatcher::{Dispatcher, DispatcherConfig, Incoming, Origin, UpdateHandler, UpdateKind};
