pub mod api;
pub mod updates;

pub use api::{ApiResponse, EditMessageText, LinkPreviewOptions, ParseMode, SendMessage};
pub use updates::{Chat, Message, Update, User};
