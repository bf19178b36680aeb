use std::time::Duration;

use futures_util::Stream;
use tracing::{debug, warn};

use helpdesk_types::Update;

use crate::client::TelegramClient;

/// Pause after a failed `getUpdates` before polling again.
pub const POLL_ERROR_PAUSE: Duration = Duration::from_secs(3);

/// Endless stream of updates fetched with `getUpdates` long-polling.
///
/// The offset advances past every update yielded, so each update is seen
/// once. Poll failures are logged and polling resumes after
/// [`POLL_ERROR_PAUSE`].
pub fn updates(client: TelegramClient, timeout_secs: u64) -> impl Stream<Item = Update> + Send {
    async_stream::stream! {
        let mut offset: i64 = 0;
        loop {
            match client.get_updates(offset, timeout_secs).await {
                Ok(batch) => {
                    if !batch.is_empty() {
                        debug!("Received {} update(s)", batch.len());
                    }
                    for update in batch {
                        offset = next_offset(offset, &update);
                        yield update;
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_ERROR_PAUSE).await;
                }
            }
        }
    }
}

fn next_offset(current: i64, update: &Update) -> i64 {
    current.max(update.update_id + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_only_moves_forward() {
        let update = |update_id| Update {
            update_id,
            ..Default::default()
        };
        assert_eq!(next_offset(0, &update(10)), 11);
        assert_eq!(next_offset(11, &update(11)), 12);
        assert_eq!(next_offset(20, &update(5)), 20);
    }
}
