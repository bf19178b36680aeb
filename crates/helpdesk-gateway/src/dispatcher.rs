use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace};

use helpdesk_types::{Message, Update};

/// Where an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The staff group.
    SupportChat,
    /// A private chat with an end user.
    UserChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    New,
    Edited,
}

/// An update that survived routing, ready for a handler.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub origin: Origin,
    pub kind: UpdateKind,
    pub message: Message,
}

impl Incoming {
    /// Routes an update by chat. Returns `None` for anything the relay does
    /// not serve: other groups, channels, update kinds without a message.
    pub fn classify(update: Update, support_chat_id: i64) -> Option<Self> {
        let (kind, message) = match (update.message, update.edited_message) {
            (Some(message), _) => (UpdateKind::New, message),
            (None, Some(message)) => (UpdateKind::Edited, message),
            (None, None) => return None,
        };

        let origin = if message.chat.id == support_chat_id {
            Origin::SupportChat
        } else if message.chat.id > 0 {
            Origin::UserChat
        } else {
            return None;
        };

        Some(Self {
            origin,
            kind,
            message,
        })
    }

    pub fn chat_id(&self) -> i64 {
        self.message.chat.id
    }
}

/// Receives routed updates. Implementations absorb their own failures.
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    async fn handle(&self, incoming: Incoming);
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub support_chat_id: i64,
    /// Handlers allowed to run at the same time, across all chats.
    pub max_concurrency: usize,
    /// Per-chat queue size. A full queue blocks the dispatcher.
    pub queue_capacity: usize,
    /// How long a chat worker waits for more updates before exiting.
    pub worker_idle: Duration,
}

/// Fans updates out to one worker per chat.
///
/// Updates for the same chat are handled one at a time in arrival order;
/// different chats proceed in parallel, capped by a shared semaphore.
pub struct Dispatcher<H> {
    handler: Arc<H>,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
    queues: HashMap<i64, ChatQueue>,
    workers: JoinSet<()>,
}

struct ChatQueue {
    tx: mpsc::Sender<Incoming>,
    /// Held by the chat's worker for its whole life. A replacement worker
    /// waits on it, so a predecessor still draining its backlog finishes first.
    turn: Arc<Mutex<()>>,
}

impl ChatQueue {
    /// Closed and no worker left holding the turn.
    fn is_finished(&self) -> bool {
        self.tx.is_closed() && Arc::strong_count(&self.turn) == 1
    }
}

impl<H: UpdateHandler> Dispatcher<H> {
    pub fn new(handler: Arc<H>, config: DispatcherConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            handler,
            config,
            permits,
            queues: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Consumes `updates` until it ends or `shutdown` resolves, then waits
    /// for every queued update to be handled.
    pub async fn run<S, F>(mut self, updates: S, shutdown: F)
    where
        S: Stream<Item = Update>,
        F: Future<Output = ()>,
    {
        tokio::pin!(updates);
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, draining {} chat queue(s)", self.queues.len());
                    break;
                }
                next = updates.next() => next,
            };
            let Some(update) = next else {
                info!("Update stream ended");
                break;
            };
            if let Dispatched::Interrupted = self.dispatch(update, shutdown.as_mut()).await {
                info!("Shutdown requested while a chat queue was full");
                break;
            }
            self.reap();
        }

        // Dropping the senders lets each worker finish its backlog and exit.
        self.queues.clear();
        while let Some(res) = self.workers.join_next().await {
            if let Err(e) = res {
                error!("Chat worker failed: {}", e);
            }
        }
    }

    /// Queues one update, waiting for room in its chat queue unless
    /// `shutdown` resolves first.
    async fn dispatch<F>(&mut self, update: Update, mut shutdown: Pin<&mut F>) -> Dispatched
    where
        F: Future<Output = ()>,
    {
        let update_id = update.update_id;
        let chat_id = update.chat_id();
        let Some(mut incoming) = Incoming::classify(update, self.config.support_chat_id) else {
            trace!("Dropping update {} from chat {:?}", update_id, chat_id);
            return Dispatched::Queued;
        };

        let chat_id = incoming.chat_id();
        loop {
            let tx = match self.queues.get(&chat_id) {
                Some(queue) if !queue.tx.is_closed() => queue.tx.clone(),
                _ => self.spawn_worker(chat_id),
            };

            // Fails only if the worker went idle and closed its queue in the
            // meantime; the update comes back and goes to a fresh worker.
            tokio::select! {
                sent = tx.send(incoming) => match sent {
                    Ok(()) => return Dispatched::Queued,
                    Err(mpsc::error::SendError(returned)) => incoming = returned,
                },
                _ = &mut shutdown => {
                    debug!("Update {} for chat {} dropped at shutdown", update_id, chat_id);
                    return Dispatched::Interrupted;
                }
            }
        }
    }

    fn spawn_worker(&mut self, chat_id: i64) -> mpsc::Sender<Incoming> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let turn = self
            .queues
            .get(&chat_id)
            .map(|queue| queue.turn.clone())
            .unwrap_or_default();
        self.queues.insert(
            chat_id,
            ChatQueue {
                tx: tx.clone(),
                turn: turn.clone(),
            },
        );

        debug!("Starting worker for chat {}", chat_id);
        self.workers.spawn(run_worker(
            chat_id,
            rx,
            turn,
            self.handler.clone(),
            self.permits.clone(),
            self.config.worker_idle,
        ));
        tx
    }

    /// Forgets exited workers and their closed queues.
    fn reap(&mut self) {
        while let Some(res) = self.workers.try_join_next() {
            if let Err(e) = res {
                error!("Chat worker failed: {}", e);
            }
        }
        self.queues.retain(|_, queue| !queue.is_finished());
    }
}

enum Dispatched {
    Queued,
    Interrupted,
}

async fn run_worker<H: UpdateHandler>(
    chat_id: i64,
    mut rx: mpsc::Receiver<Incoming>,
    turn: Arc<Mutex<()>>,
    handler: Arc<H>,
    permits: Arc<Semaphore>,
    idle: Duration,
) {
    let _turn = turn.lock_owned().await;
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(incoming)) => handle_one(&*handler, &permits, incoming).await,
            Ok(None) => break,
            Err(_) => {
                // An update can still land between the timeout and the close;
                // it is drained here, before the turn passes to a successor.
                rx.close();
                while let Some(incoming) = rx.recv().await {
                    handle_one(&*handler, &permits, incoming).await;
                }
                break;
            }
        }
    }
    debug!("Worker for chat {} exited", chat_id);
}

async fn handle_one<H: UpdateHandler>(handler: &H, permits: &Semaphore, incoming: Incoming) {
    let Ok(_permit) = permits.acquire().await else {
        return;
    };
    handler.handle(incoming).await;
}
