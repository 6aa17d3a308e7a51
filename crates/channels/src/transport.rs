use std::collections::HashMap;

use {
    async_trait::async_trait,
    tokio::sync::mpsc::{self, error::TryRecvError},
    tokio_util::sync::CancellationToken,
};

use herald_common::types::{RawMessage, Receipt, ThreadInfo, UserProfile};

use crate::Result;

/// A live chat-backend session.
///
/// Implementations own login and the wire protocol; the dispatch engine
/// only sees these calls. Every call is fallible and callers are expected
/// to log and carry on rather than tear the session down.
#[async_trait]
pub trait Transport: Send + Sync {
    /// ID of the account this session is logged in as.
    fn self_id(&self) -> &str;

    /// Open the inbound event stream.
    async fn subscribe(&self) -> Result<Subscription>;

    /// Send `content` to `thread_id`, optionally quoting `reply_to`.
    async fn send_message(
        &self,
        content: &str,
        thread_id: &str,
        reply_to: Option<&str>,
    ) -> Result<Receipt>;

    /// React to `message_id` with `reaction` (an emoji, or empty to clear).
    async fn set_reaction(&self, reaction: &str, message_id: &str) -> Result<Receipt>;

    /// Look up profiles. Unknown IDs are omitted from the map.
    async fn get_user_info(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>>;

    async fn get_thread_info(&self, thread_id: &str) -> Result<ThreadInfo>;
}

/// Handle to one open event stream.
///
/// The transport feeds events into the channel until the token is
/// cancelled. Dropping the handle stops the stream.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<Result<RawMessage>>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<Result<RawMessage>>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Build a subscription together with the sending half the transport
    /// writes into.
    pub fn channel(
        buffer: usize,
    ) -> (mpsc::Sender<Result<RawMessage>>, CancellationToken, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        let cancel = CancellationToken::new();
        (tx, cancel.clone(), Self::new(rx, cancel))
    }

    /// Wait for the next event. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<RawMessage>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.events.recv().await
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Release the stream. No new events are accepted after this returns.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.events.close();
    }

    /// Stop the stream and return the events that were already buffered.
    ///
    /// Errors still in the buffer are dropped; the stream is gone either way.
    pub fn stop_and_drain(&mut self) -> Vec<RawMessage> {
        self.stop();
        let mut pending = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(Ok(raw)) => pending.push(raw),
                Ok(Err(_)) => {},
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        pending
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
