//! In-memory transport and data store.
//!
//! No network and no persistence. Used by tests throughout the workspace
//! and by the CLI's console mode, which feeds stdin lines through
//! [`MemoryTransport::inject`].

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {
    async_trait::async_trait,
    tokio::sync::{broadcast, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use herald_common::types::{RawMessage, Receipt, ThreadInfo, UserProfile};

use crate::{DataStore, Error, Result, Subscription, ThreadRecord, Transport, UserRecord};

const STREAM_BUFFER: usize = 256;

/// A message recorded by [`MemoryTransport::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub content: String,
    pub thread_id: String,
    pub reply_to: Option<String>,
}

struct OpenStream {
    tx: mpsc::Sender<Result<RawMessage>>,
    cancel: CancellationToken,
}

/// Transport backed by in-process channels.
pub struct MemoryTransport {
    self_id: String,
    users: Mutex<HashMap<String, UserProfile>>,
    threads: Mutex<HashMap<String, ThreadInfo>>,
    streams: Mutex<Vec<OpenStream>>,
    opened: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<(String, String)>>,
    outbound: broadcast::Sender<SentMessage>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    fail_subscribe: AtomicBool,
}

impl MemoryTransport {
    pub fn new(self_id: impl Into<String>) -> Self {
        let (outbound, _) = broadcast::channel(STREAM_BUFFER);
        Self {
            self_id: self_id.into(),
            users: Mutex::new(HashMap::new()),
            threads: Mutex::new(HashMap::new()),
            streams: Mutex::new(Vec::new()),
            opened: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            outbound,
            next_id: AtomicU64::new(1),
            fail_sends: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
        }
    }

    pub fn add_user(&self, profile: UserProfile) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.insert(profile.id.clone(), profile);
    }

    pub fn add_thread(&self, info: ThreadInfo) {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads.insert(info.id.clone(), info);
    }

    /// Deliver `raw` to the open stream. Returns `false` when no stream is
    /// open or its buffer is full.
    pub fn inject(&self, raw: RawMessage) -> bool {
        self.push(Ok(raw))
    }

    /// Terminate the open stream with a connection error.
    pub fn fail_stream(&self, reason: &str) -> bool {
        self.push(Err(Error::connection(reason)))
    }

    fn push(&self, item: Result<RawMessage>) -> bool {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams
            .iter()
            .rev()
            .find(|s| !s.cancel.is_cancelled())
            .is_some_and(|s| s.tx.try_send(item).is_ok())
    }

    /// Number of streams opened and not yet released.
    pub fn active_subscriptions(&self) -> usize {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.iter().filter(|s| !s.cancel.is_cancelled()).count()
    }

    /// Total number of successful `subscribe` calls.
    pub fn subscriptions_opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `(reaction, message_id)` pairs in the order they were set.
    pub fn reactions(&self) -> Vec<(String, String)> {
        self.reactions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Receive every message sent from now on.
    pub fn watch_outbound(&self) -> broadcast::Receiver<SentMessage> {
        self.outbound.subscribe()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    fn receipt(&self, thread_id: &str) -> Receipt {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Receipt {
            message_id: format!("mem-{id}"),
            thread_id: thread_id.to_string(),
            timestamp: 0,
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    async fn subscribe(&self) -> Result<Subscription> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(Error::connection("subscribe refused"));
        }
        let (tx, cancel, subscription) = Subscription::channel(STREAM_BUFFER);
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.retain(|s| !s.cancel.is_cancelled());
        streams.push(OpenStream { tx, cancel });
        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(opened, "memory transport stream opened");
        Ok(subscription)
    }

    async fn send_message(
        &self,
        content: &str,
        thread_id: &str,
        reply_to: Option<&str>,
    ) -> Result<Receipt> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::transport("send_message", "send refused"));
        }
        let message = SentMessage {
            content: content.to_string(),
            thread_id: thread_id.to_string(),
            reply_to: reply_to.map(str::to_string),
        };
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        // Nobody listening is fine.
        let _ = self.outbound.send(message);
        Ok(self.receipt(thread_id))
    }

    async fn set_reaction(&self, reaction: &str, message_id: &str) -> Result<Receipt> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::transport("set_reaction", "reaction refused"));
        }
        self.reactions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((reaction.to_string(), message_id.to_string()));
        Ok(self.receipt(""))
    }

    async fn get_user_info(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn get_thread_info(&self, thread_id: &str) -> Result<ThreadInfo> {
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| Error::transport("get_thread_info", format!("unknown thread {thread_id}")))
    }
}

/// Data store backed by `HashMap`s.
#[derive(Default)]
pub struct MemoryDataStore {
    users: Mutex<HashMap<String, UserRecord>>,
    threads: Mutex<HashMap<String, ThreadRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_money(&self, user_id: &str, amount: i64) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord {
                id: user_id.to_string(),
                ..Default::default()
            })
            .money = amount;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn record_activity(&self, message: &RawMessage) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::unavailable("data store is read-only"));
        }
        {
            let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
            let user = users
                .entry(message.sender_id.clone())
                .or_insert_with(|| UserRecord {
                    id: message.sender_id.clone(),
                    ..Default::default()
                });
            user.message_count += 1;
            user.last_seen = message.timestamp;
        }
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        let thread = threads
            .entry(message.thread_id.clone())
            .or_insert_with(|| ThreadRecord {
                id: message.thread_id.clone(),
                ..Default::default()
            });
        thread.message_count += 1;
        thread.last_activity = message.timestamp;
        if !thread.member_ids.contains(&message.sender_id) {
            thread.member_ids.push(message.sender_id.clone());
        }
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(user_id).cloned())
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<ThreadRecord>> {
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        Ok(threads.get(thread_id).cloned())
    }

    async fn money(&self, user_id: &str) -> Result<i64> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(user_id).map_or(0, |u| u.money))
    }

    async fn count_users(&self) -> Result<u64> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.len() as u64)
    }

    async fn count_threads(&self) -> Result<u64> {
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        Ok(threads.len() as u64)
    }
}
