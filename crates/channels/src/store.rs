use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use herald_common::types::RawMessage;

use crate::Result;

/// Durable record of a user the bot has seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub money: i64,
    /// Unix timestamp (ms) of the last recorded activity.
    #[serde(default)]
    pub last_seen: i64,
}

/// Durable record of a thread the bot participates in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    #[serde(default)]
    pub message_count: u64,
    /// Users observed posting in the thread.
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub last_activity: i64,
}

/// Persistent user/thread/economy storage.
///
/// Owned by the deployment, not by the dispatch engine; every call is I/O
/// and may fail.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Update presence data for the sender and thread of `message`.
    async fn record_activity(&self, message: &RawMessage) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;
    async fn get_thread(&self, thread_id: &str) -> Result<Option<ThreadRecord>>;
    /// Current balance of `user_id`; unknown users have zero.
    async fn money(&self, user_id: &str) -> Result<i64>;
    async fn count_users(&self) -> Result<u64>;
    async fn count_threads(&self) -> Result<u64>;
}
