//! Payloads exchanged with the chat transport.
//!
//! These are plain data: the transport fills them in, the dispatch engine
//! reads them. Nothing here talks to the network.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an inbound event as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    MessageReply,
    MessageReaction,
    MessageUnsend,
    /// Thread-level events: members joining or leaving, renames, etc.
    Event,
    Typing,
    Presence,
    #[serde(other)]
    Other,
}

impl MessageKind {
    /// Conversational kinds carry a body and can be replied to or reacted on.
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::Message | Self::MessageReply)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Message => "message",
            Self::MessageReply => "message_reply",
            Self::MessageReaction => "message_reaction",
            Self::MessageUnsend => "message_unsend",
            Self::Event => "event",
            Self::Typing => "typing",
            Self::Presence => "presence",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// An inbound event exactly as the transport delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub kind: MessageKind,
    pub sender_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub body: String,
    pub message_id: String,
    /// For `message_reply`: the message being replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    /// Unix timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// Acknowledgment returned by the transport for a send or reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub message_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Public profile of a chat user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vanity: Option<String>,
    #[serde(default)]
    pub is_friend: bool,
}

/// Metadata about a conversation thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub admin_ids: Vec<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}
