use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use herald_common::types::{MessageKind, RawMessage, Receipt, ThreadInfo, UserProfile};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, transport as transport_metrics};

use crate::{Error, Result, Transport};

/// An inbound event as handed to plugins.
///
/// Conversational events (`message`, `message_reply`) carry the resolved
/// sender profile and thread info and can be replied to or reacted on.
/// Other kinds are passed through bare; their helpers return
/// [`Error::Unavailable`].
#[derive(Clone)]
pub struct InboundMessage {
    pub raw: RawMessage,
    pub sender: Option<UserProfile>,
    pub thread: Option<ThreadInfo>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("raw", &self.raw)
            .field("sender", &self.sender)
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}

impl InboundMessage {
    /// Wrap a raw event without any metadata lookups.
    pub fn bare(raw: RawMessage, transport: Arc<dyn Transport>) -> Self {
        Self {
            raw,
            sender: None,
            thread: None,
            transport,
        }
    }

    /// Wrap a raw event, resolving sender and thread metadata for
    /// conversational kinds.
    ///
    /// Lookup failures are logged and leave the field empty; a flaky
    /// profile endpoint must not stop the message from being dispatched.
    pub async fn enrich(raw: RawMessage, transport: Arc<dyn Transport>) -> Self {
        let mut message = Self::bare(raw, transport);
        if !message.is_conversational() {
            return message;
        }

        let sender_id = message.raw.sender_id.clone();
        match message
            .transport
            .get_user_info(std::slice::from_ref(&sender_id))
            .await
        {
            Ok(mut profiles) => message.sender = profiles.remove(&sender_id),
            Err(e) => warn!(sender_id, error = %e, "failed to resolve sender profile"),
        }

        match message
            .transport
            .get_thread_info(&message.raw.thread_id)
            .await
        {
            Ok(info) => message.thread = Some(info),
            Err(e) => {
                warn!(thread_id = %message.raw.thread_id, error = %e, "failed to resolve thread info")
            },
        }

        debug!(
            message_id = %message.raw.message_id,
            has_sender = message.sender.is_some(),
            has_thread = message.thread.is_some(),
            "enriched inbound message"
        );
        message
    }

    pub fn kind(&self) -> MessageKind {
        self.raw.kind
    }

    pub fn is_conversational(&self) -> bool {
        self.raw.kind.is_conversational()
    }

    pub fn body(&self) -> &str {
        &self.raw.body
    }

    pub fn sender_id(&self) -> &str {
        &self.raw.sender_id
    }

    pub fn thread_id(&self) -> &str {
        &self.raw.thread_id
    }

    pub fn message_id(&self) -> &str {
        &self.raw.message_id
    }

    /// Display name of the sender, falling back to the raw ID.
    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.raw.sender_id)
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// React to this message.
    pub async fn react(&self, reaction: &str) -> Result<Receipt> {
        self.ensure_conversational("react")?;
        let result = self
            .transport
            .set_reaction(reaction, &self.raw.message_id)
            .await;
        record_outcome(&result);
        result
    }

    /// Reply to this message, in its own thread unless `target` names
    /// another one.
    pub async fn reply(&self, content: &str, target: Option<&str>) -> Result<Receipt> {
        self.ensure_conversational("reply")?;
        let thread_id = target.unwrap_or(&self.raw.thread_id);
        let result = self
            .transport
            .send_message(content, thread_id, Some(&self.raw.message_id))
            .await;
        record_outcome(&result);
        result
    }

    /// Send a fresh (non-quoting) message to `target`.
    pub async fn send(&self, content: &str, target: &str) -> Result<Receipt> {
        self.ensure_conversational("send")?;
        let result = self.transport.send_message(content, target, None).await;
        record_outcome(&result);
        result
    }

    fn ensure_conversational(&self, operation: &str) -> Result<()> {
        if self.is_conversational() {
            Ok(())
        } else {
            Err(Error::unavailable(format!(
                "cannot {operation} on a {} event",
                self.raw.kind
            )))
        }
    }
}

fn record_outcome(result: &Result<Receipt>) {
    #[cfg(feature = "metrics")]
    {
        let name = match result {
            Ok(_) => transport_metrics::CALLS_TOTAL,
            Err(_) => transport_metrics::ERRORS_TOTAL,
        };
        counter!(name).increment(1);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = result;
}
