//! `message-logger`: traces every inbound event.

use std::sync::atomic::{AtomicU64, Ordering};

use {anyhow::Result, async_trait::async_trait, tracing::debug};

use crate::handler::{EventContext, EventHandler, LoadContext};

#[derive(Default)]
pub struct MessageLogger {
    seen: AtomicU64,
}

impl MessageLogger {
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for MessageLogger {
    async fn on_load(&self, ctx: &LoadContext<'_>) -> Result<()> {
        debug!(
            module = ctx.module,
            self_id = ctx.transport.self_id(),
            "message logger ready"
        );
        Ok(())
    }

    async fn on_message(&self, ctx: &EventContext) -> Result<()> {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        let message = &ctx.message;
        debug!(
            seen,
            kind = %message.kind(),
            sender = message.sender_name(),
            thread_id = message.thread_id(),
            body_len = message.body().len(),
            "inbound event"
        );
        Ok(())
    }
}
