//! Fixtures shared by this crate's unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use {
    herald_channels::{
        InboundMessage, Transport,
        memory::{MemoryDataStore, MemoryTransport},
    },
    herald_common::types::{MessageKind, RawMessage, UserProfile},
};

use crate::{
    handler::{CommandContext, EventContext, Reload},
    lang::TextProducer,
    loader::LoadReport,
    registry::Registry,
};

#[derive(Default)]
pub(crate) struct StubReload {
    pub calls: AtomicUsize,
}

impl StubReload {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reload for StubReload {
    async fn reload(&self) -> LoadReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LoadReport {
            commands: vec!["help".into(), "ping".into()],
            events: vec!["message-logger".into()],
            errors: Vec::new(),
        }
    }
}

pub(crate) fn raw(body: &str) -> RawMessage {
    RawMessage {
        kind: MessageKind::Message,
        sender_id: "100".into(),
        thread_id: "t1".into(),
        body: body.into(),
        message_id: "m1".into(),
        reply_to: None,
        is_group: true,
        timestamp: 0,
    }
}

pub(crate) struct Fixture {
    pub transport: Arc<MemoryTransport>,
    pub data: Arc<MemoryDataStore>,
    pub reload: Arc<StubReload>,
    pub registry: Arc<Registry>,
}

impl Fixture {
    pub fn new(registry: Registry) -> Self {
        let transport = Arc::new(MemoryTransport::new("bot"));
        transport.add_user(UserProfile {
            id: "100".into(),
            name: "Alice".into(),
            ..Default::default()
        });
        Self {
            transport,
            data: Arc::new(MemoryDataStore::new()),
            reload: Arc::new(StubReload::default()),
            registry: Arc::new(registry),
        }
    }

    fn message(&self, body: &str) -> InboundMessage {
        let transport: Arc<dyn Transport> = self.transport.clone();
        let mut message = InboundMessage::bare(raw(body), transport);
        message.sender = Some(UserProfile {
            id: "100".into(),
            name: "Alice".into(),
            ..Default::default()
        });
        message
    }

    /// Context for invoking the registered command `key` as `invoked`.
    pub fn command_ctx(&self, key: &str, invoked: &str, args: &[&str]) -> CommandContext {
        let module = self
            .registry
            .command(key)
            .cloned()
            .unwrap_or_else(|| panic!("command {key} not registered"));
        let text = TextProducer::new(&module.lang, "en");
        let mut body = format!("!{invoked}");
        for arg in args {
            body.push(' ');
            body.push_str(arg);
        }
        CommandContext {
            message: self.message(&body),
            module,
            invoked: invoked.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            registry: Arc::clone(&self.registry),
            data: self.data.clone(),
            reload: self.reload.clone(),
            text,
            prefix: "!".into(),
            language: "en".into(),
        }
    }

    pub fn event_ctx(&self, body: &str) -> EventContext {
        EventContext {
            message: self.message(body),
            registry: Arc::clone(&self.registry),
            data: self.data.clone(),
            prefix: "!".into(),
            language: "en".into(),
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.transport.sent().into_iter().map(|m| m.content).collect()
    }
}
