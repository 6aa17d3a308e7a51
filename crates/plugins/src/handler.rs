//! Handler traits and the contexts passed to them.
//!
//! Handlers return `anyhow::Result`; the dispatch engine catches every
//! error at the module boundary, logs it and moves on to the next module.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    herald_channels::{DataStore, InboundMessage, Transport},
    herald_common::types::Receipt,
};

use crate::{
    lang::TextProducer,
    loader::LoadReport,
    registry::{CommandModule, Registry},
};

/// Behavior of a command plugin.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Called once after the module is built, before it becomes reachable.
    async fn on_load(&self, _ctx: &LoadContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called for every inbound event, like an event module.
    async fn on_message(&self, _ctx: &EventContext) -> Result<()> {
        Ok(())
    }

    /// Called when the command is invoked and has passed the access gate.
    async fn on_call(&self, ctx: &CommandContext) -> Result<()>;
}

/// Behavior of an event plugin.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_load(&self, _ctx: &LoadContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn on_message(&self, ctx: &EventContext) -> Result<()>;
}

/// Reloads plugins from disk; handed to commands so they can trigger it.
#[async_trait]
pub trait Reload: Send + Sync {
    async fn reload(&self) -> LoadReport;
}

/// Passed to `on_load`.
pub struct LoadContext<'a> {
    /// Name of the module being loaded.
    pub module: &'a str,
    /// Modules registered so far in this load pass.
    pub registry: &'a Registry,
    pub transport: &'a Arc<dyn Transport>,
}

/// Passed to `on_message` for every inbound event.
#[derive(Clone)]
pub struct EventContext {
    pub message: InboundMessage,
    pub registry: Arc<Registry>,
    pub data: Arc<dyn DataStore>,
    pub prefix: String,
    pub language: String,
}

impl EventContext {
    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.message.transport()
    }
}

/// Passed to `on_call`.
#[derive(Clone)]
pub struct CommandContext {
    pub message: InboundMessage,
    /// The module being invoked.
    pub module: Arc<CommandModule>,
    /// The token the user typed; an alias or an unknown word for fallbacks.
    pub invoked: String,
    pub args: Vec<String>,
    pub registry: Arc<Registry>,
    pub data: Arc<dyn DataStore>,
    pub reload: Arc<dyn Reload>,
    pub text: TextProducer,
    pub prefix: String,
    pub language: String,
}

impl CommandContext {
    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.message.transport()
    }

    /// Reply in the invoking thread, quoting the invoking message.
    pub async fn reply(&self, content: &str) -> herald_channels::Result<Receipt> {
        self.message.reply(content, None).await
    }
}
