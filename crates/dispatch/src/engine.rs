//! The per-message pipeline.
//!
//! For every inbound event: enrich, record activity, fan out to every
//! module's `on_message`, then resolve the body to a command and run it
//! through the cooldown ledger and the access gate.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tokio::time::Instant,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, dispatch as dispatch_metrics, histogram, labels};

use {
    herald_channels::{DataStore, InboundMessage, Transport},
    herald_common::types::RawMessage,
    herald_plugins::{
        CommandContext, CommandModule, EventContext, LoadReport, PluginHost, Registry, Reload,
        TextProducer,
    },
};

use crate::{
    cooldown::{CooldownDecision, CooldownLedger},
    gate::{AccessDenied, AccessPolicy, Notices},
    resolve::{self, Invocation, Resolution},
    supervisor::InboundSink,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub prefix: String,
    /// Language code used to pick plugin text.
    pub language: String,
    pub policy: AccessPolicy,
    pub notices: Notices,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            language: "en".into(),
            policy: AccessPolicy::default(),
            notices: Notices::default(),
        }
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No command was run: empty body or nothing matched.
    Ignored,
    /// `on_call` returned successfully.
    Executed { command: String },
    /// `on_call` returned an error, which was logged.
    Failed { command: String },
    /// Stopped by a cooldown; `notified` is true if a notice was sent.
    Throttled { command: String, notified: bool },
    Denied {
        command: String,
        reason: AccessDenied,
    },
}

/// Reloads plugins and forgets every cooldown.
pub struct Reloader {
    host: Arc<PluginHost>,
    cooldowns: Arc<CooldownLedger>,
}

#[async_trait]
impl Reload for Reloader {
    async fn reload(&self) -> LoadReport {
        let report = self.host.reload().await;
        self.cooldowns.clear();
        report
    }
}

pub struct DispatchEngine {
    config: EngineConfig,
    host: Arc<PluginHost>,
    transport: Arc<dyn Transport>,
    data: Arc<dyn DataStore>,
    cooldowns: Arc<CooldownLedger>,
    reloader: Arc<Reloader>,
}

impl DispatchEngine {
    pub fn new(
        config: EngineConfig,
        host: Arc<PluginHost>,
        transport: Arc<dyn Transport>,
        data: Arc<dyn DataStore>,
    ) -> Self {
        let cooldowns = Arc::new(CooldownLedger::new());
        let reloader = Arc::new(Reloader {
            host: Arc::clone(&host),
            cooldowns: Arc::clone(&cooldowns),
        });
        Self {
            config,
            host,
            transport,
            data,
            cooldowns,
            reloader,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<PluginHost> {
        &self.host
    }

    pub fn cooldowns(&self) -> &CooldownLedger {
        &self.cooldowns
    }

    /// Reload every plugin and clear all cooldowns.
    pub async fn reload(&self) -> LoadReport {
        self.reloader.reload().await
    }

    /// Run one inbound event through the whole pipeline.
    pub async fn dispatch(&self, raw: RawMessage) -> Outcome {
        #[cfg(feature = "metrics")]
        counter!(dispatch_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        let message = InboundMessage::enrich(raw, Arc::clone(&self.transport)).await;
        if let Err(e) = self.data.record_activity(&message.raw).await {
            warn!(
                sender_id = message.sender_id(),
                thread_id = message.thread_id(),
                error = %e,
                "failed to record activity"
            );
        }

        // One snapshot for the whole message, even if a reload lands midway.
        let registry = self.host.registry();
        self.fan_out(&registry, &message).await;

        if message.body().is_empty() {
            return Outcome::Ignored;
        }
        let Some(invocation) = resolve::parse(message.body(), &self.config.prefix) else {
            return Outcome::Ignored;
        };

        match resolve::resolve(&registry, &invocation) {
            Resolution::Command(module) => self.invoke(registry, module, invocation, message).await,
            Resolution::Fallback(module) => {
                debug!(invoked = %invocation.command, fallback = %module.name, "no such command, using fallback");
                #[cfg(feature = "metrics")]
                counter!(dispatch_metrics::FALLBACK_TOTAL).increment(1);
                self.execute(registry, module, invocation, message).await
            },
            Resolution::NotFound => Outcome::Ignored,
            Resolution::PrefixRequired => {
                debug!(command = %invocation.command, "command needs the prefix, ignoring");
                Outcome::Ignored
            },
        }
    }

    async fn fan_out(&self, registry: &Arc<Registry>, message: &InboundMessage) {
        let ctx = EventContext {
            message: message.clone(),
            registry: Arc::clone(registry),
            data: Arc::clone(&self.data),
            prefix: self.config.prefix.clone(),
            language: self.config.language.clone(),
        };

        for module in registry.commands() {
            if let Err(e) = module.handler.on_message(&ctx).await {
                handler_failed(&module.name, "on_message", &e);
            }
        }
        for module in registry.events() {
            if let Err(e) = module.handler.on_message(&ctx).await {
                handler_failed(&module.name, "on_message", &e);
            }
        }
    }

    async fn invoke(
        &self,
        registry: Arc<Registry>,
        module: Arc<CommandModule>,
        invocation: Invocation,
        message: InboundMessage,
    ) -> Outcome {
        if let Some(wait) = module.wait.filter(|wait| !wait.is_zero()) {
            match self.cooldowns.check(message.sender_id(), &module.name, wait) {
                CooldownDecision::Proceed => {},
                CooldownDecision::Wait { remaining, notify } => {
                    debug!(
                        command = %module.name,
                        sender_id = message.sender_id(),
                        remaining_ms = remaining.as_millis() as u64,
                        notify,
                        "command on cooldown"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(dispatch_metrics::THROTTLED_TOTAL, labels::COMMAND => module.name.clone())
                        .increment(1);
                    if notify {
                        let text = self.config.notices.cooldown(&module.name, remaining);
                        self.notify(&message, &text).await;
                    }
                    return Outcome::Throttled {
                        command: module.name.clone(),
                        notified: notify,
                    };
                },
            }
        }

        if let Err(reason) =
            self.config
                .policy
                .check(&module, message.sender_id(), message.thread_id())
        {
            info!(
                command = %module.name,
                sender_id = message.sender_id(),
                thread_id = message.thread_id(),
                %reason,
                "command refused"
            );
            #[cfg(feature = "metrics")]
            counter!(dispatch_metrics::ACCESS_DENIED_TOTAL, labels::REASON => reason.as_str())
                .increment(1);
            let text = self.config.notices.denied(&module.name, reason);
            self.notify(&message, &text).await;
            return Outcome::Denied {
                command: module.name.clone(),
                reason,
            };
        }

        self.execute(registry, module, invocation, message).await
    }

    async fn execute(
        &self,
        registry: Arc<Registry>,
        module: Arc<CommandModule>,
        invocation: Invocation,
        message: InboundMessage,
    ) -> Outcome {
        let command = module.name.clone();
        let ctx = CommandContext {
            message,
            text: TextProducer::new(&module.lang, &self.config.language),
            module: Arc::clone(&module),
            invoked: invocation.command,
            args: invocation.args,
            registry,
            data: Arc::clone(&self.data),
            reload: self.reloader.clone(),
            prefix: self.config.prefix.clone(),
            language: self.config.language.clone(),
        };

        debug!(command = %command, invoked = %ctx.invoked, args = ctx.args.len(), "running command");
        let started = Instant::now();
        let result = module.handler.on_call(&ctx).await;
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        {
            histogram!(dispatch_metrics::COMMAND_DURATION_SECONDS, labels::COMMAND => command.clone())
                .record(elapsed.as_secs_f64());
            counter!(dispatch_metrics::COMMANDS_EXECUTED_TOTAL, labels::COMMAND => command.clone())
                .increment(1);
        }

        match result {
            Ok(()) => {
                debug!(command = %command, elapsed_ms = elapsed.as_millis() as u64, "command finished");
                Outcome::Executed { command }
            },
            Err(e) => {
                handler_failed(&command, "on_call", &e);
                Outcome::Failed { command }
            },
        }
    }

    /// Policy and cooldown notices go to the thread without quoting the trigger.
    async fn notify(&self, message: &InboundMessage, text: &str) {
        if let Err(e) = message.send(text, message.thread_id()).await {
            warn!(thread_id = message.thread_id(), error = %e, "failed to send notice");
        }
    }
}

fn handler_failed(module: &str, hook: &'static str, error: &anyhow::Error) {
    error!(module, hook, error = %format!("{error:#}"), "plugin handler failed");
    #[cfg(feature = "metrics")]
    counter!(dispatch_metrics::HANDLER_ERRORS_TOTAL, labels::MODULE => module.to_string())
        .increment(1);
}

#[async_trait]
impl InboundSink for DispatchEngine {
    async fn handle(&self, raw: RawMessage) {
        let message_id = raw.message_id.clone();
        let outcome = self.dispatch(raw).await;
        debug!(message_id, ?outcome, "event dispatched");
    }
}
