//! Startup and the main run loop.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Context,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use {
    herald_channels::{DataStore, Subscription, Transport, memory::MemoryDataStore},
    herald_config::{BootstrapConfig, HeraldConfig},
    herald_dispatch::{
        AccessPolicy, DispatchEngine, EngineConfig, InboundSink, Notices, StreamSupervisor,
    },
    herald_plugins::{BuiltinCatalog, PluginHost, PluginLoader},
};

use crate::console;

/// Bounded retry with exponential backoff for the initial connection.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.retry_delay(),
            max_backoff: Duration::from_secs(300),
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_backoff.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_backoff
        }
    }
}

/// Subscribe through `supervisor`, retrying per `policy`.
///
/// Returns `None` when `cancel` fires while waiting.
pub async fn connect_with_retry(
    supervisor: &StreamSupervisor,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> anyhow::Result<Option<Subscription>> {
    let mut attempt = 1;
    loop {
        match supervisor.connect().await {
            Ok(subscription) => return Ok(Some(subscription)),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(e)
                    .with_context(|| format!("failed to connect after {attempt} attempt(s)"));
            },
            Err(e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %e,
                    "connection failed, retrying"
                );
                tokio::select! {
                    () = cancel.cancelled() => return Ok(None),
                    () = tokio::time::sleep(delay) => {},
                }
                attempt += 1;
            },
        }
    }
}

pub fn plugin_loader(config: &HeraldConfig) -> PluginLoader {
    PluginLoader::new(
        &config.plugins.commands_dir,
        &config.plugins.events_dir,
        Arc::new(BuiltinCatalog::bundled()),
    )
    .with_language(&config.bot.language)
}

pub fn engine_config(config: &HeraldConfig) -> EngineConfig {
    let defaults = Notices::default();
    let notices = &config.notices;
    EngineConfig {
        prefix: config.bot.prefix.clone(),
        language: config.bot.language.clone(),
        policy: AccessPolicy {
            admins: config.bot.admins.clone(),
            nsfw_threads: config.bot.nsfw_threads.clone(),
        },
        notices: Notices {
            cooldown: notices.cooldown.clone().unwrap_or(defaults.cooldown),
            nsfw: notices.nsfw.clone().unwrap_or(defaults.nsfw),
            admin: notices.admin.clone().unwrap_or(defaults.admin),
        },
    }
}

/// Run the bot on the console transport until `cancel` fires.
pub async fn run(config: HeraldConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let memory = console::transport(&config.console);
    let transport: Arc<dyn Transport> = memory.clone();
    let data: Arc<dyn DataStore> = Arc::new(MemoryDataStore::new());

    let host = Arc::new(PluginHost::new(
        plugin_loader(&config),
        Arc::clone(&transport),
    ));
    let engine = Arc::new(DispatchEngine::new(
        engine_config(&config),
        Arc::clone(&host),
        Arc::clone(&transport),
        Arc::clone(&data),
    ));
    let sink: Arc<dyn InboundSink> = engine.clone();
    let supervisor = StreamSupervisor::new(
        Arc::clone(&transport),
        sink,
        config.stream.refresh_interval(),
    );

    let policy = RetryPolicy::from_config(&config.bootstrap);
    let Some(subscription) = connect_with_retry(&supervisor, &policy, &cancel).await? else {
        info!("shutdown requested before the stream connected");
        return Ok(());
    };
    info!(self_id = transport.self_id(), "connected");

    match (data.count_users().await, data.count_threads().await) {
        (Ok(users), Ok(threads)) => info!(users, threads, "data store ready"),
        (Err(e), _) | (_, Err(e)) => warn!(error = %e, "failed to count users and threads"),
    }

    let report = host.load().await;
    info!(summary = %report.summary(), "plugins loaded");

    #[cfg(feature = "file-watcher")]
    let _watcher = if config.plugins.watch {
        watch_plugins(&engine, &host, cancel.clone())
    } else {
        None
    };

    let input = console::spawn_input(
        Arc::clone(&memory),
        console::LineReader::new(&config.console),
        cancel.clone(),
    );
    let output = console::spawn_output(&memory, cancel.clone());

    supervisor.run(Some(subscription), cancel.clone()).await;

    cancel.cancel();
    // stdin reads cannot be interrupted; do not wait on the input task.
    input.abort();
    let _ = output.await;
    host.unload();
    Ok(())
}

#[cfg(feature = "file-watcher")]
fn watch_plugins(
    engine: &Arc<DispatchEngine>,
    host: &PluginHost,
    cancel: CancellationToken,
) -> Option<herald_plugins::watcher::PluginWatcher> {
    use herald_plugins::watcher::PluginWatcher;

    let dirs = host
        .loader()
        .dirs()
        .iter()
        .map(|dir| dir.to_path_buf())
        .collect();
    let (watcher, mut events) = match PluginWatcher::start(dirs) {
        Ok(started) => started,
        Err(e) => {
            warn!(error = %e, "plugin hot reload disabled");
            return None;
        },
    };

    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(_) => {
                        let report = engine.reload().await;
                        info!(summary = %report.summary(), "plugins reloaded after change");
                    },
                    None => break,
                },
            }
        }
    });
    Some(watcher)
}
