//! Building registries from the plugin directories.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, plugins as plugin_metrics};

use herald_channels::Transport;

use crate::{
    Error, Result,
    builtin::BuiltinCatalog,
    discovery,
    handler::LoadContext,
    lang::TextProducer,
    manifest::{HandlerSource, PluginDescriptor},
    registry::{CommandModule, EventModule, Registry},
    shell::{ShellCommandHandler, ShellEventHandler, ShellRunner},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Command,
    Event,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Event => f.write_str("event"),
        }
    }
}

/// Outcome of a load pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Names of the command modules loaded, in load order.
    pub commands: Vec<String>,
    /// Names of the event modules loaded, in load order.
    pub events: Vec<String>,
    /// Manifests that were skipped.
    pub errors: Vec<Error>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} commands, {} events, {} errors",
            self.commands.len(),
            self.events.len(),
            self.errors.len()
        )
    }

    fn reject(&mut self, kind: PluginKind, error: Error) {
        warn!(%kind, error = %error, "skipping plugin");
        #[cfg(feature = "metrics")]
        counter!(plugin_metrics::LOAD_ERRORS_TOTAL).increment(1);
        self.errors.push(error);
    }
}

enum Built {
    Command(CommandModule),
    Event(EventModule),
}

/// Turns manifests into modules.
pub struct PluginLoader {
    commands_dir: PathBuf,
    events_dir: PathBuf,
    catalog: Arc<BuiltinCatalog>,
    language: String,
}

impl PluginLoader {
    pub fn new(
        commands_dir: impl Into<PathBuf>,
        events_dir: impl Into<PathBuf>,
        catalog: Arc<BuiltinCatalog>,
    ) -> Self {
        Self {
            commands_dir: commands_dir.into(),
            events_dir: events_dir.into(),
            catalog,
            language: "en".into(),
        }
    }

    /// Language used for the text table handed to shell event plugins.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn dir(&self, kind: PluginKind) -> &Path {
        match kind {
            PluginKind::Command => &self.commands_dir,
            PluginKind::Event => &self.events_dir,
        }
    }

    pub fn dirs(&self) -> [&Path; 2] {
        [&self.commands_dir, &self.events_dir]
    }

    /// Load both directories into a fresh registry, running every module's
    /// `on_load`.
    pub async fn load_all(&self, transport: &Arc<dyn Transport>) -> (Registry, LoadReport) {
        let mut registry = Registry::new();
        let mut report = LoadReport::default();
        self.load(PluginKind::Command, &mut registry, transport, &mut report)
            .await;
        self.load(PluginKind::Event, &mut registry, transport, &mut report)
            .await;
        info!(summary = %report.summary(), "plugins loaded");
        (registry, report)
    }

    /// Load one directory into `registry`.
    ///
    /// A module whose `on_load` fails is reported and left out.
    pub async fn load(
        &self,
        kind: PluginKind,
        registry: &mut Registry,
        transport: &Arc<dyn Transport>,
        report: &mut LoadReport,
    ) {
        for descriptor in discovery::scan(self.dir(kind)) {
            let built = match descriptor.and_then(|d| self.build(kind, &d)) {
                Ok(built) => built,
                Err(e) => {
                    report.reject(kind, e);
                    continue;
                },
            };

            match built {
                Built::Command(module) => {
                    let ctx = LoadContext {
                        module: &module.name,
                        registry,
                        transport,
                    };
                    if let Err(e) = module.handler.on_load(&ctx).await {
                        report.reject(kind, on_load_error(&module.name, &e));
                        continue;
                    }
                    debug!(name = %module.name, origin = %module.origin, "loaded command");
                    report.commands.push(module.name.clone());
                    registry.register_command(module);
                },
                Built::Event(module) => {
                    let ctx = LoadContext {
                        module: &module.name,
                        registry,
                        transport,
                    };
                    if let Err(e) = module.handler.on_load(&ctx).await {
                        report.reject(kind, on_load_error(&module.name, &e));
                        continue;
                    }
                    debug!(name = %module.name, origin = %module.origin, "loaded event");
                    report.events.push(module.name.clone());
                    registry.register_event(module);
                },
            }
        }
    }

    /// Parse and bind every manifest without running `on_load`.
    ///
    /// Used to validate a plugin tree before connecting.
    pub fn inspect(&self) -> (Registry, LoadReport) {
        let mut registry = Registry::new();
        let mut report = LoadReport::default();
        for kind in [PluginKind::Command, PluginKind::Event] {
            for descriptor in discovery::scan(self.dir(kind)) {
                match descriptor.and_then(|d| self.build(kind, &d)) {
                    Ok(Built::Command(module)) => {
                        report.commands.push(module.name.clone());
                        registry.register_command(module);
                    },
                    Ok(Built::Event(module)) => {
                        report.events.push(module.name.clone());
                        registry.register_event(module);
                    },
                    Err(e) => report.reject(kind, e),
                }
            }
        }
        (registry, report)
    }

    fn build(&self, kind: PluginKind, desc: &PluginDescriptor) -> Result<Built> {
        let unknown = |builtin: &str| Error::UnknownBuiltin {
            path: desc.path.clone(),
            builtin: builtin.to_string(),
        };

        match (kind, &desc.source) {
            (PluginKind::Command, HandlerSource::Builtin(name)) => {
                let handler = self.catalog.command(name).ok_or_else(|| unknown(name))?;
                Ok(Built::Command(CommandModule::from_descriptor(desc, handler)))
            },
            (PluginKind::Event, HandlerSource::Builtin(name)) => {
                let handler = self.catalog.event(name).ok_or_else(|| unknown(name))?;
                Ok(Built::Event(EventModule::from_descriptor(desc, handler)))
            },
            (PluginKind::Command, HandlerSource::Shell { .. }) => {
                let handler = Arc::new(ShellCommandHandler::new(shell_runner(desc)));
                Ok(Built::Command(CommandModule::from_descriptor(desc, handler)))
            },
            (PluginKind::Event, HandlerSource::Shell { .. }) => {
                let text = TextProducer::new(&desc.manifest.lang, &self.language);
                let handler = Arc::new(ShellEventHandler::new(shell_runner(desc), text));
                Ok(Built::Event(EventModule::from_descriptor(desc, handler)))
            },
        }
    }
}

fn shell_runner(desc: &PluginDescriptor) -> ShellRunner {
    let (command, timeout, env) = match &desc.source {
        HandlerSource::Shell {
            command,
            timeout,
            env,
        } => (command.clone(), *timeout, env.clone()),
        HandlerSource::Builtin(_) => Default::default(),
    };
    ShellRunner::new(desc.name(), command, desc.working_dir(), timeout, env)
}

fn on_load_error(name: &str, error: &anyhow::Error) -> Error {
    Error::OnLoad {
        name: name.to_string(),
        reason: format!("{error:#}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        super::*,
        crate::handler::{CommandContext, CommandHandler},
        async_trait::async_trait,
        herald_channels::memory::MemoryTransport,
    };

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(file), content).unwrap();
    }

    fn transport() -> Arc<dyn Transport> {
        Arc::new(MemoryTransport::new("bot"))
    }

    fn loader(root: &Path, catalog: BuiltinCatalog) -> PluginLoader {
        PluginLoader::new(root.join("commands"), root.join("events"), Arc::new(catalog))
    }

    #[tokio::test]
    async fn loads_commands_and_events() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        write(&commands, "ping.toml", "name = \"ping\"\nalias = [\"P\"]\nbuiltin = \"ping\"");
        write(&commands, "weather.toml", "name = \"weather\"\ncommand = \"echo sunny\"");
        write(
            &commands,
            "unknown.toml",
            "name = \"unknown\"\nfallback = true\nbuiltin = \"unknown\"",
        );
        write(
            &tmp.path().join("events"),
            "log.toml",
            "name = \"logger\"\nbuiltin = \"message-logger\"",
        );

        let (registry, report) = loader(tmp.path(), BuiltinCatalog::bundled())
            .load_all(&transport())
            .await;

        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(report.commands, vec!["ping", "unknown", "weather"]);
        assert_eq!(report.events, vec!["logger"]);
        assert_eq!(registry.command("p").unwrap().name, "ping");
        assert_eq!(registry.fallback().unwrap().name, "unknown");
        assert!(registry.event("logger").is_some());
    }

    #[tokio::test]
    async fn bad_manifests_are_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        write(&commands, "a.toml", "alias = [\"x\"]\nbuiltin = \"ping\"");
        write(&commands, "b.toml", "name = \"b\"\nbuiltin = \"does-not-exist\"");
        write(&commands, "c.toml", "name = \"c\"\nbuiltin = \"ping\"");
        // A command builtin is not an event builtin.
        write(&tmp.path().join("events"), "d.toml", "name = \"d\"\nbuiltin = \"ping\"");

        let (registry, report) = loader(tmp.path(), BuiltinCatalog::bundled())
            .load_all(&transport())
            .await;

        assert_eq!(report.commands, vec!["c"]);
        assert!(report.events.is_empty());
        assert_eq!(report.errors.len(), 3);
        assert!(matches!(report.errors[0], Error::MissingName { .. }));
        assert!(matches!(report.errors[1], Error::UnknownBuiltin { ref builtin, .. } if builtin == "does-not-exist"));
        assert!(matches!(report.errors[2], Error::UnknownBuiltin { .. }));
        assert!(registry.command("x").is_none());
        assert!(registry.command("c").is_some());
    }

    #[tokio::test]
    async fn out_of_range_wait_is_a_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        write(&commands, "a.toml", "name = \"slow\"\nbuiltin = \"ping\"\nwait = 1e20");
        write(&commands, "b.toml", "name = \"ok\"\nbuiltin = \"ping\"\nwait = 2");

        let (registry, report) = loader(tmp.path(), BuiltinCatalog::bundled())
            .load_all(&transport())
            .await;

        assert_eq!(report.commands, vec!["ok"]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], Error::InvalidManifest { .. }));
        assert!(registry.command("slow").is_none());
        assert_eq!(
            registry.command("ok").unwrap().wait,
            Some(std::time::Duration::from_secs(2))
        );
    }

    struct Counting {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl CommandHandler for Counting {
        async fn on_load(&self, ctx: &LoadContext<'_>) -> anyhow::Result<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("{} is misconfigured", ctx.module);
            }
            Ok(())
        }

        async fn on_call(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn on_load_runs_once_per_module_and_failures_skip_it() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        write(&commands, "good.toml", "name = \"good\"\nbuiltin = \"counting\"");
        write(&commands, "bad.toml", "name = \"bad\"\nbuiltin = \"failing\"");

        let loads = Arc::new(AtomicUsize::new(0));
        let mut catalog = BuiltinCatalog::new();
        let counter = Arc::clone(&loads);
        catalog.register_command("counting", move || {
            Arc::new(Counting {
                loads: Arc::clone(&counter),
                fail: false,
            })
        });
        let counter = Arc::clone(&loads);
        catalog.register_command("failing", move || {
            Arc::new(Counting {
                loads: Arc::clone(&counter),
                fail: true,
            })
        });

        let (registry, report) = loader(tmp.path(), catalog).load_all(&transport()).await;

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(report.commands, vec!["good"]);
        assert!(registry.command("bad").is_none());
        let err = report.errors[0].to_string();
        assert!(err.contains("bad is misconfigured"), "{err}");
    }

    #[test]
    fn inspect_binds_without_running_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("commands"),
            "help.toml",
            "name = \"help\"\nalias = [\"h\"]\nbuiltin = \"help\"",
        );

        let (registry, report) = loader(tmp.path(), BuiltinCatalog::bundled()).inspect();
        assert!(report.is_clean());
        assert_eq!(registry.command("h").unwrap().name, "help");
        assert_eq!(report.summary(), "1 commands, 0 events, 0 errors");
    }
}
