//! Owner of the live registry.
//!
//! Dispatch takes a snapshot with [`PluginHost::registry`] and keeps using
//! it for the whole message, so a concurrent reload never exposes a
//! half-built registry.

use std::sync::{Arc, RwLock};

use {tokio::sync::Mutex, tracing::info};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, gauge, plugins as plugin_metrics};

use herald_channels::Transport;

use crate::{
    loader::{LoadReport, PluginLoader},
    registry::Registry,
};

pub struct PluginHost {
    loader: PluginLoader,
    transport: Arc<dyn Transport>,
    current: RwLock<Arc<Registry>>,
    /// Serializes load passes so two reloads never interleave.
    loading: Mutex<()>,
}

impl PluginHost {
    /// A host with an empty registry. Call [`load`](Self::load) to populate it.
    pub fn new(loader: PluginLoader, transport: Arc<dyn Transport>) -> Self {
        Self {
            loader,
            transport,
            current: RwLock::new(Arc::new(Registry::new())),
            loading: Mutex::new(()),
        }
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// The registry currently installed.
    pub fn registry(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the live registry, returning the previous one.
    pub fn install(&self, registry: Registry) -> Arc<Registry> {
        let registry = Arc::new(registry);
        #[cfg(feature = "metrics")]
        {
            gauge!(plugin_metrics::COMMANDS_LOADED).set(registry.commands().len() as f64);
            gauge!(plugin_metrics::EVENTS_LOADED).set(registry.events().len() as f64);
        }
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, registry)
    }

    /// Drop every loaded module.
    pub fn unload(&self) {
        let previous = self.install(Registry::new());
        info!(
            commands = previous.commands().len(),
            events = previous.events().len(),
            "plugins unloaded"
        );
    }

    /// Read both plugin directories and install the result.
    pub async fn load(&self) -> LoadReport {
        let _guard = self.loading.lock().await;
        let (registry, report) = self.loader.load_all(&self.transport).await;
        self.install(registry);
        report
    }

    /// Re-read every plugin from disk.
    ///
    /// The replacement registry is built in full before it is installed;
    /// until then dispatch keeps seeing the old one.
    pub async fn reload(&self) -> LoadReport {
        let report = self.load().await;
        info!(summary = %report.summary(), "plugins reloaded");
        #[cfg(feature = "metrics")]
        counter!(plugin_metrics::RELOADS_TOTAL).increment(1);
        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::path::Path;

    use {super::*, crate::builtin::BuiltinCatalog, herald_channels::memory::MemoryTransport};

    fn host(root: &Path) -> PluginHost {
        let loader = PluginLoader::new(
            root.join("commands"),
            root.join("events"),
            Arc::new(BuiltinCatalog::bundled()),
        );
        PluginHost::new(loader, Arc::new(MemoryTransport::new("bot")))
    }

    fn write_ping(root: &Path, alias: &str) {
        let dir = root.join("commands");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("ping.toml"),
            format!("name = \"ping\"\nalias = [\"{alias}\"]\nbuiltin = \"ping\""),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn starts_empty_and_loads_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        write_ping(tmp.path(), "p");
        let host = host(tmp.path());
        assert!(host.registry().is_empty());

        let report = host.load().await;
        assert_eq!(report.commands, vec!["ping"]);
        assert!(host.registry().command("p").is_some());
    }

    #[tokio::test]
    async fn reload_picks_up_edits_and_keeps_old_snapshots_intact() {
        let tmp = tempfile::tempdir().unwrap();
        write_ping(tmp.path(), "p");
        let host = host(tmp.path());
        host.load().await;
        let before = host.registry();

        write_ping(tmp.path(), "latency");
        host.reload().await;

        let after = host.registry();
        assert!(after.command("latency").is_some());
        assert!(after.command("p").is_none());
        // A snapshot taken before the reload is unaffected.
        assert!(before.command("p").is_some());
        assert!(before.command("latency").is_none());
    }

    #[tokio::test]
    async fn reload_drops_deleted_plugins() {
        let tmp = tempfile::tempdir().unwrap();
        write_ping(tmp.path(), "p");
        let host = host(tmp.path());
        host.load().await;

        std::fs::remove_file(tmp.path().join("commands/ping.toml")).unwrap();
        let report = host.reload().await;
        assert!(report.commands.is_empty());
        assert!(host.registry().command("ping").is_none());
    }

    #[tokio::test]
    async fn unload_empties_the_registry() {
        let tmp = tempfile::tempdir().unwrap();
        write_ping(tmp.path(), "p");
        let host = host(tmp.path());
        host.load().await;
        host.unload();
        assert!(host.registry().is_empty());
    }
}
