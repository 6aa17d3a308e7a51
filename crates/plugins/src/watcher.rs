//! Filesystem watcher for the plugin directories.
//!
//! Sends a notification whenever a `*.toml` manifest is created, modified or
//! removed; the receiver is expected to reload the plugin host.

use std::{path::PathBuf, time::Duration};

use {
    notify_debouncer_full::{
        DebounceEventResult, Debouncer, RecommendedCache, new_debouncer,
        notify::{EventKind, RecommendedWatcher, RecursiveMode},
    },
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{Error, Result};

const DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginWatchEvent {
    /// At least one manifest changed.
    Changed,
}

/// Keeps the watch alive; dropping it stops notifications.
pub struct PluginWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl PluginWatcher {
    /// Start watching `dirs`. Directories that do not exist are skipped.
    pub fn start(dirs: Vec<PathBuf>) -> Result<(Self, mpsc::UnboundedReceiver<PluginWatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let changed = events.iter().any(|event| {
                        matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        ) && event
                            .paths
                            .iter()
                            .any(|path| path.extension().is_some_and(|ext| ext == "toml"))
                    });
                    if changed {
                        debug!("plugin manifest changed");
                        let _ = tx.send(PluginWatchEvent::Changed);
                    }
                },
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "plugin watcher error");
                    }
                },
            }
        })
        .map_err(|e| Error::external("failed to start plugin watcher", e))?;

        for dir in &dirs {
            if dir.is_dir() {
                debouncer
                    .watch(dir, RecursiveMode::NonRecursive)
                    .map_err(|e| Error::external(format!("failed to watch {}", dir.display()), e))?;
                info!(dir = %dir.display(), "watching plugin directory");
            }
        }

        Ok((Self {
            _debouncer: debouncer,
        }, rx))
    }
}
