//! Plugin system: manifests, handler traits, bundled handlers and the
//! live registry.
//!
//! Plugins are TOML manifests in two directories, one for commands and one
//! for events. Each manifest binds a name and its policy flags to either a
//! handler compiled into the binary or a shell command.

pub mod builtin;
pub mod bundled;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod host;
pub mod lang;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod shell;
#[cfg(feature = "file-watcher")]
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    builtin::BuiltinCatalog,
    error::{Error, Result},
    handler::{CommandContext, CommandHandler, EventContext, EventHandler, LoadContext, Reload},
    host::PluginHost,
    lang::TextProducer,
    loader::{LoadReport, PluginKind, PluginLoader},
    manifest::Category,
    registry::{CommandModule, EventModule, FALLBACK_KEY, Registry},
};
