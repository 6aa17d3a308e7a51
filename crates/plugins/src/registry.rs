//! In-memory plugin registry.
//!
//! Commands and their aliases share one lower-cased namespace; events have
//! their own. A registry is built once per load pass and never mutated
//! after it is installed in the [`PluginHost`](crate::PluginHost).

use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    handler::{CommandHandler, EventHandler},
    lang::LangTable,
    manifest::{Category, HandlerSource, PluginDescriptor},
};

/// Key under which the fallback command is registered.
pub const FALLBACK_KEY: &str = "\n";

/// Where a loaded module came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Built from a manifest on disk.
    Manifest(PathBuf),
    /// Registered in code.
    Native,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(path) => write!(f, "{}", path.display()),
            Self::Native => f.write_str("native"),
        }
    }
}

/// A loaded command plugin.
pub struct CommandModule {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: String,
    pub admin: bool,
    pub category: Category,
    pub wait: Option<Duration>,
    pub nopre: bool,
    pub fallback: bool,
    pub lang: LangTable,
    pub origin: Origin,
    pub handler: Arc<dyn CommandHandler>,
}

impl fmt::Debug for CommandModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandModule")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("admin", &self.admin)
            .field("category", &self.category)
            .field("wait", &self.wait)
            .field("nopre", &self.nopre)
            .field("fallback", &self.fallback)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl CommandModule {
    /// A native command with default policy: no aliases, no cooldown,
    /// prefix required.
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            aliases: Vec::new(),
            description: String::new(),
            usage: String::new(),
            admin: false,
            category: Category::Normal,
            wait: None,
            nopre: false,
            fallback: false,
            lang: LangTable::new(),
            origin: Origin::Native,
            handler,
        }
    }

    pub fn from_descriptor(desc: &PluginDescriptor, handler: Arc<dyn CommandHandler>) -> Self {
        let manifest = &desc.manifest;
        Self {
            name: manifest.name.clone(),
            aliases: manifest.alias.clone(),
            description: manifest.description.clone(),
            usage: manifest.usage.clone(),
            admin: manifest.admin,
            category: manifest.category.clone(),
            wait: desc.wait(),
            nopre: manifest.nopre,
            fallback: manifest.fallback,
            lang: manifest.lang.clone(),
            origin: Origin::Manifest(desc.path.clone()),
            handler,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().to_lowercase());
        self
    }

    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_lang(mut self, lang: LangTable) -> Self {
        self.lang = lang;
        self
    }

    #[must_use]
    pub fn admin_only(mut self) -> Self {
        self.admin = true;
        self
    }

    #[must_use]
    pub fn without_prefix(mut self) -> Self {
        self.nopre = true;
        self
    }

    #[must_use]
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Every key this module is reachable under.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .chain(self.fallback.then_some(FALLBACK_KEY))
    }
}

/// A loaded event plugin.
pub struct EventModule {
    pub name: String,
    pub origin: Origin,
    pub handler: Arc<dyn EventHandler>,
}

impl fmt::Debug for EventModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventModule")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl EventModule {
    pub fn new(name: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            origin: Origin::Native,
            handler,
        }
    }

    pub fn from_descriptor(desc: &PluginDescriptor, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: desc.manifest.name.clone(),
            origin: Origin::Manifest(desc.path.clone()),
            handler,
        }
    }
}

/// Registered commands and events.
#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<Arc<CommandModule>>,
    command_keys: HashMap<String, Arc<CommandModule>>,
    events: Vec<Arc<EventModule>>,
    event_keys: HashMap<String, Arc<EventModule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its name, aliases and (if flagged) the
    /// fallback key. On collision the new module wins.
    pub fn register_command(&mut self, module: CommandModule) -> Arc<CommandModule> {
        let module = Arc::new(module);
        for key in module.keys() {
            if let Some(previous) = self
                .command_keys
                .insert(key.to_lowercase(), Arc::clone(&module))
                && !Arc::ptr_eq(&previous, &module)
            {
                warn!(
                    key = key.escape_debug().to_string(),
                    previous = %previous.origin,
                    replacement = %module.origin,
                    "command key collision, last registered wins"
                );
            }
        }
        self.commands.push(Arc::clone(&module));
        module
    }

    pub fn register_event(&mut self, module: EventModule) -> Arc<EventModule> {
        let module = Arc::new(module);
        if let Some(previous) = self
            .event_keys
            .insert(module.name.clone(), Arc::clone(&module))
        {
            warn!(
                name = %module.name,
                previous = %previous.origin,
                replacement = %module.origin,
                "event name collision, last registered wins"
            );
        }
        self.events.push(Arc::clone(&module));
        module
    }

    /// Look up a command by name or alias, case-insensitively.
    pub fn command(&self, key: &str) -> Option<&Arc<CommandModule>> {
        self.command_keys.get(&key.to_lowercase())
    }

    /// The command registered as the not-found sentinel.
    pub fn fallback(&self) -> Option<&Arc<CommandModule>> {
        self.command_keys.get(FALLBACK_KEY)
    }

    pub fn event(&self, name: &str) -> Option<&Arc<EventModule>> {
        self.event_keys.get(&name.to_lowercase())
    }

    /// Every loaded command in load order, including shadowed ones.
    pub fn commands(&self) -> &[Arc<CommandModule>] {
        &self.commands
    }

    /// Every loaded event module in load order.
    pub fn events(&self) -> &[Arc<EventModule>] {
        &self.events
    }

    /// Commands still reachable under their own name, in load order.
    pub fn reachable_commands(&self) -> impl Iterator<Item = &Arc<CommandModule>> {
        self.commands.iter().filter(|module| {
            self.command_keys
                .get(&module.name)
                .is_some_and(|current| Arc::ptr_eq(current, module))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }
}
