//! Catalog of handlers compiled into the binary.
//!
//! A manifest with `builtin = "<name>"` is bound to the factory registered
//! here under that name. Factories run on every load pass so a reload
//! starts each builtin from a fresh instance.

use std::{collections::HashMap, sync::Arc};

use crate::{
    bundled,
    handler::{CommandHandler, EventHandler},
};

type CommandFactory = Box<dyn Fn() -> Arc<dyn CommandHandler> + Send + Sync>;
type EventFactory = Box<dyn Fn() -> Arc<dyn EventHandler> + Send + Sync>;

#[derive(Default)]
pub struct BuiltinCatalog {
    commands: HashMap<String, CommandFactory>,
    events: HashMap<String, EventFactory>,
}

impl BuiltinCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the bundled handlers.
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        bundled::register(&mut catalog);
        catalog
    }

    pub fn register_command<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn CommandHandler> + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Box::new(factory));
        self
    }

    pub fn register_event<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn EventHandler> + Send + Sync + 'static,
    {
        self.events.insert(name.into(), Box::new(factory));
        self
    }

    /// Instantiate the command builtin `name`.
    pub fn command(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).map(|factory| factory())
    }

    /// Instantiate the event builtin `name`.
    pub fn event(&self, name: &str) -> Option<Arc<dyn EventHandler>> {
        self.events.get(name).map(|factory| factory())
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.events.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
