//! Handlers shipped with the binary.

mod balance;
mod help;
mod message_logger;
mod ping;
mod reload;
mod unknown;

use std::sync::Arc;

pub use {
    balance::BalanceCommand, help::HelpCommand, message_logger::MessageLogger,
    ping::PingCommand, reload::ReloadCommand, unknown::UnknownCommand,
};

use crate::builtin::BuiltinCatalog;

/// Add every bundled handler to `catalog`.
pub fn register(catalog: &mut BuiltinCatalog) {
    catalog
        .register_command("balance", || Arc::new(BalanceCommand))
        .register_command("help", || Arc::new(HelpCommand))
        .register_command("ping", || Arc::new(PingCommand))
        .register_command("reload", || Arc::new(ReloadCommand))
        .register_command("unknown", || Arc::new(UnknownCommand))
        .register_event("message-logger", || Arc::new(MessageLogger::default()));
}
