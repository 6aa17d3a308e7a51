//! Configuration loading, env substitution, and validation.
//!
//! Config files: `herald.toml`, `herald.yaml`, `herald.yml`, or `herald.json`,
//! searched in `./` then `~/.config/herald/`.
//!
//! `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders are substituted before
//! parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        BootstrapConfig, BotConfig, ConsoleConfig, HeraldConfig, MetricsConfig, NoticesConfig,
        PluginsConfig, StreamConfig,
    },
    validate::{
        Diagnostic, Severity, ValidationResult, validate, validate_config, validate_str,
    },
};
