//! Plugin manifest parsing.
//!
//! Every plugin is a single TOML file in the commands or events directory:
//! ```text
//! name     = "ping"
//! alias    = ["p"]
//! category = "normal"
//! wait     = 2.5
//! builtin  = "ping"
//!
//! [lang.en]
//! pong = "Pong after $1ms"
//! ```
//!
//! A shell plugin names a `command` instead of a `builtin`; it runs with
//! the manifest's directory as working directory.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, lang::LangTable};

/// Access category of a command.
///
/// Only `nsfw` is gated; any other label behaves like `normal` and is kept
/// for grouping in help output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Normal,
    Nsfw,
    #[serde(untagged)]
    Other(String),
}

impl Category {
    pub fn is_nsfw(&self) -> bool {
        matches!(self, Self::Nsfw)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Nsfw => f.write_str("nsfw"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// Where a plugin's behavior comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerSource {
    /// A handler compiled into the binary, looked up in the builtin catalog.
    Builtin(String),
    /// A shell command run for every call.
    Shell {
        command: String,
        timeout: Duration,
        env: HashMap<String, String>,
    },
}

/// Raw manifest as written on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub alias: Vec<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub category: Category,
    /// Cooldown in seconds.
    #[serde(default)]
    pub wait: Option<f64>,
    #[serde(default)]
    pub nopre: bool,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub builtin: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub lang: LangTable,
}

fn default_timeout() -> u64 {
    10
}

/// A validated manifest with its location on disk.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub manifest: PluginManifest,
    pub source: HandlerSource,
    pub path: PathBuf,
    wait: Option<Duration>,
}

impl PluginDescriptor {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Directory shell handlers run in.
    pub fn working_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn wait(&self) -> Option<Duration> {
        self.wait
    }
}

/// Parse manifest text read from `path`.
pub fn parse_manifest(content: &str, path: &Path) -> Result<PluginDescriptor> {
    let mut manifest: PluginManifest =
        toml::from_str(content).map_err(|e| Error::invalid(path, e.message()))?;

    manifest.name = manifest.name.trim().to_lowercase();
    if manifest.name.is_empty() {
        return Err(Error::MissingName {
            path: path.to_path_buf(),
        });
    }
    manifest.alias = manifest
        .alias
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();

    let wait = manifest
        .wait
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                Error::invalid(
                    path,
                    format!("wait must be a non-negative number of seconds, got {secs}"),
                )
            })
        })
        .transpose()?;

    let source = match (manifest.builtin.as_deref(), manifest.command.as_deref()) {
        (Some(builtin), None) if !builtin.trim().is_empty() => {
            HandlerSource::Builtin(builtin.trim().to_string())
        },
        (None, Some(command)) if !command.trim().is_empty() => HandlerSource::Shell {
            command: command.to_string(),
            timeout: Duration::from_secs(manifest.timeout),
            env: manifest.env.clone(),
        },
        (Some(_), Some(_)) => {
            return Err(Error::invalid(path, "set either `builtin` or `command`, not both"));
        },
        _ => return Err(Error::invalid(path, "one of `builtin` or `command` is required")),
    };

    Ok(PluginDescriptor {
        manifest,
        source,
        path: path.to_path_buf(),
        wait,
    })
}

/// Read and parse the manifest at `path`.
pub fn read_manifest(path: &Path) -> Result<PluginDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content, path)
}
