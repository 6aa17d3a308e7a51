//! Configuration schema.
//!
//! Every field has a serde default, so an empty file (or no file at all)
//! yields a runnable configuration.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    pub stream: StreamConfig,
    pub bootstrap: BootstrapConfig,
    pub notices: NoticesConfig,
    pub console: ConsoleConfig,
    pub metrics: MetricsConfig,
}

/// Command syntax and access lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub prefix: String,
    /// Language code used to pick plugin text tables.
    pub language: String,
    /// Sender IDs allowed to run admin commands. `*` globs are accepted.
    pub admins: Vec<String>,
    /// Thread IDs where nsfw-category commands may run.
    pub nsfw_threads: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            language: "en".into(),
            admins: Vec::new(),
            nsfw_threads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory holding command manifests.
    pub commands_dir: PathBuf,
    /// Directory holding event manifests.
    pub events_dir: PathBuf,
    /// Reload automatically when a manifest changes.
    pub watch: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            commands_dir: PathBuf::from("plugins/commands"),
            events_dir: PathBuf::from("plugins/events"),
            watch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Seconds between forced re-subscriptions.
    pub refresh_interval_secs: u64,
}

impl StreamConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 7200,
        }
    }
}

/// Retry policy for the initial transport connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub retry_delay_secs: u64,
    /// Connection attempts before giving up. `0` still makes one attempt.
    pub max_attempts: u32,
}

impl BootstrapConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: 5,
            max_attempts: 5,
        }
    }
}

/// Overrides for the notices sent on throttled or denied invocations.
///
/// Templates accept `{command}` and, for the cooldown notice, `{remaining}`.
/// Unset entries keep the built-in wording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticesConfig {
    pub cooldown: Option<String>,
    pub nsfw: Option<String>,
    pub admin: Option<String>,
}

/// Identity used for lines typed into the console transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub user_id: String,
    pub user_name: String,
    pub thread_id: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            user_id: "console".into(),
            user_name: "Console".into(),
            thread_id: "console".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}
