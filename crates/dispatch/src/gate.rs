use std::time::Duration;

use {herald_channels::gating, herald_plugins::CommandModule};

/// Who may run restricted commands, and where.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Sender IDs allowed to run `admin` commands.
    pub admins: Vec<String>,
    /// Thread IDs where `nsfw` commands are allowed.
    pub nsfw_threads: Vec<String>,
}

impl AccessPolicy {
    /// Category gate, then admin gate.
    pub fn check(
        &self,
        module: &CommandModule,
        sender_id: &str,
        thread_id: &str,
    ) -> Result<(), AccessDenied> {
        if module.category.is_nsfw() && !gating::is_listed(thread_id, &self.nsfw_threads) {
            return Err(AccessDenied::NsfwThread);
        }
        if module.admin && !gating::is_listed(sender_id, &self.admins) {
            return Err(AccessDenied::NotAdmin);
        }
        Ok(())
    }
}

/// Reason a command invocation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NsfwThread,
    NotAdmin,
}

impl AccessDenied {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NsfwThread => "nsfw",
            Self::NotAdmin => "admin",
        }
    }
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NsfwThread => write!(f, "thread not on the nsfw allow-list"),
            Self::NotAdmin => write!(f, "sender is not an admin"),
        }
    }
}

/// Texts sent when the gate stops a command.
///
/// `{command}` is replaced by the command name and `{remaining}` by the
/// seconds left on a cooldown, with one decimal.
#[derive(Debug, Clone)]
pub struct Notices {
    pub cooldown: String,
    pub nsfw: String,
    pub admin: String,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            cooldown: "Please wait {remaining}s before using {command} again.".into(),
            nsfw: "{command} is not allowed in this thread.".into(),
            admin: "Only bot admins can use {command}.".into(),
        }
    }
}

impl Notices {
    pub fn cooldown(&self, command: &str, remaining: Duration) -> String {
        self.cooldown
            .replace("{command}", command)
            .replace("{remaining}", &format!("{:.1}", remaining.as_secs_f64()))
    }

    pub fn denied(&self, command: &str, reason: AccessDenied) -> String {
        let template = match reason {
            AccessDenied::NsfwThread => &self.nsfw,
            AccessDenied::NotAdmin => &self.admin,
        };
        template.replace("{command}", command)
    }
}
