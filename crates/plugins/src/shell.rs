//! Shell-backed plugins.
//!
//! Each call spawns `sh -c <command>` in the manifest's directory, writes a
//! JSON payload to stdin and reads the plugin's answer from stdout:
//!
//! - exit 0, empty stdout → nothing happens
//! - exit 0, stdout `{"actions": [...]}` → the actions run in order
//! - exit 0, any other stdout → sent as a reply
//! - non-zero exit, spawn failure or timeout → handler error

use std::{collections::HashMap, path::PathBuf, time::Duration};

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::{io::AsyncWriteExt, process::Command},
    tracing::{debug, warn},
};

use {
    herald_channels::InboundMessage,
    herald_common::types::{RawMessage, ThreadInfo, UserProfile},
};

use crate::{
    handler::{CommandContext, CommandHandler, EventContext, EventHandler, Reload},
    lang::TextProducer,
};

/// Something a shell plugin asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellAction {
    /// Reply to the triggering message, optionally in another thread.
    Reply {
        text: String,
        #[serde(default)]
        target: Option<String>,
    },
    /// Send a non-quoting message to a thread.
    Send { text: String, thread: String },
    /// React to the triggering message.
    React { reaction: String },
    /// Reload all plugins. Only honored for commands.
    Reload,
}

#[derive(Debug, Deserialize)]
struct ShellResponse {
    actions: Vec<ShellAction>,
}

/// JSON written to the plugin's stdin.
#[derive(Debug, Serialize)]
struct ShellPayload<'a> {
    event: &'static str,
    module: &'a str,
    message: &'a RawMessage,
    sender: Option<&'a UserProfile>,
    thread: Option<&'a ThreadInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    invoked: Option<&'a str>,
    args: &'a [String],
    prefix: &'a str,
    language: &'a str,
    text: HashMap<String, String>,
}

/// Spawns a plugin's shell command and interprets its output.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    module: String,
    command: String,
    working_dir: PathBuf,
    timeout: Duration,
    env: HashMap<String, String>,
}

impl ShellRunner {
    pub fn new(
        module: impl Into<String>,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            module: module.into(),
            command: command.into(),
            working_dir: working_dir.into(),
            timeout,
            env,
        }
    }

    async fn run(&self, payload: &ShellPayload<'_>) -> Result<Vec<ShellAction>> {
        let payload_json =
            serde_json::to_string(payload).context("failed to serialize plugin payload")?;

        debug!(
            module = %self.module,
            command = %self.command,
            event = payload.event,
            payload_len = payload_json.len(),
            "spawning shell plugin"
        );

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .env("HERALD_MODULE", &self.module)
            .env("HERALD_EVENT", payload.event)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn plugin command: {}", self.command))?;

        // The child may exit without reading stdin.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(payload_json.as_bytes()).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!(
                    "plugin '{}' timed out after {:?}",
                    self.module, self.timeout
                )
            })?
            .with_context(|| format!("plugin '{}' failed to complete", self.module))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        debug!(
            module = %self.module,
            exit_code,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "shell plugin completed"
        );

        if exit_code != 0 {
            bail!(
                "plugin '{}' exited with code {}: {}",
                self.module,
                exit_code,
                stderr.trim()
            );
        }

        Ok(parse_output(&stdout))
    }
}

/// Turn a plugin's stdout into actions.
pub fn parse_output(stdout: &str) -> Vec<ShellAction> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('{')
        && let Ok(response) = serde_json::from_str::<ShellResponse>(trimmed)
    {
        return response.actions;
    }
    vec![ShellAction::Reply {
        text: trimmed.to_string(),
        target: None,
    }]
}

async fn apply(
    module: &str,
    actions: Vec<ShellAction>,
    message: &InboundMessage,
    reload: Option<&dyn Reload>,
) -> Result<()> {
    for action in actions {
        match action {
            ShellAction::Reply { text, target } => {
                message.reply(&text, target.as_deref()).await?;
            },
            ShellAction::Send { text, thread } => {
                message.send(&text, &thread).await?;
            },
            ShellAction::React { reaction } => {
                message.react(&reaction).await?;
            },
            ShellAction::Reload => match reload {
                Some(reload) => {
                    let report = reload.reload().await;
                    debug!(module, summary = %report.summary(), "reload requested by shell plugin");
                },
                None => warn!(module, "reload action is only available to commands, ignoring"),
            },
        }
    }
    Ok(())
}

/// A command whose `on_call` runs a shell command.
pub struct ShellCommandHandler {
    runner: ShellRunner,
}

impl ShellCommandHandler {
    pub fn new(runner: ShellRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl CommandHandler for ShellCommandHandler {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let payload = ShellPayload {
            event: "call",
            module: &ctx.module.name,
            message: &ctx.message.raw,
            sender: ctx.message.sender.as_ref(),
            thread: ctx.message.thread.as_ref(),
            invoked: Some(&ctx.invoked),
            args: &ctx.args,
            prefix: &ctx.prefix,
            language: &ctx.language,
            text: ctx.text.texts(),
        };
        let actions = self.runner.run(&payload).await?;
        apply(
            &self.runner.module,
            actions,
            &ctx.message,
            Some(ctx.reload.as_ref()),
        )
        .await
    }
}

/// An event module whose `on_message` runs a shell command.
pub struct ShellEventHandler {
    runner: ShellRunner,
    text: TextProducer,
}

impl ShellEventHandler {
    pub fn new(runner: ShellRunner, text: TextProducer) -> Self {
        Self { runner, text }
    }
}

#[async_trait]
impl EventHandler for ShellEventHandler {
    async fn on_message(&self, ctx: &EventContext) -> Result<()> {
        let payload = ShellPayload {
            event: "message",
            module: &self.runner.module,
            message: &ctx.message.raw,
            sender: ctx.message.sender.as_ref(),
            thread: ctx.message.thread.as_ref(),
            invoked: None,
            args: &[],
            prefix: &ctx.prefix,
            language: &ctx.language,
            text: self.text.texts(),
        };
        let actions = self.runner.run(&payload).await?;
        apply(&self.runner.module, actions, &ctx.message, None).await
    }
}
