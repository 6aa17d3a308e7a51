//! `reload`: re-read every plugin from disk.
//!
//! Usually loaded with `admin = true`.

use {anyhow::Result, async_trait::async_trait, tracing::info};

use crate::handler::{CommandContext, CommandHandler};

pub struct ReloadCommand;

#[async_trait]
impl CommandHandler for ReloadCommand {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let report = ctx.reload.reload().await;
        info!(
            requested_by = ctx.message.sender_id(),
            summary = %report.summary(),
            "plugins reloaded on request"
        );

        let commands = report.commands.len().to_string();
        let events = report.events.len().to_string();
        let errors = report.errors.len().to_string();
        let mut text = ctx.text.get_or(
            "done",
            "Reloaded $1 commands and $2 events ($3 errors).",
            &[&commands, &events, &errors],
        );
        for error in &report.errors {
            text.push_str("\n- ");
            text.push_str(&error.to_string());
        }
        ctx.reply(&text).await?;
        Ok(())
    }
}
