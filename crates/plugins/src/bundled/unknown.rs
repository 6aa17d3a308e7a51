//! `unknown`: answers prefixed words that match no command.
//!
//! Meant to be loaded with `fallback = true`.

use {anyhow::Result, async_trait::async_trait};

use crate::handler::{CommandContext, CommandHandler};

pub struct UnknownCommand;

#[async_trait]
impl CommandHandler for UnknownCommand {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let text = ctx.text.get_or(
            "unknown",
            "Unknown command \"$1\". Send $2help for a list.",
            &[&ctx.invoked, &ctx.prefix],
        );
        ctx.reply(&text).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        crate::{registry::{CommandModule, Registry}, testing::Fixture},
    };

    #[tokio::test]
    async fn names_the_unknown_word() {
        let mut registry = Registry::new();
        registry.register_command(CommandModule::new("unknown", Arc::new(UnknownCommand)).as_fallback());
        let fixture = Fixture::new(registry);

        let ctx = fixture.command_ctx("\n", "dance", &[]);
        UnknownCommand.on_call(&ctx).await.unwrap();
        assert_eq!(fixture.replies(), vec!["Unknown command \"dance\". Send !help for a list."]);
    }
}
