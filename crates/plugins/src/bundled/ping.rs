//! `ping`: liveness check.

use {anyhow::Result, async_trait::async_trait};

use crate::handler::{CommandContext, CommandHandler};

pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let text = ctx.text.get_or("pong", "Pong!", &[ctx.message.sender_name()]);
        ctx.reply(&text).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use {
        super::*,
        crate::{lang::LangTable, registry::{CommandModule, Registry}, testing::Fixture},
    };

    #[tokio::test]
    async fn replies_pong() {
        let mut registry = Registry::new();
        registry.register_command(CommandModule::new("ping", Arc::new(PingCommand)));
        let fixture = Fixture::new(registry);

        PingCommand.on_call(&fixture.command_ctx("ping", "ping", &[])).await.unwrap();
        assert_eq!(fixture.replies(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn uses_localized_text() {
        let mut lang = LangTable::new();
        lang.insert(
            "en".into(),
            HashMap::from([("pong".to_string(), "Still here, $1.".to_string())]),
        );
        let mut registry = Registry::new();
        registry.register_command(CommandModule::new("ping", Arc::new(PingCommand)).with_lang(lang));
        let fixture = Fixture::new(registry);

        PingCommand.on_call(&fixture.command_ctx("ping", "ping", &[])).await.unwrap();
        assert_eq!(fixture.replies(), vec!["Still here, Alice."]);
    }
}
