//! `balance`: show a user's money from the data store.

use {anyhow::Result, async_trait::async_trait};

use crate::handler::{CommandContext, CommandHandler};

pub struct BalanceCommand;

#[async_trait]
impl CommandHandler for BalanceCommand {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let (user_id, name) = match ctx.args.first() {
            Some(id) => {
                let name = ctx
                    .data
                    .get_user(id)
                    .await?
                    .and_then(|user| user.name)
                    .unwrap_or_else(|| id.clone());
                (id.clone(), name)
            },
            None => (
                ctx.message.sender_id().to_string(),
                ctx.message.sender_name().to_string(),
            ),
        };
        let money = ctx.data.money(&user_id).await?.to_string();
        let text = ctx.text.get_or("balance", "$1 has $2 coins.", &[&name, &money]);
        ctx.reply(&text).await?;
        Ok(())
    }
}
