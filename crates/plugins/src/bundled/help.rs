//! `help`: list commands, or describe one.

use std::fmt::Write;

use {anyhow::Result, async_trait::async_trait};

use crate::{
    handler::{CommandContext, CommandHandler},
    registry::CommandModule,
};

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn on_call(&self, ctx: &CommandContext) -> Result<()> {
        let text = match ctx.args.first() {
            Some(query) => {
                let key = query.strip_prefix(ctx.prefix.as_str()).unwrap_or(query);
                match ctx.registry.command(key) {
                    Some(module) if !module.fallback || module.name == key => {
                        describe(module, &ctx.prefix)
                    },
                    _ => ctx.text.get_or("missing", "No command named \"$1\".", &[key]),
                }
            },
            None => list(ctx),
        };
        ctx.reply(&text).await?;
        Ok(())
    }
}

fn invocation(module: &CommandModule, prefix: &str) -> String {
    if module.nopre {
        module.name.clone()
    } else {
        format!("{prefix}{}", module.name)
    }
}

fn list(ctx: &CommandContext) -> String {
    let mut modules: Vec<_> = ctx
        .registry
        .reachable_commands()
        .filter(|m| !m.fallback)
        .collect();
    modules.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = ctx.text.get_or("header", "Commands:", &[]);
    for module in modules {
        let _ = write!(out, "\n{}", invocation(module, &ctx.prefix));
        if !module.description.is_empty() {
            let _ = write!(out, " - {}", module.description);
        }
    }
    out
}

fn describe(module: &CommandModule, prefix: &str) -> String {
    let mut out = invocation(module, prefix);
    if !module.aliases.is_empty() {
        let _ = write!(out, "\naliases: {}", module.aliases.join(", "));
    }
    if !module.description.is_empty() {
        let _ = write!(out, "\n{}", module.description);
    }
    if !module.usage.is_empty() {
        let _ = write!(out, "\nusage: {}", module.usage);
    }
    let _ = write!(out, "\ncategory: {}", module.category);
    if let Some(wait) = module.wait {
        let _ = write!(out, "\ncooldown: {:.1}s", wait.as_secs_f64());
    }
    if module.admin {
        out.push_str("\nadmin only");
    }
    out
}
