//! CLI commands for plugin inspection.

use {anyhow::Result, clap::Subcommand};

use {herald_config::HeraldConfig, herald_plugins::CommandModule};

use crate::bootstrap::plugin_loader;

#[derive(Subcommand)]
pub enum PluginAction {
    /// List the commands and events that would be loaded.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show details about a command, by name or alias.
    Info {
        /// Command name or alias.
        name: String,
    },
    /// Load every manifest without connecting and report errors.
    Check,
}

pub fn handle_plugins(action: PluginAction, config: &HeraldConfig) -> Result<()> {
    let loader = plugin_loader(config);
    let (registry, report) = loader.inspect();

    match action {
        PluginAction::List { json } => {
            if json {
                let commands: Vec<_> = registry
                    .commands()
                    .iter()
                    .map(|m| command_json(m))
                    .collect();
                let events: Vec<_> = registry
                    .events()
                    .iter()
                    .map(|m| {
                        serde_json::json!({
                            "name": m.name,
                            "origin": m.origin.to_string(),
                        })
                    })
                    .collect();
                let out = serde_json::json!({ "commands": commands, "events": events });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            if registry.is_empty() {
                println!("No plugins found.");
                println!(
                    "Place manifests in {} and {}",
                    loader.dirs()[0].display(),
                    loader.dirs()[1].display()
                );
                return Ok(());
            }

            println!("Commands:");
            for module in registry.commands() {
                println!("  {}{}", module.name, flags(module));
                if !module.description.is_empty() {
                    println!("    {}", module.description);
                }
            }
            println!("Events:");
            for module in registry.events() {
                println!("  {}", module.name);
            }
            if !report.is_clean() {
                println!(
                    "\n{} manifest(s) skipped; run `herald plugins check` for details.",
                    report.errors.len()
                );
            }
        },
        PluginAction::Info { name } => {
            let Some(module) = registry.command(&name) else {
                eprintln!("Command '{name}' not found.");
                std::process::exit(1);
            };

            println!("Name:        {}", module.name);
            if !module.aliases.is_empty() {
                println!("Aliases:     {}", module.aliases.join(", "));
            }
            if !module.description.is_empty() {
                println!("Description: {}", module.description);
            }
            if !module.usage.is_empty() {
                println!("Usage:       {}{}", config.bot.prefix, module.usage);
            }
            println!("Category:    {}", module.category);
            if let Some(wait) = module.wait {
                println!("Cooldown:    {:.1}s", wait.as_secs_f64());
            }
            println!("Admin:       {}", module.admin);
            println!("No prefix:   {}", module.nopre);
            println!("Fallback:    {}", module.fallback);
            if !module.lang.is_empty() {
                let mut languages: Vec<_> = module.lang.keys().map(String::as_str).collect();
                languages.sort_unstable();
                println!("Languages:   {}", languages.join(", "));
            }
            println!("Source:      {}", module.origin);
        },
        PluginAction::Check => {
            for error in &report.errors {
                eprintln!("  error {error}");
            }
            eprintln!("{}", report.summary());
            if !report.is_clean() {
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn command_json(module: &CommandModule) -> serde_json::Value {
    serde_json::json!({
        "name": module.name,
        "aliases": module.aliases,
        "description": module.description,
        "usage": module.usage,
        "category": module.category.to_string(),
        "wait_secs": module.wait.map(|w| w.as_secs_f64()),
        "admin": module.admin,
        "nopre": module.nopre,
        "fallback": module.fallback,
        "origin": module.origin.to_string(),
    })
}

/// Compact policy markers shown after a command name.
fn flags(module: &CommandModule) -> String {
    let mut flags = Vec::new();
    if !module.aliases.is_empty() {
        flags.push(format!("aliases: {}", module.aliases.join(", ")));
    }
    if let Some(wait) = module.wait {
        flags.push(format!("cooldown {:.1}s", wait.as_secs_f64()));
    }
    if module.category.is_nsfw() {
        flags.push("nsfw".to_string());
    }
    if module.admin {
        flags.push("admin".to_string());
    }
    if module.nopre {
        flags.push("no prefix".to_string());
    }
    if module.fallback {
        flags.push("fallback".to_string());
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join("; "))
    }
}
