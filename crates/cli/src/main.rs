mod bootstrap;
mod config_commands;
mod console;
mod plugins_commands;

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use herald_config::HeraldConfig;

#[derive(Parser)]
#[command(name = "herald", about = "Herald, a plugin-driven chat bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (defaults to ./herald.toml, then ~/.config/herald/).
    #[arg(long, global = true, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console transport (default when no subcommand is provided).
    Run,
    /// Plugin inspection.
    Plugins {
        #[command(subcommand)]
        action: plugins_commands::PluginAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries console output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the config named on the command line, or discover one.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<HeraldConfig> {
    match path {
        Some(path) => herald_config::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(herald_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "herald starting");
            let config = load_config(cli.config.as_deref())?;

            let validation = herald_config::validate_config(&config);
            if validation.has_errors() {
                for d in &validation.diagnostics {
                    warn!(diagnostic = %d, "invalid configuration");
                }
                anyhow::bail!("configuration has errors; run `herald config check`");
            }

            #[cfg(feature = "metrics")]
            let metrics = herald_metrics::init_metrics(herald_metrics::MetricsRecorderConfig {
                enabled: config.metrics.enabled,
                global_labels: vec![("bot".into(), console::SELF_ID.into())],
            })?;

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("shutdown requested");
                    }
                    cancel.cancel();
                }
            });

            bootstrap::run(config, cancel).await?;

            #[cfg(feature = "metrics")]
            {
                let snapshot = metrics.render();
                if !snapshot.is_empty() {
                    eprintln!("{snapshot}");
                }
            }
            info!("herald stopped");
            Ok(())
        },
        Some(Commands::Plugins { action }) => {
            let config = load_config(cli.config.as_deref())?;
            plugins_commands::handle_plugins(action, &config)
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
