use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use foldersync_config::{
    AppConfig, ConfigLoader, ConfigSource, ConfigWarnings, runner, validate,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "foldersync", about = "Watch folders and hand new files to handlers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the configured folders until Ctrl-C
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate configuration without watching
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load(config: Option<PathBuf>) -> Result<(AppConfig, ConfigWarnings)> {
    let (app, source) = ConfigLoader::from_env().with_explicit(config).load()?;
    match &source {
        ConfigSource::Default => info!("no config file found; using defaults"),
        ConfigSource::EnvInline => info!("loaded config from FOLDERSYNC_CONFIG_JSON"),
        ConfigSource::Explicit(path)
        | ConfigSource::EnvPath(path)
        | ConfigSource::File(path) => {
            info!(path = %path.display(), "loaded config")
        }
    }
    let warnings = validate(&app)?;
    Ok((app, warnings))
}

fn report(warnings: &ConfigWarnings) {
    for item in &warnings.items {
        match &item.hint {
            Some(hint) => warn!(hint = %hint, "{}", item.message),
            None => warn!("{}", item.message),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => {
            let (app, warnings) = load(config)?;
            report(&warnings);

            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!(error = %err, "failed to listen for ctrl-c");
                }
            };
            let stats = runner::run(&app, shutdown).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Check { config } => {
            let (app, warnings) = load(config)?;
            report(&warnings);

            println!("queue_capacity: {}", app.sync.queue_capacity);
            println!("overflow:       {:?}", app.sync.overflow);
            println!("event_buffer:   {}", app.sync.event_buffer);
            println!("workers:        {}", app.sync.workers);
            println!("settle_delay:   {}ms", app.sync.settle_delay_ms);
            println!("recursive:      {}", app.sync.recursive);
            for folder in &app.folders {
                println!(
                    "  {} [{}] -> {}",
                    folder.path.display(),
                    folder.pattern,
                    folder.handler.kind()
                );
            }
            if warnings.is_empty() {
                println!("Config OK");
            } else {
                println!("Config OK with {} warning(s)", warnings.len());
            }
        }
    }

    Ok(())
}
