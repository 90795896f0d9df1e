//! Reelsmith CLI entry point.

use anyhow::Result;
use clap::Parser;
use reelsmith::cli::{commands, Cli, Commands};
use reelsmith::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("reelsmith={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Generate {
            topic,
            voice,
            language,
            content_type,
            no_store,
        } => {
            commands::run_generate(
                topic,
                voice.clone(),
                language.clone(),
                content_type.as_deref(),
                *no_store,
                settings,
            )
            .await?;
        }

        Commands::Captions {
            audio,
            format,
            output,
        } => {
            commands::run_captions(audio, format, output.as_deref(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::List { limit } => {
            commands::run_list(*limit, settings).await?;
        }

        Commands::Delete { id, purge } => {
            commands::run_delete(*id, *purge, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, cli.config.as_deref())?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
