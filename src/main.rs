// ABOUTME: Main entry point for the shopchat binary
// ABOUTME: Loads config, initializes logging, and dispatches to the TUI or a headless command

use anyhow::Result;
use clap::Parser;
use shopchat::{cli::Cli, cli::Command, commands, logging, paths, Config};
use shopchat_core::HttpChatBackend;
use std::io;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let command = cli.command();

    // The TUI owns the terminal, so it logs to a file
    let _log_guard = if command == Command::Tui {
        Some(logging::init_file(&paths::log_dir_in(Path::new(
            &config.storage.path,
        )))?)
    } else {
        logging::init_stderr();
        None
    };

    tracing::info!(
        api = %config.api.base_url,
        storage = %config.storage.path,
        ephemeral = cli.ephemeral,
        command = ?command,
        "Configuration loaded"
    );

    let mut out = io::stdout();
    match command {
        Command::Tui => run_tui(&config, cli.ephemeral).await,
        Command::Send {
            text,
            image,
            no_suggestions,
        } => {
            let store = commands::open_store(&config, cli.ephemeral)?;
            let (events, _events_rx) = shopchat_core::events::channel();
            let orchestrator = commands::build_orchestrator(&config, store, events)?;
            commands::send(
                &orchestrator,
                &text.join(" "),
                image.as_deref(),
                !no_suggestions,
                &mut out,
            )
            .await?;
            Ok(())
        }
        Command::History { json } => {
            let store = commands::open_store(&config, cli.ephemeral)?;
            commands::history(&store, json, &mut out)
        }
        Command::Clear => {
            let store = commands::open_store(&config, cli.ephemeral)?;
            commands::clear(&store, &mut out)
        }
        Command::Name { name } => {
            let store = commands::open_store(&config, cli.ephemeral)?;
            commands::set_name(&store, &name, &mut out)
        }
        Command::Health => {
            let backend = HttpChatBackend::new(&config.api)?;
            commands::health(&backend, &mut out).await
        }
    }
}

#[cfg(feature = "tui")]
async fn run_tui(config: &Config, ephemeral: bool) -> Result<()> {
    let store = commands::open_store(config, ephemeral)?;
    let (events, events_rx) = shopchat_core::events::channel();
    let orchestrator = commands::build_orchestrator(config, store, events)?;
    shopchat::tui::run_tui(orchestrator, events_rx).await
}

#[cfg(not(feature = "tui"))]
async fn run_tui(_config: &Config, _ephemeral: bool) -> Result<()> {
    anyhow::bail!("shopchat was built without the `tui` feature; use a subcommand such as `send`")
}
