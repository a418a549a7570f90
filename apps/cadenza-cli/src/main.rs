//! Cadenza CLI - headless client for MPD-compatible music servers.
//!
//! Connects with the core session manager and either follows the server's
//! change notifications or runs a single library query and exits.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cadenza_core::{
    ClientEvent, CommandExecutor, ConnectionEvent, DomainExtractor, Identity, LibraryService,
    MpdClient, PlaylistService, QueueService, StatusEvent,
};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use crate::config::CliConfig;

/// Cadenza - headless music-server client.
#[derive(Parser, Debug)]
#[command(name = "cadenza")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server address (overrides config file).
    #[arg(short, long, env = "CADENZA_ADDRESS")]
    address: Option<String>,

    /// Server password (overrides config file).
    #[arg(short, long, env = "CADENZA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CADENZA_LOG_LEVEL")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Stay connected and log every event until interrupted.
    Watch,
    /// List every artist under any role.
    Artists,
    /// List the albums an artist appears on.
    Albums {
        /// Artist name, any spelling.
        artist: String,
    },
    /// Show the play queue.
    Queue,
    /// List stored playlists.
    Playlists,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Cadenza v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }

    let client_config = config.to_client_config()?;
    log::info!(
        "Configuration: address={}, pool_size={}, status_interval_ms={}",
        client_config.address,
        client_config.pool_size,
        client_config.status_interval_ms
    );

    let client = Arc::new(MpdClient::from_config(client_config).context("Failed to create client")?);
    let events = client.subscribe();

    client
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", config.address))?;

    let result = match args.command {
        Action::Watch => {
            watch(events).await;
            Ok(())
        }
        command => run_query(&client, command).await,
    };

    client.disconnect().await;
    log::info!("Disconnected");
    result
}

/// Logs client events until a shutdown signal arrives.
async fn watch(events: Option<tokio::sync::broadcast::Receiver<ClientEvent>>) {
    let Some(mut events) = events else {
        shutdown_signal().await;
        return;
    };

    let follow = async {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    tokio::select! {
        _ = follow => {},
        _ = shutdown_signal() => log::info!("Shutdown signal received, cleaning up..."),
    }
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::Connection(ConnectionEvent::StateChanged { state, reason, .. }) => {
            match reason {
                Some(reason) => log::info!("Connection: {:?} ({})", state, reason),
                None => log::info!("Connection: {:?}", state),
            }
        }
        ClientEvent::Connection(ConnectionEvent::ReconnectScheduled {
            attempt,
            max_attempts,
            delay_ms,
            ..
        }) => log::info!(
            "Reconnect attempt {}/{} in {} ms",
            attempt,
            max_attempts,
            delay_ms
        ),
        ClientEvent::Status(StatusEvent::Changed { status, .. }) => log::info!(
            "Status: {:?}, song {:?}, volume {:?}",
            status.state,
            status.song,
            status.volume
        ),
        ClientEvent::Library(_) => log::info!("Library updated"),
        ClientEvent::Subsystem(event) => log::debug!("{:?}", event),
    }
}

async fn run_query(client: &Arc<MpdClient>, command: Action) -> Result<()> {
    let executor: Arc<dyn CommandExecutor> = client.clone();
    let extractor = DomainExtractor::standard(client.aliases());

    match command {
        Action::Artists => {
            let library = LibraryService::new(executor, extractor);
            for artist in library.list_artists().await.context("Failed to list artists")? {
                println!("{}\t{}", artist.name, artist.roles);
            }
        }
        Action::Albums { artist } => {
            let library = LibraryService::new(executor, extractor);
            // Seed the alias table so every spelling the server uses is queried
            library
                .list_artists()
                .await
                .context("Failed to list artists")?;
            let albums = library
                .albums_by_artist(&Identity::artist(&artist))
                .await
                .with_context(|| format!("Failed to list albums of {artist}"))?;
            for album in albums {
                let year = album
                    .release_date
                    .map(|d| d.year.to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{} track(s)", album.title, year, album.tracks.len());
            }
        }
        Action::Queue => {
            let queue = QueueService::new(executor, extractor);
            for entry in queue.list().await.context("Failed to read queue")? {
                let title = entry.track.title.as_deref().unwrap_or(&entry.track.file);
                println!("{}\t{}", entry.position, title);
            }
        }
        Action::Playlists => {
            let playlists = PlaylistService::new(executor, extractor);
            for playlist in playlists.list().await.context("Failed to list playlists")? {
                println!(
                    "{}\t{}",
                    playlist.name,
                    playlist.last_modified.unwrap_or_default()
                );
            }
        }
        Action::Watch => {}
    }
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
