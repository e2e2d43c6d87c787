//! Main entry point for the Image Arena service
//!
//! Runs the HTTP voting service, or performs one-shot maintenance
//! operations (seeding, sampling, voting, listing) against the same store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use image_arena::api::ApiServer;
use image_arena::config::{validate_config, AppConfig};
use image_arena::types::VoteRequest;
use image_arena::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Image Arena - pairwise image voting with ELO ratings
#[derive(Parser)]
#[command(
    name = "image-arena",
    version,
    about = "Pairwise image voting service with ELO ratings and a leaderboard",
    long_about = "Image Arena serves two random images at a time, records which one the \
                 voter prefers and keeps an ELO rating per image in SQLite. Without a \
                 subcommand it runs the HTTP service."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Database path override
    #[arg(long, value_name = "PATH", help = "Override SQLite database path")]
    database: Option<PathBuf>,

    /// Use a throwaway in-memory store
    #[arg(long, help = "Keep ratings in memory only")]
    in_memory: bool,

    /// Image directory override
    #[arg(long, value_name = "DIR", help = "Override image directory")]
    images: Option<PathBuf>,

    /// HTTP host override
    #[arg(long, value_name = "HOST", help = "Override HTTP bind address")]
    host: Option<String>,

    /// HTTP port override
    #[arg(short, long, value_name = "PORT", help = "Override HTTP server port")]
    port: Option<u16>,

    /// Disable image discovery at startup
    #[arg(long, help = "Do not scan the image directory at startup")]
    no_discover: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Discover images in a directory and add them to the store
    Seed {
        /// Directory to scan; defaults to the configured image directory
        dir: Option<PathBuf>,
    },
    /// Print a random matchup
    Matchup,
    /// Record a vote
    Vote {
        /// Id of the preferred image
        winner: i64,
        /// Id of the other image
        loser: i64,
    },
    /// Print the leaderboard
    Leaderboard,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Image Arena");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listening on: {}", config.bind_address());
    if config.storage.in_memory {
        info!("   Storage: in-memory");
    } else {
        info!("   Storage: {}", config.storage.database_path.display());
    }
    info!(
        "   Images: {} (served at {})",
        config.images.directory.display(),
        config.images.url_prefix
    );
    info!("   Auto-discover: {}", config.images.auto_discover);
    info!("   Submissions: {}", config.images.allow_submissions);
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(database) = &args.database {
        config.storage.database_path = database.clone();
    }

    if args.in_memory {
        config.storage.in_memory = true;
    }

    if let Some(images) = &args.images {
        config.images.directory = images.clone();
    }

    if let Some(host) = &args.host {
        config.service.host = host.clone();
    }

    if let Some(port) = args.port {
        config.service.port = port;
    }

    if args.no_discover {
        config.images.auto_discover = false;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Run the HTTP service until a shutdown signal arrives
async fn serve(config: AppConfig) -> Result<()> {
    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = Arc::new(AppState::new(config.clone())?);
    let server = Arc::new(ApiServer::new(app_state.clone()));

    // Bind before reporting the service as running so that a taken port is fatal
    let listener = server.bind().await?;

    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    info!("Image Arena is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received, beginning graceful shutdown...");
            server.stop();
        }
        result = &mut server_task => {
            return match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("HTTP server stopped unexpectedly")),
                Ok(Err(e)) => Err(e.context("HTTP server failed")),
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
    }

    match tokio::time::timeout(config.shutdown_timeout(), server_task).await {
        Ok(Ok(Ok(()))) => info!("Graceful shutdown completed successfully"),
        Ok(Ok(Err(e))) => warn!("HTTP server ended with an error: {:#}", e),
        Ok(Err(e)) => warn!("HTTP server task ended abnormally: {}", e),
        Err(_) => warn!("Shutdown timeout exceeded, forcing exit"),
    }

    info!("Image Arena stopped");
    Ok(())
}

/// Run a one-shot command against the configured store
fn run_command(command: Command, mut config: AppConfig) -> Result<()> {
    // One-shot commands only discover when asked to
    config.images.auto_discover = false;
    let default_dir = config.images.directory.clone();

    let app_state = AppState::new(config)?;

    match command {
        Command::Serve => anyhow::bail!("serve runs as the long-lived service"),
        Command::Seed { dir } => {
            let dir = dir.unwrap_or(default_dir);
            let report = app_state.seed_directory(&dir)?;
            println!(
                "Seeded {}: {} image(s) found, {} new, {} total",
                dir.display(),
                report.discovered,
                report.inserted,
                app_state.item_count()?
            );
        }
        Command::Matchup => {
            let (first, second) = app_state.require_matchup()?;
            println!("#{} {} ({})", first.id, first.label, first.url);
            println!("  vs");
            println!("#{} {} ({})", second.id, second.label, second.url);
        }
        Command::Vote { winner, loser } => {
            let update = app_state.vote(VoteRequest {
                winner_id: winner,
                loser_id: loser,
            })?;
            println!(
                "#{}: {:.1} -> {:.1} ({:+.1})",
                update.winner.id,
                update.winner.old_rating,
                update.winner.new_rating,
                update.winner.delta()
            );
            println!(
                "#{}: {:.1} -> {:.1} ({:+.1})",
                update.loser.id,
                update.loser.old_rating,
                update.loser.new_rating,
                update.loser.delta()
            );
        }
        Command::Leaderboard => {
            for (rank, entry) in app_state.leaderboard()?.iter().enumerate() {
                println!("{:>4}. {:>5}  {}  {}", rank + 1, entry.rating, entry.label, entry.url);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    match args.command {
        None | Some(Command::Serve) => serve(config).await,
        Some(command) => run_command(command, config),
    }
}
