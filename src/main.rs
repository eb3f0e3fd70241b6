//! Main entry point for the standings ranker service
//!
//! Loads configuration, optionally seeds standings from a JSON file, and
//! serves the points-table API until a shutdown signal arrives.

use anyhow::{Context, Result};
use clap::Parser;
use standings_ranker::config::AppConfig;
use standings_ranker::service::{AppState, HealthCheck, HealthStatus};
use standings_ranker::store::RecordStore;
use standings_ranker::types::TeamStanding;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Standings Ranker - points tables and group standings for team tournaments
#[derive(Parser)]
#[command(
    name = "standings-ranker",
    version,
    about = "Points-table ranking and group standings service for team esports tournaments",
    long_about = "Standings Ranker keeps tournament points tables: teams are ranked by points, \
                 then kills, then wins, optionally split into groups that are assigned \
                 round-robin, and live tables refresh as admins edit results."
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

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Standings to load at startup
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON array of team standings to load into the store"
    )]
    seed: Option<PathBuf>,

    /// Print ranked tables and exit
    #[arg(long, help = "Rank every seeded tournament, print the tables as JSON and exit")]
    print: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
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
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Read a JSON array of standings
fn load_seed(path: &Path) -> Result<Vec<TeamStanding>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))
}

/// Rank every stored tournament and print the tables
fn print_tables(app_state: &AppState) -> Result<()> {
    let service = app_state.standings();
    let options = service.default_options();

    let mut tables = Vec::new();
    for tournament_id in app_state.store().tournament_ids()? {
        tables.push(service.current_table(tournament_id, &options)?);
    }

    println!("{}", serde_json::to_string_pretty(&tables)?);
    Ok(())
}

/// Perform health check and return appropriate exit code
async fn perform_health_check(app_state: Arc<AppState>) -> Result<()> {
    info!("Performing health check...");
    app_state.set_running(true).await;

    match HealthCheck::check(app_state).await {
        Ok(health) => {
            println!("Health Check: {}", health.status);
            println!("  Tournaments: {}", health.stats.tournaments);
            println!("  Standings: {}", health.stats.standings);

            if health.status == HealthStatus::Healthy {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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

/// Run periodic health checks
async fn health_check_task(app_state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while app_state.is_running().await {
        interval.tick().await;

        match HealthCheck::check(app_state.clone()).await {
            Ok(health) => {
                info!(
                    "Health check: {} - {} tournaments, {} standings",
                    health.status, health.stats.tournaments, health.stats.standings
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🏆 Standings Ranker");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP: {}", config.http_addr());
    info!("   Rank mode: {}", config.ranking.mode);
    info!("   Group count: {}", config.ranking.group_count);
    info!("   Podium size: {}", config.ranking.podium_size);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file, environment and CLI arguments
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

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    standings_ranker::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
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

    let app_state = match AppState::new(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(seed_path) = &args.seed {
        let standings = load_seed(seed_path)?;
        app_state.seed(standings)?;
    }

    if args.health_check {
        return perform_health_check(app_state).await;
    }

    if args.print {
        return print_tables(&app_state);
    }

    display_startup_banner(&config);

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            health_check_task(app_state).await;
        })
    };

    info!("✅ Standings Ranker is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    if let Err(e) = app_state.shutdown().await {
        warn!("Shutdown finished with errors: {}", e);
    }

    info!("🛑 Standings Ranker stopped");
    Ok(())
}
