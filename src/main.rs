//! # Renewly: subscription reminder daemon
//!
//! Usage:
//!   renewly run                      # Tick on the configured interval until Ctrl-C
//!   renewly tick                     # Run one scheduling tick and exit
//!   renewly init-db                  # Create the database and a default config
//!   renewly summary --user-id 1      # Print a user's dashboard summary as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use renewly_channels::SenderRegistry;
use renewly_core::RenewlyConfig;
use renewly_scheduler::{PlaceholderRenderer, SchedulerEngine, SqliteStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "renewly",
    version,
    about = "🔔 Renewly: subscription billing reminders"
)]
struct Cli {
    /// Config file (default: ~/.renewly/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler loop
    Run,
    /// Run a single tick and print the report
    Tick,
    /// Create the database schema and write a default config if none exists
    InitDb,
    /// Print the dashboard summary for one user
    Summary {
        #[arg(long)]
        user_id: i64,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn load_config(path: Option<&Path>) -> Result<RenewlyConfig> {
    let config = match path {
        Some(path) => RenewlyConfig::load_from(path)?,
        None => RenewlyConfig::load()?,
    };
    Ok(config)
}

fn open_store(config: &RenewlyConfig) -> Result<Arc<SqliteStore>> {
    let db_path = expand_path(&config.database.path);
    let store = SqliteStore::open(Path::new(&db_path))
        .with_context(|| format!("opening database at {db_path}"))?;
    Ok(Arc::new(store))
}

fn build_engine(config: &RenewlyConfig, store: Arc<SqliteStore>) -> Result<SchedulerEngine> {
    let timeout = Duration::from_secs(config.scheduler.send_timeout_secs);
    let senders = SenderRegistry::with_defaults(timeout)?;
    let engine = SchedulerEngine::new(config, store, Arc::new(senders), Arc::new(PlaceholderRenderer))?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "renewly=debug,renewly_scheduler=debug,renewly_channels=debug"
    } else {
        "renewly=info,renewly_scheduler=info,renewly_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::InitDb => {
            open_store(&config)?;
            println!("✅ Database ready at {}", expand_path(&config.database.path));
            if cli.config.is_none() && !RenewlyConfig::default_path().exists() {
                config.save()?;
                println!("📝 Default config written to {}", RenewlyConfig::default_path().display());
            }
        }
        Command::Tick => {
            let engine = build_engine(&config, open_store(&config)?)?;
            let report = engine.run_tick(chrono::Utc::now()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Summary { user_id } => {
            let store = open_store(&config)?;
            let today = renewly_scheduler::today_in(chrono::Utc::now(), config.scheduler.timezone()?);
            let summary = renewly_scheduler::dashboard_summary(store.as_ref(), user_id, today).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Run => {
            let engine = build_engine(&config, open_store(&config)?)?;
            tracing::info!("🔔 Renewly v{} starting", env!("CARGO_PKG_VERSION"));
            tokio::select! {
                _ = renewly_scheduler::spawn_scheduler(engine, config.scheduler.tick_interval_secs) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("👋 Shutting down");
                }
            }
        }
    }
    Ok(())
}
