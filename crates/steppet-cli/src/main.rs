//! Headless command-line host for the `StepPet` state engine.
//!
//! Each invocation opens a session over the file store, applies one
//! trigger, and exits. Notifications are written to the log as JSON, and
//! `status` prints the derived figures a presentation layer would render.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `steppet-config.yaml` (or `--config`)
//! 3. Open a session over the file store in `storage.data_dir`
//! 4. Apply the requested trigger
//! 5. For `watch`, tick until the battle resolves or Ctrl-C

mod error;
mod sink;
mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use steppet_core::clock::SystemClock;
use steppet_core::config::EngineConfig;
use steppet_core::repository::StateRepository;
use steppet_core::rules::PetRules;
use steppet_core::session::PetSession;
use steppet_store::FileStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::sink::LogSink;
use crate::watch::{WatchOutcome, watch_battle};

type Session = PetSession<FileStore, SystemClock, LogSink>;

/// Headless host for the `StepPet` companion.
#[derive(Parser)]
#[command(name = "steppet", version, about = "Headless host for the StepPet companion")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "steppet-config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the record and its derived figures as JSON
    Status,

    /// Apply today's cumulative step count
    Sync {
        /// Step count (leading digits are used, e.g. "1200 steps")
        #[arg(required_unless_present = "query")]
        steps: Option<String>,
        /// Take the count from a query string such as "?steps=1234"
        #[arg(long, conflicts_with = "steps")]
        query: Option<String>,
    },

    /// Rename the companion
    Rename {
        /// New name (trimmed, at most `pet.max_name_len` characters)
        name: String,
    },

    /// Select a lineage
    Lineage {
        /// Lineage key, e.g. forest, ocean, ember, sky
        key: String,
    },

    /// Battle triggers
    Battle {
        #[command(subcommand)]
        command: BattleCommands,
    },

    /// Recompute a running battle once
    Tick,

    /// Tick until the running battle resolves or Ctrl-C
    Watch,

    /// Delete the stored record (the next run starts fresh)
    Clear,
}

#[derive(Subcommand)]
enum BattleCommands {
    /// Start an available battle
    Start,
    /// Open the battle screen
    Open,
    /// Close the battle screen, acknowledging any result
    Close,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, a step reading is
/// unusable, or output cannot be produced.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        key = %config.storage.key,
        tick_interval_ms = config.session.tick_interval_ms,
        "configuration loaded"
    );

    if matches!(cli.command, Commands::Clear) {
        clear(&config)?;
        return Ok(());
    }

    let mut session = open_session(&config)?;
    run(&mut session, cli.command, &config).await?;
    Ok(())
}

/// Load and validate the configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &Path) -> Result<EngineConfig, CliError> {
    let config = EngineConfig::from_file_or_default(path)?;
    config.validate()?;
    Ok(config)
}

fn open_session(config: &EngineConfig) -> Result<Session, CliError> {
    let store = FileStore::new(&config.storage.data_dir);
    let clock = SystemClock::with_offset_minutes(config.session.utc_offset_minutes);
    Ok(PetSession::open(config, store, clock, LogSink::default())?)
}

fn clear(config: &EngineConfig) -> Result<(), CliError> {
    let rules = PetRules::from_config(config)?;
    let store = FileStore::new(&config.storage.data_dir);
    let mut repository = StateRepository::new(
        store,
        SystemClock::default(),
        config.storage.key.clone(),
        rules,
    );
    repository.clear()?;
    Ok(())
}

async fn run(
    session: &mut Session,
    command: Commands,
    config: &EngineConfig,
) -> Result<(), CliError> {
    match command {
        Commands::Status | Commands::Clear => {}
        Commands::Sync { steps, query } => {
            let applied = match (steps, query) {
                (_, Some(query)) => session
                    .sync_from_query(&query)
                    .ok_or(CliError::InvalidReading { input: query })?,
                (Some(steps), None) => session
                    .sync_from_text(&steps)
                    .ok_or(CliError::InvalidReading { input: steps })?,
                (None, None) => {
                    return Err(CliError::InvalidReading {
                        input: String::new(),
                    });
                }
            };
            info!(
                delta = applied.delta,
                steps_today = applied.steps_today,
                battle_unlocked = applied.battle_unlocked,
                "steps synced"
            );
        }
        Commands::Rename { name } => {
            let stored = session.rename(&name);
            info!(name = stored, "renamed");
        }
        Commands::Lineage { key } => session.change_lineage(&key),
        Commands::Battle { command } => match command {
            BattleCommands::Start => {
                if !session.start_battle() {
                    warn!(phase = ?session.phase(), "no battle available to start");
                }
            }
            BattleCommands::Open => session.open_battle_screen(),
            BattleCommands::Close => {
                session.close_battle_screen();
            }
        },
        Commands::Tick => {
            if let Some(result) = session.tick() {
                info!(?result, "battle resolved");
            }
        }
        Commands::Watch => {
            let interval = Duration::from_millis(config.session.tick_interval_ms);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            match watch_battle(session, interval, shutdown).await {
                WatchOutcome::NotRunning => warn!("no battle in progress"),
                WatchOutcome::Resolved(result) => info!(?result, "battle over"),
                WatchOutcome::Interrupted => {}
            }
        }
    }

    let status = serde_json::to_string_pretty(&session.status())?;
    println!("{status}");
    Ok(())
}
