use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swiss_tournament::config::AppConfig;
use swiss_tournament::models::PlayerId;
use swiss_tournament::storage::{SqliteStore, TournamentStore};
use swiss_tournament::SwissPairing;

#[derive(Parser)]
#[command(name = "swiss")]
#[command(about = "Swiss-system tournament player tracking and pairing")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./swiss.toml")]
    config: PathBuf,

    /// Database URL (overrides the config file)
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new player
    Register {
        /// Player name (markup is stripped)
        name: String,
    },

    /// Record the outcome of a match
    Report {
        /// Id of the player who won
        winner: PlayerId,

        /// Id of the player who lost
        loser: PlayerId,
    },

    /// Show the ranked standings
    Standings,

    /// Show pairings for the next round
    Pairings,

    /// List registered players
    Players,

    /// Show a player's wins and matches played
    Score { id: PlayerId },

    /// Count registered players
    Count,

    /// Delete all match records and reset counters
    ResetMatches,

    /// Delete all matches and players
    ResetPlayers,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Starting swiss v{}", env!("CARGO_PKG_VERSION"));

    let store = SqliteStore::connect(&config).await?;
    let engine = SwissPairing::new(store);

    match cli.command {
        Commands::Register { name } => {
            let id = engine.store().register_player(&name).await?;
            if cli.json {
                print_json(&serde_json::json!({ "id": id }))?;
            } else {
                println!("Registered player {}", id);
            }
        }

        Commands::Report { winner, loser } => {
            engine.store().report_match(winner, loser).await?;
            if !cli.json {
                println!("Recorded: {} beat {}", winner, loser);
            }
        }

        Commands::Standings => {
            let standings = engine.standings().await?;
            if cli.json {
                print_json(&standings)?;
            } else if standings.is_empty() {
                println!("No players registered.");
            } else {
                println!("{:>5}  {:<30} {:>5} {:>7}", "ID", "NAME", "WINS", "MATCHES");
                for s in &standings {
                    println!("{:>5}  {:<30} {:>5} {:>7}", s.id, s.name, s.wins, s.matches);
                }
            }
        }

        Commands::Pairings => {
            let pairings = engine.pairings().await?;
            if cli.json {
                print_json(&pairings)?;
            } else if pairings.is_empty() {
                println!("Not enough players to pair.");
            } else {
                for (board, p) in pairings.iter().enumerate() {
                    println!(
                        "Board {}: {} ({}) vs {} ({})",
                        board + 1,
                        p.name1,
                        p.id1,
                        p.name2,
                        p.id2
                    );
                }
            }
        }

        Commands::Players => {
            let players = engine.store().get_players().await?;
            if cli.json {
                print_json(&players)?;
            } else {
                for (id, name) in &players {
                    println!("{:>5}  {}", id, name);
                }
            }
        }

        Commands::Score { id } => {
            let player = engine.store().get_player(id).await?;
            if cli.json {
                print_json(&player)?;
            } else {
                println!(
                    "{} ({}): {} wins, {} matches",
                    player.name, player.id, player.wins, player.matches
                );
            }
        }

        Commands::Count => {
            let count = engine.store().count_players().await?;
            if cli.json {
                print_json(&serde_json::json!({ "players": count }))?;
            } else {
                println!("{}", count);
            }
        }

        Commands::ResetMatches => {
            engine.store().reset_matches().await?;
            if !cli.json {
                println!("All matches deleted.");
            }
        }

        Commands::ResetPlayers => {
            engine.store().reset_players().await?;
            if !cli.json {
                println!("All players and matches deleted.");
            }
        }
    }

    engine.store().close().await;
    Ok(())
}
