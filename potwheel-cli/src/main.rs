mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use potwheel_core::{GameConfig, OwnerId, Storage};
use potwheel_game::GameError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "potwheel")]
#[command(about = "Pot wheel - stake-weighted multiplayer jackpot")]
#[command(version)]
struct Cli {
    /// Data directory for the game database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Owner id used when a command needs one and none is given
    #[arg(short, long, global = true)]
    owner: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Balance commands
    #[command(subcommand)]
    Balance(commands::BalanceCommands),

    /// Payment commands
    #[command(subcommand)]
    Payment(commands::PaymentCommands),

    /// Show settled rounds, only the owner's when --owner is given
    History {
        /// Maximum number of rounds to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Interactive session: place bets and spin the wheel
    Play,

    /// Run one round from bets given on the command line
    Round {
        /// Bet as name:amount[:currency[:owner]], repeat for each participant
        #[arg(short, long = "bet", required = true)]
        bets: Vec<commands::BetArg>,
        /// Seed for a reproducible draw
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut cli_config = CliConfig::default();
    if let Some(data_dir) = cli.data_dir {
        cli_config.data_dir = data_dir;
    }
    cli_config.default_owner = cli.owner.map(OwnerId::new);
    cli_config.verbose = cli.verbose;

    // Initialize logging
    let log_level = if cli_config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "potwheel={},potwheel_game={},potwheel_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&cli_config.data_dir).await?;
    tracing::debug!("Using data directory {}", cli_config.data_dir.display());

    let game_config = GameConfig::load(&cli_config.game_config_path())?;
    let storage = Arc::new(Storage::new(&cli_config.db_path()).await?);
    let app = commands::App::new(storage, game_config, cli_config);

    // Execute command
    let result = match cli.command {
        Commands::Balance(cmd) => commands::handle_balance_command(cmd, &app).await,
        Commands::Payment(cmd) => commands::handle_payment_command(cmd, &app).await,
        Commands::History { limit } => commands::show_history(&app, limit).await,
        Commands::Play => commands::play_interactive(&app).await,
        Commands::Round { bets, seed } => commands::run_round(&app, bets, seed).await,
    };

    if let Err(e) = result {
        report_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<GameError>() {
        Some(GameError::InsufficientFunds { need, available }) => {
            eprintln!("Error: Insufficient funds");
            eprintln!("Need: {:.2}, Available: {:.2}", need, available);
            eprintln!("Use 'potwheel balance topup' to add funds");
        }
        Some(GameError::InsufficientParticipants { bets, bank }) => {
            eprintln!("Error: Not enough participants to spin");
            eprintln!("Bets: {}, Bank: {:.2}", bets, bank);
            eprintln!("A round needs at least two bets and a positive bank");
        }
        _ => eprintln!("Error: {}", e),
    }
}
