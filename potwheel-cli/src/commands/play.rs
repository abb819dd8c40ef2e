use super::App;
use anyhow::{anyhow, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::{Input, Select};
use potwheel_core::{CurrencyKind, GameConfig, OwnerId};
use potwheel_game::{
    BetInput, GameError, RandomSource, RoundManager, RoundSnapshot, SeededRandom, Settlement,
    ThreadRandom,
};
use std::str::FromStr;
use std::time::Duration;

/// Bet given on the command line as `name:amount[:currency[:owner]]`
#[derive(Debug, Clone)]
pub struct BetArg(BetInput);

impl FromStr for BetArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default();
        let amount = parts
            .next()
            .ok_or_else(|| format!("missing amount in '{}'", s))
            .and_then(parse_amount)?;
        let currency = match parts.next() {
            Some(c) if !c.is_empty() => c.parse::<CurrencyKind>()?,
            _ => CurrencyKind::Ton,
        };

        let mut input = BetInput::new(name, amount, currency);
        if let Some(owner) = parts.next().filter(|o| !o.is_empty()) {
            input = input.with_owner(OwnerId::new(owner));
        }

        if parts.next().is_some() {
            return Err(format!("too many fields in '{}'", s));
        }

        Ok(Self(input))
    }
}

/// Accepts a decimal comma as well as a point
fn parse_amount(raw: &str) -> std::result::Result<f64, String> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("invalid amount '{}'", raw))
}

async fn round_manager(app: &App, config: GameConfig, seed: Option<u64>) -> Result<RoundManager> {
    let rng: Box<dyn RandomSource> = match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };

    let manager = RoundManager::continue_from_history(
        config,
        app.balances.clone(),
        app.history.clone(),
        rng,
    )
    .await?;
    Ok(manager)
}

fn print_pot(snapshot: &RoundSnapshot) {
    println!(
        "Round #{}  |  Players: {}  |  Bank: {:.2}  |  Hash: {}",
        snapshot.round_id,
        snapshot.bets.len(),
        snapshot.bank,
        snapshot.fingerprint
    );

    if snapshot.participants.is_empty() {
        println!("No bets yet. Be the first player!");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player", "Amount", "Currency", "Chance"]);

    for (i, row) in snapshot.participants.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            row.name.clone(),
            format!("{:.2}", row.amount),
            row.currency.label().to_string(),
            row.chance_display(),
        ]);
    }

    println!("{}", table);

    if snapshot.can_resolve {
        println!("Ready to spin");
    } else {
        println!("Waiting for players");
    }
}

async fn present(settlement: &Settlement, spin_duration: Duration) {
    println!("Spinning the wheel...");
    tokio::time::sleep(spin_duration).await;

    let outcome = &settlement.outcome;
    println!();
    println!("Winner: {}", outcome.winner.participant_name);
    println!("  Round: #{}", settlement.round_id);
    println!("  Bank: {:.2}", outcome.bank);
    println!(
        "  Draw: {:.4} of {:.4} (slot {} of {})",
        outcome.draw_point,
        outcome.bank,
        outcome.winner_index + 1,
        outcome.slices.len()
    );
    println!(
        "  Wheel: {} full spins, stops at {:.1} deg",
        outcome.full_spins, settlement.wheel_rotation_degrees
    );
    println!("  Hash: {}", settlement.fingerprint);

    match (&outcome.winner.owner_id, settlement.winner_balance) {
        (Some(owner), Some(balance)) => {
            println!("  Credited to '{}', balance now {:.2}", owner, balance)
        }
        _ => println!("  Anonymous winner, nothing credited"),
    }
}

/// Give back stakes of a round that will not be spun
async fn refund_open_round(manager: &RoundManager) -> Result<()> {
    let refunded = manager.abandon().await?;
    if refunded > 0.0 {
        println!("Open bets cancelled, {:.2} refunded", refunded);
    }
    Ok(())
}

/// Run one round from command-line bets, without presentation delays.
///
/// If any bet is rejected or the spin fails, the bets already placed are
/// refunded before the error is returned.
pub async fn run_round(app: &App, bets: Vec<BetArg>, seed: Option<u64>) -> Result<()> {
    let manager = round_manager(app, app.game_config.clone(), seed).await?;

    if let Err(e) = place_and_spin(app, &manager, bets).await {
        if let Err(refund) = refund_open_round(&manager).await {
            tracing::error!("Failed to refund round {}: {}", manager.round_id().await, refund);
        }
        return Err(e);
    }

    Ok(())
}

async fn place_and_spin(app: &App, manager: &RoundManager, bets: Vec<BetArg>) -> Result<()> {
    let default_owner = app.cli_config.default_owner.clone();

    for BetArg(mut input) in bets {
        if input.owner_id.is_none() {
            input.owner_id = default_owner.clone();
        }
        let bet = manager.submit(input).await?;
        println!(
            "Bet placed: {} - {:.2} {}",
            bet.participant_name,
            bet.amount,
            bet.currency.suffix()
        );
    }

    print_pot(&manager.snapshot().await);

    let settlement = manager
        .resolve()
        .await?
        .ok_or_else(|| anyhow!("Round was not open"))?;
    present(&settlement, Duration::ZERO).await;

    Ok(())
}

/// Interactive session over one long-lived round manager.
///
/// Bets still in the pot when the session ends are refunded.
pub async fn play_interactive(app: &App) -> Result<()> {
    let config = app.game_config.clone();
    let spin_duration = config.spin_duration;
    let manager = round_manager(app, config, None).await?;

    let session = interactive_session(app, &manager, spin_duration).await;
    let refund = refund_open_round(&manager).await;
    session?;
    refund
}

async fn interactive_session(
    app: &App,
    manager: &RoundManager,
    spin_duration: Duration,
) -> Result<()> {
    let actions = ["Place bet", "Show pot", "Spin the wheel", "Quit"];
    let currencies = [CurrencyKind::Ton, CurrencyKind::Star, CurrencyKind::Gift];

    loop {
        let choice = Select::new()
            .with_prompt(format!("Round #{}", manager.round_id().await))
            .items(&actions)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                let name: String = Input::new()
                    .with_prompt("Nickname")
                    .allow_empty(true)
                    .interact_text()?;
                let raw_amount: String = Input::new().with_prompt("Amount").interact_text()?;
                let amount = match parse_amount(&raw_amount) {
                    Ok(amount) => amount,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                let currency = Select::new()
                    .with_prompt("Currency")
                    .items(&currencies.iter().map(|c| c.label()).collect::<Vec<_>>())
                    .default(0)
                    .interact()?;

                let mut input = BetInput::new(name, amount, currencies[currency]);
                if let Some(owner) = &app.cli_config.default_owner {
                    input = input.with_owner(owner.clone());
                }

                match manager.submit(input).await {
                    Ok(bet) => println!(
                        "Bet placed: {} - {:.2} {}",
                        bet.participant_name,
                        bet.amount,
                        bet.currency.suffix()
                    ),
                    Err(GameError::InvalidAmount(amount)) => {
                        println!("Amount must be a positive number, got {}", amount)
                    }
                    Err(GameError::InsufficientFunds { need, available }) => println!(
                        "Insufficient funds: need {:.2}, have {:.2}",
                        need, available
                    ),
                    Err(e) => return Err(e.into()),
                }
            }
            1 => print_pot(&manager.snapshot().await),
            2 => match manager.resolve().await {
                Ok(Some(settlement)) => {
                    present(&settlement, spin_duration).await;
                    manager.wait_for_next_round().await?;
                    println!();
                    println!("Round #{} is open", manager.round_id().await);
                }
                Ok(None) => println!("The wheel is already spinning"),
                Err(GameError::InsufficientParticipants { .. }) => {
                    println!("Need at least two bets to spin")
                }
                Err(e) => return Err(e.into()),
            },
            _ => return Ok(()),
        }
    }
}
