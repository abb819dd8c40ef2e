use super::App;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use potwheel_core::HistoryStore;

pub async fn show_history(app: &App, limit: usize) -> Result<()> {
    let mut rounds = match &app.cli_config.default_owner {
        Some(owner) => app.history.rounds_for_owner(owner).await?,
        None => app.history.recent_rounds(limit).await?,
    };
    rounds.truncate(limit);

    if rounds.is_empty() {
        println!("No settled rounds yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Players", "Bank", "Winner", "Hash", "Settled"]);

    for round in rounds {
        table.add_row(vec![
            round.round_id.to_string(),
            round.bets.len().to_string(),
            format!("{:.2}", round.bank),
            round.winner.participant_name.clone(),
            round.fingerprint.clone(),
            round.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
