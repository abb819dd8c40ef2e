use super::App;
use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use potwheel_core::{BalanceStore, PaymentStore, SqliteBalanceStore, SqlitePaymentStore};

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Show an owner's balance
    Show {
        /// Owner id (defaults to --owner)
        owner: Option<String>,
    },
    /// Add funds to an owner's balance
    Topup {
        /// Amount to add
        amount: f64,
        /// Owner id (defaults to --owner)
        owner: Option<String>,
    },
    /// List every known balance
    List,
}

pub async fn handle_balance_command(cmd: BalanceCommands, app: &App) -> Result<()> {
    match cmd {
        BalanceCommands::Show { owner } => {
            let owner = app.owner_or_default(owner)?;
            let balance = app.balances.balance(&owner).await?;

            println!("Balance for '{}': {:.2} TON", owner, balance);

            let payments = SqlitePaymentStore::new(app.storage.clone())
                .payments_for_owner(&owner)
                .await?;
            if !payments.is_empty() {
                let total: f64 = payments.iter().map(|p| p.credited).sum();
                println!("  Paid in: {:.2} TON over {} payments", total, payments.len());
            }
        }

        BalanceCommands::Topup { amount, owner } => {
            let owner = app.owner_or_default(owner)?;
            let balance = app.balances.top_up(&owner, amount).await?;

            println!("Topped up {:.2} TON for '{}'", amount, owner);
            println!("New balance: {:.2} TON", balance);
        }

        BalanceCommands::List => {
            let entries = SqliteBalanceStore::new(app.storage.clone())
                .list_balances()
                .await?;

            if entries.is_empty() {
                println!("No balances yet.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Owner", "Balance", "Updated"]);

            for entry in entries {
                table.add_row(vec![
                    entry.owner_id.to_string(),
                    format!("{:.2}", entry.balance),
                    entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }

            println!("{}", table);
        }
    }

    Ok(())
}
