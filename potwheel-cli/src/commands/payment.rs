use super::App;
use anyhow::Result;
use clap::Subcommand;
use potwheel_core::SuccessfulPayment;

#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Apply a successful payment reported by the payment provider
    Record {
        /// Provider charge id
        charge_id: String,
        /// Paid amount in the provider's smallest unit
        total_amount: u64,
        /// Currency code
        #[arg(short, long, default_value = "XTR")]
        currency: String,
        /// Owner id (defaults to --owner)
        owner: Option<String>,
    },
    /// Show whether an owner has made any payments
    Status {
        /// Owner id (defaults to --owner)
        owner: Option<String>,
    },
}

pub async fn handle_payment_command(cmd: PaymentCommands, app: &App) -> Result<()> {
    let payments = app.payments();

    match cmd {
        PaymentCommands::Record {
            charge_id,
            total_amount,
            currency,
            owner,
        } => {
            let owner = app.owner_or_default(owner)?;
            let payment = SuccessfulPayment {
                charge_id: charge_id.clone(),
                total_amount,
                currency,
            };

            match payments.apply(&owner, payment).await? {
                Some(balance) => {
                    println!("Payment successful!");
                    println!("Balance of '{}' is now {:.2} TON", owner, balance);
                }
                None => println!("Payment {} was already applied", charge_id),
            }
        }

        PaymentCommands::Status { owner } => {
            let owner = app.owner_or_default(owner)?;
            if payments.has_payments(&owner).await? {
                println!("'{}' has made payments", owner);
            } else {
                println!("'{}' has not made any payments yet", owner);
            }
        }
    }

    Ok(())
}
