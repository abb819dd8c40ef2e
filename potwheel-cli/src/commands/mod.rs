pub mod balance;
pub mod history;
pub mod payment;
pub mod play;

pub use balance::{handle_balance_command, BalanceCommands};
pub use history::show_history;
pub use payment::{handle_payment_command, PaymentCommands};
pub use play::{play_interactive, run_round, BetArg};

use crate::config::CliConfig;
use anyhow::{anyhow, Result};
use potwheel_core::{
    BalanceStore, GameConfig, HistoryStore, OwnerId, PaymentService, SqliteBalanceStore,
    SqliteHistoryStore, SqlitePaymentStore, Storage,
};
use std::sync::Arc;

/// Shared handles for every command
pub struct App {
    pub storage: Arc<Storage>,
    pub game_config: GameConfig,
    pub cli_config: CliConfig,
    pub balances: Arc<dyn BalanceStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl App {
    pub fn new(storage: Arc<Storage>, game_config: GameConfig, cli_config: CliConfig) -> Self {
        let balances: Arc<dyn BalanceStore> = Arc::new(SqliteBalanceStore::new(storage.clone()));
        let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::new(storage.clone()));

        Self {
            storage,
            game_config,
            cli_config,
            balances,
            history,
        }
    }

    pub fn payments(&self) -> PaymentService {
        PaymentService::new(
            Arc::new(SqlitePaymentStore::new(self.storage.clone())),
            self.balances.clone(),
            self.game_config.stars_per_unit,
        )
    }

    /// Explicit owner, falling back to the global --owner flag
    pub fn owner_or_default(&self, owner: Option<String>) -> Result<OwnerId> {
        owner
            .map(OwnerId::new)
            .or_else(|| self.cli_config.default_owner.clone())
            .ok_or_else(|| anyhow!("No owner given, pass one or use --owner"))
    }
}
