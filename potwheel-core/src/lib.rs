//! Pot wheel core - storage, balances, payments and configuration
//!
//! Everything the game needs from the outside world sits behind the
//! `BalanceStore`, `HistoryStore` and `PaymentStore` traits, with SQLite
//! implementations sharing one `Storage` handle.

pub mod config;
pub mod error;
pub mod payments;
pub mod storage;
pub mod types;

pub use config::{GameConfig, SpinPolicy};
pub use error::{PotwheelError, Result};
pub use payments::PaymentService;
pub use storage::{
    BalanceStore, HistoryStore, PaymentStore, RoundRecord, SqliteBalanceStore,
    SqliteHistoryStore, SqlitePaymentStore, Storage,
};
pub use types::{Bet, CurrencyKind, OwnerId, PaymentRecord, SuccessfulPayment};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_stores_share_one_database() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&temp_dir.path().join("potwheel.db")).await.unwrap());

        let balances = SqliteBalanceStore::new(storage.clone());
        let owner = OwnerId::new("shared");
        balances.top_up(&owner, 1.25).await.unwrap();

        // A second handle over the same file sees the committed balance
        drop(balances);
        drop(storage);
        let reopened = Arc::new(Storage::new(&temp_dir.path().join("potwheel.db")).await.unwrap());
        let balances = SqliteBalanceStore::new(reopened);
        assert_eq!(balances.balance(&owner).await.unwrap(), 1.25);
    }
}
