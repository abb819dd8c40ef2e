use crate::error::{PotwheelError, Result};
use crate::storage::Storage;
use crate::types::{is_valid_amount, BalanceEntry, OwnerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

/// Spendable funds per owner
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Current balance, zero for an owner never seen before
    async fn balance(&self, owner: &OwnerId) -> Result<f64>;

    /// Apply `delta` (possibly negative) and return the new balance
    async fn adjust_balance(&self, owner: &OwnerId, delta: f64) -> Result<f64>;

    /// Credit a positive amount, rejecting anything else
    async fn top_up(&self, owner: &OwnerId, amount: f64) -> Result<f64> {
        if !is_valid_amount(amount) {
            return Err(PotwheelError::InvalidAmount(amount));
        }
        self.adjust_balance(owner, amount).await
    }
}

pub struct SqliteBalanceStore {
    storage: Arc<Storage>,
}

impl SqliteBalanceStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_balances(&self) -> Result<Vec<BalanceEntry>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT owner_id, balance, updated_at FROM balances ORDER BY balance DESC",
        )?;

        let entry_iter = stmt.query_map([], |row| {
            let owner_id: String = row.get(0)?;
            Ok(BalanceEntry {
                owner_id: OwnerId::new(owner_id),
                balance: row.get(1)?,
                updated_at: DateTime::from_timestamp(row.get(2)?, 0).unwrap_or_else(Utc::now),
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }
}

#[async_trait]
impl BalanceStore for SqliteBalanceStore {
    async fn balance(&self, owner: &OwnerId) -> Result<f64> {
        let conn = self.storage.get_connection().await;

        let balance: Option<f64> = conn
            .query_row(
                "SELECT balance FROM balances WHERE owner_id = ?1",
                params![owner.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(balance.unwrap_or(0.0))
    }

    async fn adjust_balance(&self, owner: &OwnerId, delta: f64) -> Result<f64> {
        if !delta.is_finite() {
            return Err(PotwheelError::InvalidAmount(delta));
        }

        // Upsert and read back under one connection guard
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO balances (owner_id, balance, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id) DO UPDATE SET
                balance = balance + excluded.balance,
                updated_at = excluded.updated_at",
            params![owner.as_str(), delta, Utc::now().timestamp()],
        )?;

        let balance: f64 = conn.query_row(
            "SELECT balance FROM balances WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;

        tracing::debug!("Balance of {} adjusted by {:.2} to {:.2}", owner, delta, balance);
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteBalanceStore {
        SqliteBalanceStore::new(Arc::new(Storage::in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn test_unknown_owner_has_zero_balance() {
        let store = store().await;
        assert_eq!(store.balance(&OwnerId::new("nobody")).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_adjust_balance_accumulates() {
        let store = store().await;
        let owner = OwnerId::new("alice");

        assert_eq!(store.adjust_balance(&owner, 5.0).await.unwrap(), 5.0);
        assert_eq!(store.adjust_balance(&owner, -1.5).await.unwrap(), 3.5);
        assert_eq!(store.balance(&owner).await.unwrap(), 3.5);
    }

    #[tokio::test]
    async fn test_top_up_rejects_non_positive() {
        let store = store().await;
        let owner = OwnerId::new("alice");

        assert!(matches!(
            store.top_up(&owner, 0.0).await,
            Err(PotwheelError::InvalidAmount(_))
        ));
        assert!(matches!(
            store.top_up(&owner, f64::NAN).await,
            Err(PotwheelError::InvalidAmount(_))
        ));
        assert_eq!(store.top_up(&owner, 10.0).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn test_concurrent_adjustments_are_not_lost() {
        let store = Arc::new(store().await);
        let owner = OwnerId::new("bob");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                store.adjust_balance(&owner, 0.5).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!((store.balance(&owner).await.unwrap() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_list_balances_ordered() {
        let store = store().await;
        store.adjust_balance(&OwnerId::new("a"), 1.0).await.unwrap();
        store.adjust_balance(&OwnerId::new("b"), 3.0).await.unwrap();

        let entries = store.list_balances().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].owner_id, OwnerId::new("b"));
    }
}
