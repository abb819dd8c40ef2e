use crate::error::Result;
use crate::storage::Storage;
use crate::types::{OwnerId, PaymentRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::sync::Arc;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Store a payment; false when the charge id was already recorded
    async fn record_payment(&self, record: &PaymentRecord) -> Result<bool>;

    /// Forget a recorded charge so it can be applied again
    async fn remove_payment(&self, charge_id: &str) -> Result<()>;

    async fn has_payments(&self, owner: &OwnerId) -> Result<bool>;

    async fn payments_for_owner(&self, owner: &OwnerId) -> Result<Vec<PaymentRecord>>;
}

pub struct SqlitePaymentStore {
    storage: Arc<Storage>,
}

impl SqlitePaymentStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn record_payment(&self, record: &PaymentRecord) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO payments (charge_id, owner_id, amount, currency, credited, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.charge_id,
                record.owner_id.as_str(),
                record.amount as i64,
                record.currency,
                record.credited,
                record.timestamp.timestamp(),
            ],
        )?;

        Ok(inserted == 1)
    }

    async fn remove_payment(&self, charge_id: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute("DELETE FROM payments WHERE charge_id = ?1", params![charge_id])?;

        Ok(())
    }

    async fn has_payments(&self, owner: &OwnerId) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM payments WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    async fn payments_for_owner(&self, owner: &OwnerId) -> Result<Vec<PaymentRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT charge_id, owner_id, amount, currency, credited, created_at
             FROM payments WHERE owner_id = ?1 ORDER BY created_at DESC",
        )?;

        let payment_iter = stmt.query_map(params![owner.as_str()], |row| {
            let owner_id: String = row.get(1)?;
            let amount: i64 = row.get(2)?;
            Ok(PaymentRecord {
                charge_id: row.get(0)?,
                owner_id: OwnerId::new(owner_id),
                amount: amount as u64,
                currency: row.get(3)?,
                credited: row.get(4)?,
                timestamp: DateTime::from_timestamp(row.get(5)?, 0).unwrap_or_else(Utc::now),
            })
        })?;

        let mut payments = Vec::new();
        for payment in payment_iter {
            payments.push(payment?);
        }

        Ok(payments)
    }
}
