pub mod balance_store;
pub mod history_store;
pub mod payment_store;

pub use balance_store::{BalanceStore, SqliteBalanceStore};
pub use history_store::{HistoryStore, RoundRecord, SqliteHistoryStore};
pub use payment_store::{PaymentStore, SqlitePaymentStore};

use crate::error::{PotwheelError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PotwheelError::internal(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn).await
    }

    /// Volatile database, dropped with the process
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        // Several processes may share one database file
        conn.busy_timeout(Duration::from_secs(5))?;

        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS balances (
                owner_id TEXT PRIMARY KEY,
                balance REAL NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Settled rounds, bets and winner kept as JSON snapshots
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                round_id INTEGER PRIMARY KEY,
                bets TEXT NOT NULL,
                winner TEXT NOT NULL,
                bank REAL NOT NULL,
                fingerprint TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS round_participants (
                round_id INTEGER NOT NULL,
                owner_id TEXT NOT NULL,
                FOREIGN KEY (round_id) REFERENCES rounds(round_id),
                PRIMARY KEY (round_id, owner_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS payments (
                charge_id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                currency TEXT NOT NULL,
                credited REAL NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_schema_created_on_disk() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("potwheel.db");
        let storage = Storage::new(&db_path).await.unwrap();

        let conn = storage.get_connection().await;
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('balances', 'rounds', 'round_participants', 'payments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("potwheel.db");
        drop(Storage::new(&db_path).await.unwrap());
        assert!(Storage::new(&db_path).await.is_ok());
    }
}
