use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Bet, OwnerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Archived outcome of one settled round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: u64,
    pub bets: Vec<Bet>,
    pub winner: Bet,
    pub bank: f64,
    pub fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append-only; settlement does not read records back.
    ///
    /// Archives under `record.round_id`, or under the next free id if that
    /// one is already taken. Returns the id the round was stored under.
    async fn record_round(&self, record: &RoundRecord) -> Result<u64>;

    /// Rounds in which `owner` placed at least one bet, newest first
    async fn rounds_for_owner(&self, owner: &OwnerId) -> Result<Vec<RoundRecord>>;

    async fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundRecord>>;

    /// Highest archived round id, if any
    async fn last_round_id(&self) -> Result<Option<u64>>;
}

pub struct SqliteHistoryStore {
    storage: Arc<Storage>,
}

impl SqliteHistoryStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoundRecord> {
    let round_id: i64 = row.get(0)?;
    let bets_str: String = row.get(1)?;
    let winner_str: String = row.get(2)?;
    let created_at: i64 = row.get(5)?;

    let bets: Vec<Bet> = serde_json::from_str(&bets_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "bets".to_string(), rusqlite::types::Type::Text)
    })?;

    let winner: Bet = serde_json::from_str(&winner_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(2, "winner".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(RoundRecord {
        round_id: round_id as u64,
        bets,
        winner,
        bank: row.get(3)?,
        fingerprint: row.get(4)?,
        timestamp: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn record_round(&self, record: &RoundRecord) -> Result<u64> {
        let mut conn = self.storage.get_connection().await;

        let bets_json = serde_json::to_string(&record.bets)?;
        let winner_json = serde_json::to_string(&record.winner)?;

        // Take the write lock up front so another process cannot claim the same id
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: Option<i64> =
            tx.query_row("SELECT MAX(round_id) FROM rounds", [], |row| row.get(0))?;
        let requested = record.round_id as i64;
        let round_id = match last {
            Some(last) if last >= requested => last + 1,
            _ => requested,
        };

        tx.execute(
            "INSERT INTO rounds (round_id, bets, winner, bank, fingerprint, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                round_id,
                bets_json,
                winner_json,
                record.bank,
                record.fingerprint,
                record.timestamp.timestamp(),
            ],
        )?;

        // Rows left behind by databases written before ids were allocated here
        tx.execute("DELETE FROM round_participants WHERE round_id = ?1", params![round_id])?;
        for owner in record.bets.iter().filter_map(|bet| bet.owner_id.as_ref()) {
            tx.execute(
                "INSERT OR IGNORE INTO round_participants (round_id, owner_id) VALUES (?1, ?2)",
                params![round_id, owner.as_str()],
            )?;
        }
        tx.commit()?;

        if round_id != requested {
            tracing::warn!(
                "Round {} already archived, stored as round {}",
                record.round_id,
                round_id
            );
        }
        tracing::info!("Recorded round {} ({} bets)", round_id, record.bets.len());
        Ok(round_id as u64)
    }

    async fn rounds_for_owner(&self, owner: &OwnerId) -> Result<Vec<RoundRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT r.round_id, r.bets, r.winner, r.bank, r.fingerprint, r.created_at
             FROM rounds r JOIN round_participants p ON p.round_id = r.round_id
             WHERE p.owner_id = ?1 ORDER BY r.round_id DESC",
        )?;

        let record_iter = stmt.query_map(params![owner.as_str()], record_from_row)?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    async fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round_id, bets, winner, bank, fingerprint, created_at
             FROM rounds ORDER BY round_id DESC LIMIT ?1",
        )?;

        let record_iter = stmt.query_map(params![limit as i64], record_from_row)?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    async fn last_round_id(&self) -> Result<Option<u64>> {
        let conn = self.storage.get_connection().await;

        let round_id: Option<i64> = conn
            .query_row("SELECT MAX(round_id) FROM rounds", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(round_id.map(|id| id as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyKind;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn bet(name: &str, amount: f64, owner: Option<&str>) -> Bet {
        Bet {
            id: Uuid::new_v4(),
            participant_name: name.to_string(),
            amount,
            currency: CurrencyKind::Ton,
            owner_id: owner.map(OwnerId::new),
            placed_at: Utc::now(),
        }
    }

    fn record(round_id: u64, bets: Vec<Bet>) -> RoundRecord {
        let bank = bets.iter().map(|b| b.amount).sum();
        RoundRecord {
            round_id,
            winner: bets[0].clone(),
            bets,
            bank,
            fingerprint: "00ff00ff00ff00ff".to_string(),
            timestamp: Utc::now(),
        }
    }

    async fn store() -> SqliteHistoryStore {
        SqliteHistoryStore::new(Arc::new(Storage::in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let store = store().await;
        let bets = vec![bet("A", 0.5, Some("1")), bet("B", 1.5, Some("2"))];
        assert_eq!(store.record_round(&record(10, bets.clone())).await.unwrap(), 10);

        let recent = store.recent_rounds(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].round_id, 10);
        assert_eq!(recent[0].bets, bets);
        assert_eq!(recent[0].winner, bets[0]);
        assert!((recent[0].bank - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rounds_for_owner_filters_participants() {
        let store = store().await;
        store
            .record_round(&record(1, vec![bet("A", 1.0, Some("1")), bet("B", 1.0, Some("2"))]))
            .await
            .unwrap();
        store
            .record_round(&record(2, vec![bet("B", 1.0, Some("2")), bet("C", 1.0, None)]))
            .await
            .unwrap();

        let alice = store.rounds_for_owner(&OwnerId::new("1")).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].round_id, 1);

        let bob = store.rounds_for_owner(&OwnerId::new("2")).await.unwrap();
        assert_eq!(bob.iter().map(|r| r.round_id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_owner_with_two_bets_listed_once() {
        let store = store().await;
        store
            .record_round(&record(3, vec![bet("A", 1.0, Some("1")), bet("A2", 2.0, Some("1"))]))
            .await
            .unwrap();

        assert_eq!(store.rounds_for_owner(&OwnerId::new("1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_rounds_limit() {
        let store = store().await;
        for round_id in 1..=4 {
            store
                .record_round(&record(round_id, vec![bet("A", 1.0, None), bet("B", 1.0, None)]))
                .await
                .unwrap();
        }

        let recent = store.recent_rounds(2).await.unwrap();
        assert_eq!(recent.iter().map(|r| r.round_id).collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(store.last_round_id().await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_last_round_id_empty() {
        let store = store().await;
        assert_eq!(store.last_round_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_taken_round_id_is_not_overwritten() {
        let store = store().await;
        let first = record(7, vec![bet("A", 1.0, Some("1")), bet("B", 1.0, Some("2"))]);
        let second = record(7, vec![bet("C", 2.0, Some("3")), bet("D", 2.0, None)]);

        assert_eq!(store.record_round(&first).await.unwrap(), 7);
        assert_eq!(store.record_round(&second).await.unwrap(), 8);

        let recent = store.recent_rounds(5).await.unwrap();
        assert_eq!(recent.iter().map(|r| r.round_id).collect::<Vec<_>>(), vec![8, 7]);
        assert_eq!(recent[1].bets, first.bets);
        assert_eq!(recent[0].bets, second.bets);

        let carol = store.rounds_for_owner(&OwnerId::new("3")).await.unwrap();
        assert_eq!(carol.iter().map(|r| r.round_id).collect::<Vec<_>>(), vec![8]);
    }

    #[tokio::test]
    async fn test_two_handles_on_one_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("potwheel.db");
        let one = SqliteHistoryStore::new(Arc::new(Storage::new(&path).await.unwrap()));
        let two = SqliteHistoryStore::new(Arc::new(Storage::new(&path).await.unwrap()));

        // Both handles started from the same history and picked the same id
        let a = one
            .record_round(&record(360893, vec![bet("A", 1.0, None), bet("B", 1.0, None)]))
            .await
            .unwrap();
        let b = two
            .record_round(&record(360893, vec![bet("C", 1.0, None), bet("D", 1.0, None)]))
            .await
            .unwrap();

        assert_eq!((a, b), (360893, 360894));
        assert_eq!(one.recent_rounds(5).await.unwrap().len(), 2);
    }
}
