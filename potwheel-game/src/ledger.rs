use crate::{BetInput, GameError, Result};
use potwheel_core::types::is_valid_amount;
use potwheel_core::{Bet, BalanceStore, CurrencyKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Sum of stakes, all currency kinds pooled as one unit
pub fn bank_total(bets: &[Bet]) -> f64 {
    bets.iter().map(|bet| bet.amount).sum()
}

/// One row of the participants view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantView {
    pub name: String,
    pub amount: f64,
    pub currency: CurrencyKind,
    pub chance: f64,
}

impl ParticipantView {
    pub fn chance_display(&self) -> String {
        format!("{:.2}%", self.chance * 100.0)
    }
}

/// Bets of the open round, in submission order
pub struct PotLedger {
    bets: Vec<Bet>,
    balances: Arc<dyn BalanceStore>,
}

impl PotLedger {
    pub fn new(balances: Arc<dyn BalanceStore>) -> Self {
        Self {
            bets: Vec::new(),
            balances,
        }
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Validate the stake, debit the owner and append the bet
    pub async fn submit(&mut self, input: BetInput) -> Result<Bet> {
        if !is_valid_amount(input.amount) {
            return Err(GameError::InvalidAmount(input.amount));
        }

        if let Some(owner) = &input.owner_id {
            let available = self.balances.balance(owner).await?;
            if available < input.amount {
                return Err(GameError::InsufficientFunds {
                    need: input.amount,
                    available,
                });
            }
            self.balances.adjust_balance(owner, -input.amount).await?;
        }

        let bet = input.into_bet(self.bets.len() + 1);
        tracing::info!(
            "Bet {} accepted: {} staked {:.2} {}",
            bet.id,
            bet.participant_name,
            bet.amount,
            bet.currency.label()
        );

        self.bets.push(bet.clone());
        Ok(bet)
    }

    pub fn bank_total(&self) -> f64 {
        bank_total(&self.bets)
    }

    pub fn win_probability(&self, bet: &Bet) -> f64 {
        let total = self.bank_total();
        if total <= 0.0 {
            return 0.0;
        }
        bet.amount / total
    }

    pub fn participants(&self) -> Vec<ParticipantView> {
        self.bets
            .iter()
            .map(|bet| ParticipantView {
                name: bet.participant_name.clone(),
                amount: bet.amount,
                currency: bet.currency,
                chance: self.win_probability(bet),
            })
            .collect()
    }

    /// Short digest of the ordered bet list, changes with every submission
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for bet in &self.bets {
            hasher.update(bet.id.as_bytes());
            hasher.update(bet.participant_name.as_bytes());
            hasher.update(bet.amount.to_bits().to_be_bytes());
            hasher.update(bet.currency.label().as_bytes());
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    /// Hand the bets over for archiving and empty the pot
    pub fn clear(&mut self) -> Vec<Bet> {
        std::mem::take(&mut self.bets)
    }

    /// Credit every owned stake back and empty the pot.
    ///
    /// Bets are refunded from the newest backwards. If a credit fails the
    /// bets not yet refunded stay in the ledger so the call can be retried.
    pub async fn refund_all(&mut self) -> Result<f64> {
        let mut refunded = 0.0;

        while let Some(bet) = self.bets.last() {
            if let Some(owner) = &bet.owner_id {
                self.balances.adjust_balance(owner, bet.amount).await?;
                refunded += bet.amount;
                tracing::info!(
                    "Refunded {:.2} to {} for bet {}",
                    bet.amount,
                    owner,
                    bet.id
                );
            }
            self.bets.pop();
        }

        Ok(refunded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potwheel_core::{OwnerId, SqliteBalanceStore, Storage};

    async fn ledger_with_funds(
        owner: &OwnerId,
        funds: f64,
    ) -> (PotLedger, Arc<SqliteBalanceStore>) {
        let storage = Arc::new(Storage::in_memory().await.unwrap());
        let balances = Arc::new(SqliteBalanceStore::new(storage));
        balances.adjust_balance(owner, funds).await.unwrap();
        (PotLedger::new(balances.clone()), balances)
    }

    #[tokio::test]
    async fn test_submit_debits_owner() {
        let owner = OwnerId::new("1");
        let (mut ledger, balances) = ledger_with_funds(&owner, 2.0).await;

        let bet = ledger
            .submit(BetInput::new("alice", 0.5, CurrencyKind::Ton).with_owner(owner.clone()))
            .await
            .unwrap();

        assert_eq!(bet.amount, 0.5);
        assert_eq!(ledger.len(), 1);
        assert!((balances.balance(&owner).await.unwrap() - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let owner = OwnerId::new("1");
        let (mut ledger, balances) = ledger_with_funds(&owner, 10.0).await;

        for amount in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let result = ledger
                .submit(BetInput::new("x", amount, CurrencyKind::Ton).with_owner(owner.clone()))
                .await;
            assert!(matches!(result, Err(GameError::InvalidAmount(_))));
        }

        assert!(ledger.is_empty());
        assert_eq!(balances.balance(&owner).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_round_unchanged() {
        let owner = OwnerId::new("1");
        let (mut ledger, balances) = ledger_with_funds(&owner, 0.07).await;

        let result = ledger
            .submit(BetInput::new("poor", 1.0, CurrencyKind::Ton).with_owner(owner.clone()))
            .await;

        match result {
            Err(GameError::InsufficientFunds { need, available }) => {
                assert_eq!(need, 1.0);
                assert!((available - 0.07).abs() < 1e-9);
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }
        assert!(ledger.is_empty());
        assert!((balances.balance(&owner).await.unwrap() - 0.07).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_anonymous_bet_not_debited() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;

        let bet = ledger
            .submit(BetInput::new("", 3.0, CurrencyKind::Gift))
            .await
            .unwrap();
        assert_eq!(bet.participant_name, "Player #1");
        assert_eq!(ledger.bank_total(), 3.0);
    }

    #[tokio::test]
    async fn test_probabilities_sum_to_one() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;

        for (name, amount) in [("a", 0.25), ("b", 1.5), ("c", 3.1)] {
            ledger
                .submit(BetInput::new(name, amount, CurrencyKind::Ton))
                .await
                .unwrap();
        }

        let total = ledger.bank_total();
        assert!((total - 4.85).abs() < 1e-9);
        for bet in ledger.bets() {
            assert!((ledger.win_probability(bet) - bet.amount / total).abs() < 1e-9);
        }
        let sum: f64 = ledger.bets().iter().map(|b| ledger.win_probability(b)).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_ledger_statistics() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;
        assert_eq!(ledger.bank_total(), 0.0);

        let bet = ledger
            .submit(BetInput::new("a", 1.0, CurrencyKind::Ton))
            .await
            .unwrap();
        ledger.clear();
        assert_eq!(ledger.win_probability(&bet), 0.0);
    }

    #[tokio::test]
    async fn test_participants_view() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;
        ledger.submit(BetInput::new("a", 1.0, CurrencyKind::Ton)).await.unwrap();
        ledger.submit(BetInput::new("b", 3.0, CurrencyKind::Star)).await.unwrap();

        let rows = ledger.participants();
        assert_eq!(rows[0].chance_display(), "25.00%");
        assert_eq!(rows[1].chance_display(), "75.00%");
        assert_eq!(rows[1].currency, CurrencyKind::Star);
    }

    #[tokio::test]
    async fn test_fingerprint_tracks_submissions() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;

        let empty = ledger.fingerprint();
        ledger.submit(BetInput::new("a", 1.0, CurrencyKind::Ton)).await.unwrap();
        let one = ledger.fingerprint();

        assert_eq!(one.len(), 16);
        assert_ne!(empty, one);
        assert_eq!(one, ledger.fingerprint());
    }

    #[tokio::test]
    async fn test_clear_returns_bets_in_order() {
        let owner = OwnerId::new("1");
        let (mut ledger, _) = ledger_with_funds(&owner, 0.0).await;
        ledger.submit(BetInput::new("a", 1.0, CurrencyKind::Ton)).await.unwrap();
        ledger.submit(BetInput::new("b", 2.0, CurrencyKind::Ton)).await.unwrap();

        let bets = ledger.clear();
        assert_eq!(
            bets.iter().map(|b| b.participant_name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_refund_all_restores_owned_stakes() {
        let owner = OwnerId::new("1");
        let (mut ledger, balances) = ledger_with_funds(&owner, 2.0).await;
        ledger
            .submit(BetInput::new("a", 0.5, CurrencyKind::Ton).with_owner(owner.clone()))
            .await
            .unwrap();
        ledger
            .submit(BetInput::new("b", 1.25, CurrencyKind::Star).with_owner(owner.clone()))
            .await
            .unwrap();
        ledger.submit(BetInput::new("anon", 4.0, CurrencyKind::Gift)).await.unwrap();
        assert!((balances.balance(&owner).await.unwrap() - 0.25).abs() < 1e-9);

        let refunded = ledger.refund_all().await.unwrap();

        assert!((refunded - 1.75).abs() < 1e-9);
        assert!(ledger.is_empty());
        assert!((balances.balance(&owner).await.unwrap() - 2.0).abs() < 1e-9);
    }
}
