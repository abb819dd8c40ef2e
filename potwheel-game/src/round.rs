use crate::draw::{DrawOutcome, RandomSource, WeightedDrawResolver};
use crate::{BetInput, GameError, ParticipantView, PotLedger, Result};
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use potwheel_core::{BalanceStore, Bet, GameConfig, HistoryStore, RoundRecord};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    Open,
    Resolving,
    Settled,
}

struct RoundState {
    round_id: u64,
    status: RoundStatus,
    ledger: PotLedger,
    /// Absolute wheel rotation after the last spin, radians
    wheel_rotation: f64,
}

/// Round view for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub status: RoundStatus,
    pub bets: Vec<Bet>,
    pub participants: Vec<ParticipantView>,
    pub bank: f64,
    pub fingerprint: String,
    pub can_resolve: bool,
}

/// Result of a resolved round, available before the settle delay elapses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub round_id: u64,
    pub outcome: DrawOutcome,
    pub fingerprint: String,
    /// Winner's balance after the credit, `None` for an anonymous winner
    pub winner_balance: Option<f64>,
    /// Absolute clockwise rotation to animate the wheel to, in degrees
    pub wheel_rotation_degrees: f64,
}

/// Drives the open round through draw, payout, archiving and reopening
pub struct RoundManager {
    state: Arc<Mutex<RoundState>>,
    balances: Arc<dyn BalanceStore>,
    history: Arc<dyn HistoryStore>,
    resolver: WeightedDrawResolver,
    rng: SyncMutex<Box<dyn RandomSource>>,
    config: GameConfig,
    pending_reopen: SyncMutex<Option<JoinHandle<()>>>,
}

impl RoundManager {
    pub fn new(
        config: GameConfig,
        balances: Arc<dyn BalanceStore>,
        history: Arc<dyn HistoryStore>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let state = RoundState {
            round_id: config.starting_round_id,
            status: RoundStatus::Open,
            ledger: PotLedger::new(balances.clone()),
            wheel_rotation: 0.0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            balances,
            history,
            resolver: WeightedDrawResolver::new(config.spin_policy.clone()),
            rng: SyncMutex::new(rng),
            config,
            pending_reopen: SyncMutex::new(None),
        }
    }

    /// Like `new`, but numbering continues after the last archived round
    pub async fn continue_from_history(
        mut config: GameConfig,
        balances: Arc<dyn BalanceStore>,
        history: Arc<dyn HistoryStore>,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        if let Some(last) = history.last_round_id().await? {
            config.starting_round_id = config.starting_round_id.max(last + 1);
        }
        Ok(Self::new(config, balances, history, rng))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub async fn round_id(&self) -> u64 {
        self.state.lock().await.round_id
    }

    pub async fn status(&self) -> RoundStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> RoundSnapshot {
        let state = self.state.lock().await;
        let bank = state.ledger.bank_total();

        RoundSnapshot {
            round_id: state.round_id,
            status: state.status,
            bets: state.ledger.bets().to_vec(),
            participants: state.ledger.participants(),
            bank,
            fingerprint: state.ledger.fingerprint(),
            can_resolve: state.status == RoundStatus::Open
                && state.ledger.len() >= 2
                && bank > 0.0,
        }
    }

    /// Add a bet to the open round
    pub async fn submit(&self, input: BetInput) -> Result<Bet> {
        let mut state = self.state.lock().await;

        if state.status != RoundStatus::Open {
            return Err(GameError::InvalidState(format!(
                "Round {} is not accepting bets",
                state.round_id
            )));
        }

        state.ledger.submit(input).await
    }

    /// Draw the winner, credit the bank and archive the round.
    ///
    /// Returns `Ok(None)` when the round is not open, e.g. a second trigger
    /// while a spin is still settling. The next round opens after the
    /// configured settle delay.
    pub async fn resolve(&self) -> Result<Option<Settlement>> {
        let mut state = self.state.lock().await;

        if state.status != RoundStatus::Open {
            tracing::warn!(
                "Ignoring resolve for round {} in state {:?}",
                state.round_id,
                state.status
            );
            return Ok(None);
        }

        state.status = RoundStatus::Resolving;

        let outcome = {
            let mut rng = self.rng.lock();
            self.resolver.resolve(state.ledger.bets(), rng.as_mut())
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                state.status = RoundStatus::Open;
                return Err(e);
            }
        };

        let winner_balance = match &outcome.winner.owner_id {
            Some(owner) => match self.balances.adjust_balance(owner, outcome.bank).await {
                Ok(balance) => {
                    tracing::info!(
                        "Credited {:.2} to {}, balance now {:.2}",
                        outcome.bank,
                        owner,
                        balance
                    );
                    Some(balance)
                }
                Err(e) => {
                    state.status = RoundStatus::Open;
                    return Err(e.into());
                }
            },
            None => {
                tracing::warn!(
                    "Winner {} of round {} has no owner, pot of {:.2} not credited",
                    outcome.winner.participant_name,
                    state.round_id,
                    outcome.bank
                );
                None
            }
        };

        let fingerprint = state.ledger.fingerprint();
        let record = RoundRecord {
            round_id: state.round_id,
            bets: state.ledger.bets().to_vec(),
            winner: outcome.winner.clone(),
            bank: outcome.bank,
            fingerprint: fingerprint.clone(),
            timestamp: Utc::now(),
        };
        match self.history.record_round(&record).await {
            Ok(archived) if archived != state.round_id => {
                tracing::warn!(
                    "Round {} was archived as round {}, renumbering",
                    state.round_id,
                    archived
                );
                state.round_id = archived;
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to record round {}: {}", state.round_id, e),
        }

        // Keep spinning forward from wherever the wheel stopped last time
        let rest = state.wheel_rotation - state.wheel_rotation.rem_euclid(TAU);
        state.wheel_rotation = rest + outcome.rotation_target;

        state.status = RoundStatus::Settled;
        tracing::info!(
            "Round {} settled: {} wins {:.2} ({} bets)",
            state.round_id,
            outcome.winner.participant_name,
            outcome.bank,
            record.bets.len()
        );

        let settlement = Settlement {
            round_id: state.round_id,
            wheel_rotation_degrees: state.wheel_rotation.to_degrees(),
            outcome,
            fingerprint,
            winner_balance,
        };

        self.schedule_reopen();
        Ok(Some(settlement))
    }

    /// Close the open round without a draw and give every owned stake back.
    ///
    /// Does nothing unless the round is open. The round id is kept, so the
    /// next bets go into the same round. Returns the refunded amount.
    pub async fn abandon(&self) -> Result<f64> {
        let mut state = self.state.lock().await;

        if state.status != RoundStatus::Open || state.ledger.is_empty() {
            return Ok(0.0);
        }

        let bets = state.ledger.len();
        let refunded = state.ledger.refund_all().await?;
        tracing::info!(
            "Round {} abandoned: {} bets cleared, {:.2} refunded",
            state.round_id,
            bets,
            refunded
        );
        Ok(refunded)
    }

    fn schedule_reopen(&self) {
        let state = self.state.clone();
        let delay = self.config.settle_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = state.lock().await;
            state.ledger.clear();
            state.round_id += 1;
            state.status = RoundStatus::Open;
            tracing::info!("Round {} open for bets", state.round_id);
        });

        *self.pending_reopen.lock() = Some(handle);
    }

    /// Wait until a settled round has been cleared and the next one opened
    pub async fn wait_for_next_round(&self) -> Result<()> {
        let handle = self.pending_reopen.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| GameError::Internal(format!("Reopen task failed: {}", e)))?;
        }
        Ok(())
    }
}
