use chrono::Utc;
use potwheel_core::{Bet, CurrencyKind, OwnerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bet as submitted, before it is accepted into the pot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetInput {
    pub participant_name: String,
    pub amount: f64,
    pub currency: CurrencyKind,
    pub owner_id: Option<OwnerId>,
}

impl BetInput {
    pub fn new(participant_name: impl Into<String>, amount: f64, currency: CurrencyKind) -> Self {
        Self {
            participant_name: participant_name.into(),
            amount,
            currency,
            owner_id: None,
        }
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Stamp an id and timestamp. `position` is the 1-based slot used for
    /// the placeholder name when none was given.
    pub(crate) fn into_bet(self, position: usize) -> Bet {
        let name = self.participant_name.trim();
        let participant_name = if name.is_empty() {
            format!("Player #{}", position)
        } else {
            name.to_string()
        };

        Bet {
            id: Uuid::new_v4(),
            participant_name,
            amount: self.amount,
            currency: self.currency,
            owner_id: self.owner_id,
            placed_at: Utc::now(),
        }
    }
}
