use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External identity of a bettor (a Telegram user id in the mini-app)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Currency a stake was placed in. Amounts of every kind pool into one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyKind {
    Ton,
    Star,
    Gift,
}

impl CurrencyKind {
    pub fn label(&self) -> &'static str {
        match self {
            CurrencyKind::Ton => "TON",
            CurrencyKind::Star => "Stars",
            CurrencyKind::Gift => "Gifts",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            CurrencyKind::Ton => "TON",
            CurrencyKind::Star => "\u{2605}",
            CurrencyKind::Gift => "\u{1F381}",
        }
    }
}

impl std::str::FromStr for CurrencyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TON" => Ok(CurrencyKind::Ton),
            "STAR" | "STARS" => Ok(CurrencyKind::Star),
            "GIFT" | "GIFTS" => Ok(CurrencyKind::Gift),
            other => Err(format!("unknown currency kind: {}", other)),
        }
    }
}

/// One participant's stake in a round. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub participant_name: String,
    pub amount: f64,
    pub currency: CurrencyKind,
    pub owner_id: Option<OwnerId>,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub owner_id: OwnerId,
    pub balance: f64,
    pub updated_at: DateTime<Utc>,
}

/// A successful payment as delivered by the payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulPayment {
    pub charge_id: String,
    pub total_amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub charge_id: String,
    pub owner_id: OwnerId,
    pub amount: u64,
    pub currency: String,
    pub credited: f64,
    pub timestamp: DateTime<Utc>,
}

/// Checks that a stake or top-up is a finite number greater than zero
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}
