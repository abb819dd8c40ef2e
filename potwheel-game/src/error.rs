use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Core error: {0}")]
    Core(#[from] potwheel_core::PotwheelError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Insufficient funds: need {need:.2}, have {available:.2}")]
    InsufficientFunds { need: f64, available: f64 },

    #[error("Not enough participants: {bets} bets with bank {bank:.2}")]
    InsufficientParticipants { bets: usize, bank: f64 },

    #[error("Invalid round state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
