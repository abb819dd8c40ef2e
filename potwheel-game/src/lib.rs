//! Stake-weighted pot wheel
//!
//! Players pool bets into a shared bank, one draw weighted by stake picks
//! the winner who takes the whole bank, and the wheel rotation shown to
//! players is derived from that same draw.

pub mod bet;
pub mod draw;
pub mod error;
pub mod ledger;
pub mod round;

pub use bet::BetInput;
pub use draw::{
    pointer_slice, DrawOutcome, RandomSource, SeededRandom, ThreadRandom, WeightedDrawResolver,
    WheelSlice,
};
pub use error::{GameError, Result};
pub use ledger::{bank_total, ParticipantView, PotLedger};
pub use round::{RoundManager, RoundSnapshot, RoundStatus, Settlement};
