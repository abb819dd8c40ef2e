//! Stake-weighted winner selection and the wheel geometry derived from it.
//!
//! Bets partition `[0, bank)` into contiguous intervals in stored order. A
//! uniform draw scaled by the bank picks the interval, and the same
//! partition, scaled to a full turn, gives the wheel slices. Slice angles
//! are measured clockwise from the pointer at the top of the wheel.

use crate::ledger::bank_total;
use crate::{GameError, Result};
use potwheel_core::{Bet, SpinPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Source of uniform values in `[0, 1)`
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64 + Send,
{
    fn next_unit(&mut self) -> f64 {
        self()
    }
}

/// Thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible generator for replaying a round
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Arc of the wheel owned by one bet, in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSlice {
    pub start: f64,
    pub end: f64,
}

impl WheelSlice {
    pub fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.start && angle < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub winner_index: usize,
    pub winner: Bet,
    pub bank: f64,
    /// Point in `[0, bank)` the draw landed on
    pub draw_point: f64,
    pub slices: Vec<WheelSlice>,
    pub full_spins: u32,
    /// Clockwise rotation that stops the winner's slice midpoint under the pointer
    pub rotation_target: f64,
}

/// Cumulative `[start, end)` intervals of each bet in stake units
fn intervals(bets: &[Bet]) -> Vec<(f64, f64)> {
    let mut acc = 0.0;
    bets.iter()
        .map(|bet| {
            let start = acc;
            acc += bet.amount;
            (start, acc)
        })
        .collect()
}

/// Index of the interval holding `point`. A point at or past the last edge
/// (float rounding) falls back to the last bet.
fn interval_index(intervals: &[(f64, f64)], point: f64) -> usize {
    intervals
        .iter()
        .position(|&(_, end)| point < end)
        .unwrap_or(intervals.len().saturating_sub(1))
}

/// Wheel slices for `bets`, same order and proportions as the draw intervals
pub fn slices(bets: &[Bet]) -> Vec<WheelSlice> {
    let total = bank_total(bets);
    if total <= 0.0 {
        return Vec::new();
    }
    to_slices(&intervals(bets), total)
}

fn to_slices(intervals: &[(f64, f64)], total: f64) -> Vec<WheelSlice> {
    intervals
        .iter()
        .map(|&(start, end)| WheelSlice {
            start: start / total * TAU,
            end: end / total * TAU,
        })
        .collect()
}

/// Slice under the top pointer once the wheel has turned clockwise by `rotation`
pub fn pointer_slice(slices: &[WheelSlice], rotation: f64) -> Option<usize> {
    if slices.is_empty() {
        return None;
    }

    let angle = (TAU - rotation.rem_euclid(TAU)).rem_euclid(TAU);
    Some(
        slices
            .iter()
            .position(|slice| slice.contains(angle))
            .unwrap_or(slices.len() - 1),
    )
}

#[derive(Debug, Clone)]
pub struct WeightedDrawResolver {
    spin_policy: SpinPolicy,
}

impl Default for WeightedDrawResolver {
    fn default() -> Self {
        Self::new(potwheel_core::GameConfig::default().spin_policy)
    }
}

impl WeightedDrawResolver {
    pub fn new(spin_policy: SpinPolicy) -> Self {
        Self { spin_policy }
    }

    /// Pick the winner and its wheel rotation from one partition of the bank.
    /// The first draw selects the winner; the second only sets the number of
    /// cosmetic full turns.
    pub fn resolve(&self, bets: &[Bet], rng: &mut dyn RandomSource) -> Result<DrawOutcome> {
        let bank = bank_total(bets);
        if bets.len() < 2 || !(bank > 0.0) {
            return Err(GameError::InsufficientParticipants {
                bets: bets.len(),
                bank,
            });
        }

        let intervals = intervals(bets);
        let draw_point = rng.next_unit() * bank;
        let winner_index = interval_index(&intervals, draw_point);

        let slices = to_slices(&intervals, bank);
        let winner_mid = slices[winner_index].mid();

        let extra = (rng.next_unit() * self.spin_policy.extra_spin_range as f64).floor() as u32;
        let full_spins = self.spin_policy.min_full_spins
            + extra.min(self.spin_policy.extra_spin_range.saturating_sub(1));
        let rotation_target = full_spins as f64 * TAU + (TAU - winner_mid);

        tracing::debug!(
            "Draw point {:.6} of {:.6} -> bet #{} (mid {:.4} rad, {} spins)",
            draw_point,
            bank,
            winner_index,
            winner_mid,
            full_spins
        );

        Ok(DrawOutcome {
            winner_index,
            winner: bets[winner_index].clone(),
            bank,
            draw_point,
            slices,
            full_spins,
            rotation_target,
        })
    }
}
