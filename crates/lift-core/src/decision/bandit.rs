//! Thompson Sampling traffic allocators.
//!
//! Each arm is a variant posterior. A selection round draws one sample
//! per arm and plays the arg-max; repeated over many rounds the win
//! fractions become a traffic-split recommendation that balances
//! exploration and exploitation. The top-two variant guarantees the
//! runner-up keeps receiving exploration traffic even when it is clearly
//! behind.

use crate::inference::posterior::Posterior;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Default rounds simulated when estimating an allocation.
pub const DEFAULT_ALLOCATION_ROUNDS: usize = 10_000;

/// Default traffic floor for the top-two sampler.
pub const DEFAULT_MIN_ALLOCATION: f64 = 0.1;

/// Default probability of playing the champion in a top-two round.
pub const DEFAULT_TOP_TWO_BETA: f64 = 0.5;

/// Errors raised by sampler construction.
#[derive(Debug, Error)]
pub enum BanditError {
    #[error("at least one arm is required")]
    NoArms,
    #[error("top-two beta must lie in (0, 1], got {beta}")]
    InvalidBeta { beta: f64 },
    #[error("minimum allocation must lie in [0, 1), got {min_allocation}")]
    InvalidFloor { min_allocation: f64 },
}

fn argmax_draws(models: &[Posterior], rng: &mut StdRng, skip: Option<usize>) -> usize {
    let mut best = usize::MAX;
    let mut best_draw = f64::NEG_INFINITY;
    for (i, model) in models.iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        let draw = model.draw(rng);
        if best == usize::MAX || draw > best_draw {
            best = i;
            best_draw = draw;
        }
    }
    best
}

fn win_fractions(wins: &[u64], rounds: usize) -> Vec<f64> {
    wins.iter().map(|w| *w as f64 / rounds as f64).collect()
}

/// Standard Thompson Sampling bandit over variant posteriors.
#[derive(Debug, Clone)]
pub struct ThompsonSampler {
    models: Vec<Posterior>,
}

impl ThompsonSampler {
    pub fn new(models: Vec<Posterior>) -> Result<Self, BanditError> {
        if models.is_empty() {
            return Err(BanditError::NoArms);
        }
        Ok(Self { models })
    }

    /// One selection round: draw each arm once, return the arg-max index.
    /// This is the hot-path per-visitor policy; every call is
    /// independent.
    pub fn select_variant(&self, rng: &mut StdRng) -> usize {
        argmax_draws(&self.models, rng, None)
    }

    /// Estimate a traffic split from `rounds` independent selection
    /// rounds. Fractions sum to 1.
    pub fn allocation(&self, rounds: usize, seed: u64) -> Vec<f64> {
        let rounds = rounds.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut wins = vec![0u64; self.models.len()];
        for _ in 0..rounds {
            wins[self.select_variant(&mut rng)] += 1;
        }
        win_fractions(&wins, rounds)
    }
}

/// Top-two Thompson Sampling with a traffic floor.
///
/// Each round finds the champion by a normal Thompson draw, re-draws with
/// the champion excluded to find the runner-up, then plays the champion
/// with probability `beta` and the runner-up otherwise. Plain Thompson
/// can starve a plausible-but-behind variant entirely; this trades a
/// small efficiency loss for guaranteed exploration.
#[derive(Debug, Clone)]
pub struct TopTwoThompsonSampler {
    models: Vec<Posterior>,
    min_allocation: f64,
    beta: f64,
}

impl TopTwoThompsonSampler {
    pub fn new(
        models: Vec<Posterior>,
        min_allocation: f64,
        beta: f64,
    ) -> Result<Self, BanditError> {
        if models.is_empty() {
            return Err(BanditError::NoArms);
        }
        if !(beta > 0.0 && beta <= 1.0) {
            return Err(BanditError::InvalidBeta { beta });
        }
        if !(0.0..1.0).contains(&min_allocation) {
            return Err(BanditError::InvalidFloor { min_allocation });
        }
        Ok(Self {
            models,
            min_allocation,
            beta,
        })
    }

    /// One top-two selection round.
    pub fn select_variant(&self, rng: &mut StdRng) -> usize {
        if self.models.len() == 1 {
            return 0;
        }
        let champion = argmax_draws(&self.models, rng, None);
        let runner_up = argmax_draws(&self.models, rng, Some(champion));
        if rng.random::<f64>() < self.beta {
            champion
        } else {
            runner_up
        }
    }

    /// Estimate a traffic split, then enforce the floor: arms below
    /// `min_allocation` are raised to it and the deficit is funded by
    /// proportionally shrinking the surplus of arms above the floor.
    /// If flooring every arm is infeasible the split is left as sampled.
    pub fn allocation(&self, rounds: usize, seed: u64) -> Vec<f64> {
        let rounds = rounds.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut wins = vec![0u64; self.models.len()];
        for _ in 0..rounds {
            wins[self.select_variant(&mut rng)] += 1;
        }
        let mut fractions = win_fractions(&wins, rounds);
        apply_floor(&mut fractions, self.min_allocation);
        fractions
    }
}

/// Raise under-floor arms to the floor, funding the deficit from arms
/// above it, pro rata to their surplus. No-op when the floor is zero,
/// already satisfied, or infeasible (`floor * arms > 1`).
pub fn apply_floor(fractions: &mut [f64], floor: f64) {
    if floor <= 0.0 || fractions.is_empty() {
        return;
    }
    if floor * fractions.len() as f64 > 1.0 {
        return;
    }
    let deficit: f64 = fractions
        .iter()
        .filter(|f| **f < floor)
        .map(|f| floor - f)
        .sum();
    if deficit == 0.0 {
        return;
    }
    let surplus: f64 = fractions
        .iter()
        .filter(|f| **f > floor)
        .map(|f| f - floor)
        .sum();
    if surplus <= 0.0 {
        return;
    }
    for f in fractions.iter_mut() {
        if *f < floor {
            *f = floor;
        } else if *f > floor {
            *f -= deficit * (*f - floor) / surplus;
        }
    }
}
