// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate governor for the secondary identity.
//!
//! Four nested countdown tiers (macro, meso, minor, micro) run side by side.
//! Every delivery spends one unit from each tier. When a tier reaches zero the
//! pump sleeps for that tier's cooldown and the tier alone draws a fresh
//! budget; the other tiers keep counting. Between deliveries a short random
//! pause applies.
//!
//! The governor is plain data owned by the run state. It never sleeps on its
//! own; callers get durations back and decide how to wait.

use std::time::Duration;

use ferry_config::model::{GovernorConfig, TierConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A cooldown the caller must observe before the next delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Name of the tier whose budget ran out.
    pub tier: &'static str,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
struct Tier {
    name: &'static str,
    bounds: TierConfig,
    remaining: u64,
}

/// Nested countdown pacing state.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    /// Outermost first.
    tiers: Vec<Tier>,
    pause: (u64, u64),
    rng: StdRng,
}

fn sample(rng: &mut StdRng, a: u64, b: u64) -> u64 {
    let (lo, hi) = (a.min(b), a.max(b));
    rng.gen_range(lo..=hi)
}

impl RateGovernor {
    /// Governor with every tier at a fresh random budget.
    pub fn new(config: &GovernorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic governor for reproducible runs.
    pub fn seeded(config: &GovernorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &GovernorConfig, mut rng: StdRng) -> Self {
        let tiers = config
            .tiers()
            .into_iter()
            .map(|(name, bounds)| Tier {
                name,
                bounds,
                remaining: sample(&mut rng, bounds.budget_min, bounds.budget_max),
            })
            .collect();
        Self {
            tiers,
            pause: (config.pause_min_secs, config.pause_max_secs),
            rng,
        }
    }

    /// Check the tiers before a delivery.
    ///
    /// Returns the cooldown of the outermost exhausted tier and re-arms that
    /// tier only. An inner tier that is also exhausted triggers on a later
    /// call.
    pub fn before_send(&mut self) -> Option<Cooldown> {
        let tier = self.tiers.iter_mut().find(|t| t.remaining == 0)?;
        let bounds = tier.bounds;
        tier.remaining = sample(&mut self.rng, bounds.budget_min, bounds.budget_max);
        let secs = sample(
            &mut self.rng,
            bounds.cooldown_min_secs,
            bounds.cooldown_max_secs,
        );
        Some(Cooldown {
            tier: tier.name,
            duration: Duration::from_secs(secs),
        })
    }

    /// Spend one unit from every tier and return the pause before the next
    /// delivery.
    pub fn after_delivery(&mut self) -> Duration {
        for tier in &mut self.tiers {
            tier.remaining = tier.remaining.saturating_sub(1);
        }
        Duration::from_secs(sample(&mut self.rng, self.pause.0, self.pause.1))
    }

    /// Remaining budget of the named tier.
    pub fn remaining(&self, tier: &str) -> Option<u64> {
        self.tiers.iter().find(|t| t.name == tier).map(|t| t.remaining)
    }

    /// Overwrite a tier's remaining budget.
    pub fn set_remaining(&mut self, tier: &str, remaining: u64) -> bool {
        match self.tiers.iter_mut().find(|t| t.name == tier) {
            Some(t) => {
                t.remaining = remaining;
                true
            }
            None => false,
        }
    }
}
