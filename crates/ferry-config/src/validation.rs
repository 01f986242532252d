// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: positive sizes, ordered bounds,
//! non-empty paths and tokens.

use crate::diagnostic::ConfigError;
use crate::model::{FerryConfig, TierConfig};

/// Validate a deserialized configuration.
///
/// Collects every problem instead of failing on the first.
pub fn validate_config(config: &FerryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path must not be empty"));
    }

    for (key, token) in [
        ("telegram.bot_token", &config.telegram.bot_token),
        ("telegram.secondary_bot_token", &config.telegram.secondary_bot_token),
    ] {
        if let Some(token) = token
            && token.trim().is_empty()
        {
            errors.push(ConfigError::invalid(format!(
                "{key} must not be empty when set"
            )));
        }
    }

    if config.clone.capacity_per_shard == 0 {
        errors.push(ConfigError::invalid("clone.capacity_per_shard must be at least 1"));
    }
    if config.clone.progress_every == 0 {
        errors.push(ConfigError::invalid("clone.progress_every must be at least 1"));
    }
    if config.index.window_size == 0 {
        errors.push(ConfigError::invalid("index.window_size must be at least 1"));
    }
    if config.index.batch_size == 0 {
        errors.push(ConfigError::invalid("index.batch_size must be at least 1"));
    }
    if config.index.progress_every == 0 {
        errors.push(ConfigError::invalid("index.progress_every must be at least 1"));
    }
    if config.index.max_gap < config.index.window_size as u64 {
        errors.push(ConfigError::invalid(
            "index.max_gap must be at least index.window_size",
        ));
    }

    for (name, tier) in config.governor.tiers() {
        validate_tier(name, &tier, &mut errors);
    }

    let g = &config.governor;
    if g.pause_min_secs > g.pause_max_secs {
        errors.push(ConfigError::invalid(format!(
            "governor.pause_min_secs ({}) must not exceed governor.pause_max_secs ({})",
            g.pause_min_secs, g.pause_max_secs
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tier(name: &str, tier: &TierConfig, errors: &mut Vec<ConfigError>) {
    if tier.budget_min == 0 {
        errors.push(ConfigError::invalid(format!(
            "governor.{name}.budget_min must be at least 1"
        )));
    }
    if tier.budget_min > tier.budget_max {
        errors.push(ConfigError::invalid(format!(
            "governor.{name}: budget_min ({}) exceeds budget_max ({})",
            tier.budget_min, tier.budget_max
        )));
    }
    if tier.cooldown_min_secs > tier.cooldown_max_secs {
        errors.push(ConfigError::invalid(format!(
            "governor.{name}: cooldown_min_secs ({}) exceeds cooldown_max_secs ({})",
            tier.cooldown_min_secs, tier.cooldown_max_secs
        )));
    }
}
