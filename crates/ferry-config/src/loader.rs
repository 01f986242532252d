// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ferry.toml` > `~/.config/ferry/ferry.toml` > `/etc/ferry/ferry.toml`
//! with environment variable overrides via `FERRY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FerryConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ferry/ferry.toml` (system-wide)
/// 3. `~/.config/ferry/ferry.toml` (user XDG config)
/// 4. `./ferry.toml` (local directory)
/// 5. `FERRY_*` environment variables
pub fn load_config() -> Result<FerryConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults.
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file("/etc/ferry/ferry.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ferry/ferry.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ferry.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `FERRY_TELEGRAM_BOT_TOKEN` is `telegram.bot_token`, and
/// `FERRY_CLONE_CAPACITY_PER_SHARD` is `clone.capacity_per_shard`.
fn env_provider() -> Env {
    Env::prefixed("FERRY_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = ["agent", "telegram", "storage", "clone", "index", "governor"];

    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            if section == "governor" {
                for tier in ["macro", "meso", "minor", "micro"] {
                    if let Some(field) = rest.strip_prefix(tier).and_then(|r| r.strip_prefix('_')) {
                        return format!("governor.{tier}.{field}");
                    }
                }
            }
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(
            map_env_key("clone_capacity_per_shard"),
            "clone.capacity_per_shard"
        );
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("agent_log_level"), "agent.log_level");
    }

    #[test]
    fn governor_tier_keys_map_two_levels() {
        assert_eq!(
            map_env_key("governor_micro_budget_min"),
            "governor.micro.budget_min"
        );
        assert_eq!(
            map_env_key("governor_pause_max_secs"),
            "governor.pause_max_secs"
        );
    }

    #[test]
    fn unknown_prefix_is_left_alone() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
