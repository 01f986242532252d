// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ferry clone engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Ferry configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FerryConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram identities and operator access.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Clone run settings.
    #[serde(default)]
    pub clone: CloneConfig,

    /// Indexing settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Pacing of the secondary identity.
    #[serde(default)]
    pub governor: GovernorConfig,
}

/// Process identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs and status output.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "ferry".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Token of the primary (fast) identity. `None` disables Telegram.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Token of the secondary (paced) identity.
    #[serde(default)]
    pub secondary_bot_token: Option<String>,

    /// Private chat the transports use as a scratch pad when reading sources.
    #[serde(default)]
    pub scratch_chat_id: Option<i64>,

    /// Operator user IDs or usernames allowed to issue commands.
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ferry").join("ferry.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ferry.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Clone run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloneConfig {
    /// Maximum items a single destination receives before the next shard starts.
    #[serde(default = "default_capacity_per_shard")]
    pub capacity_per_shard: u64,

    /// Pause after every delivery made by the primary identity.
    #[serde(default = "default_primary_pause_secs")]
    pub primary_pause_secs: u64,

    /// Emit a progress update every N deliveries.
    #[serde(default = "default_clone_progress_every")]
    pub progress_every: u64,

    /// Retries of the same item after a throttling wait.
    #[serde(default = "default_throttle_retries")]
    pub throttle_retries: u32,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            capacity_per_shard: default_capacity_per_shard(),
            primary_pause_secs: default_primary_pause_secs(),
            progress_every: default_clone_progress_every(),
            throttle_retries: default_throttle_retries(),
        }
    }
}

fn default_capacity_per_shard() -> u64 {
    980_000
}

fn default_primary_pause_secs() -> u64 {
    1
}

fn default_clone_progress_every() -> u64 {
    100
}

fn default_throttle_retries() -> u32 {
    1
}

/// Indexing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Messages requested per page.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Items buffered before a bulk insert.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Emit a progress update every N processed messages.
    #[serde(default = "default_index_progress_every")]
    pub progress_every: u64,

    /// Consecutive empty message ids after which a scan treats the source
    /// as ended, when the transport cannot tell.
    #[serde(default = "default_max_gap")]
    pub max_gap: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            batch_size: default_batch_size(),
            progress_every: default_index_progress_every(),
            max_gap: default_max_gap(),
        }
    }
}

fn default_window_size() -> usize {
    200
}

fn default_batch_size() -> usize {
    100
}

fn default_index_progress_every() -> u64 {
    250
}

fn default_max_gap() -> u64 {
    1_000
}

/// One countdown tier of the rate governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Lower bound of the delivery budget.
    pub budget_min: u64,
    /// Upper bound of the delivery budget.
    pub budget_max: u64,
    /// Lower bound of the cooldown once the budget is spent.
    pub cooldown_min_secs: u64,
    /// Upper bound of the cooldown once the budget is spent.
    pub cooldown_max_secs: u64,
}

impl TierConfig {
    pub const fn new(budget: (u64, u64), cooldown_secs: (u64, u64)) -> Self {
        Self {
            budget_min: budget.0,
            budget_max: budget.1,
            cooldown_min_secs: cooldown_secs.0,
            cooldown_max_secs: cooldown_secs.1,
        }
    }
}

/// Rate governor configuration: four nested tiers plus the per-delivery pause.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GovernorConfig {
    #[serde(rename = "macro", default = "default_macro_tier")]
    pub macro_tier: TierConfig,

    #[serde(rename = "meso", default = "default_meso_tier")]
    pub meso_tier: TierConfig,

    #[serde(rename = "minor", default = "default_minor_tier")]
    pub minor_tier: TierConfig,

    #[serde(rename = "micro", default = "default_micro_tier")]
    pub micro_tier: TierConfig,

    /// Short pause after an ordinary delivery, lower bound.
    #[serde(default = "default_pause_min_secs")]
    pub pause_min_secs: u64,

    /// Short pause after an ordinary delivery, upper bound.
    #[serde(default = "default_pause_max_secs")]
    pub pause_max_secs: u64,
}

impl GovernorConfig {
    /// Tiers from outermost to innermost, with their names.
    pub fn tiers(&self) -> [(&'static str, TierConfig); 4] {
        [
            ("macro", self.macro_tier),
            ("meso", self.meso_tier),
            ("minor", self.minor_tier),
            ("micro", self.micro_tier),
        ]
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            macro_tier: default_macro_tier(),
            meso_tier: default_meso_tier(),
            minor_tier: default_minor_tier(),
            micro_tier: default_micro_tier(),
            pause_min_secs: default_pause_min_secs(),
            pause_max_secs: default_pause_max_secs(),
        }
    }
}

fn default_macro_tier() -> TierConfig {
    TierConfig::new((10_000, 15_300), (2_000, 3_000))
}

fn default_meso_tier() -> TierConfig {
    TierConfig::new((5_000, 6_000), (1_500, 2_000))
}

fn default_minor_tier() -> TierConfig {
    TierConfig::new((1_500, 2_000), (1_000, 1_200))
}

fn default_micro_tier() -> TierConfig {
    TierConfig::new((250, 300), (250, 500))
}

fn default_pause_min_secs() -> u64 {
    3
}

fn default_pause_max_secs() -> u64 {
    8
}
