// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Ferry configuration system.

use ferry_config::diagnostic::ConfigError;
use ferry_config::model::FerryConfig;
use ferry_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_ferry_config() {
    let toml = r#"
[agent]
name = "mirror"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
secondary_bot_token = "456:DEF"
scratch_chat_id = 777
admins = ["alice", "42"]

[storage]
database_path = "/tmp/ferry-test.db"
wal_mode = false

[clone]
capacity_per_shard = 1000
primary_pause_secs = 2
progress_every = 10
throttle_retries = 1

[index]
window_size = 50
batch_size = 25
progress_every = 75

[governor]
pause_min_secs = 1
pause_max_secs = 2

[governor.macro]
budget_min = 100
budget_max = 200
cooldown_min_secs = 30
cooldown_max_secs = 60
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "mirror");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.secondary_bot_token.as_deref(), Some("456:DEF"));
    assert_eq!(config.telegram.scratch_chat_id, Some(777));
    assert_eq!(config.telegram.admins, vec!["alice", "42"]);
    assert_eq!(config.storage.database_path, "/tmp/ferry-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.clone.capacity_per_shard, 1000);
    assert_eq!(config.clone.primary_pause_secs, 2);
    assert_eq!(config.index.window_size, 50);
    assert_eq!(config.index.batch_size, 25);
    assert_eq!(config.governor.macro_tier.budget_max, 200);
    assert_eq!(config.governor.micro_tier.budget_min, 250);
    assert_eq!(config.governor.pause_max_secs, 2);
}

/// Unknown field in [clone] produces an error mentioning it.
#[test]
fn unknown_field_in_clone_produces_error() {
    let toml = r#"
[clone]
capacity = 5
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("capacity"),
        "error should mention the unknown field, got: {err_str}"
    );
}

/// Unknown key surfaces as an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_diagnostic_has_suggestion() {
    let toml = r#"
[telegram]
bot_tken = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "bot_tken" && s == "bot_token"
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Missing sections fall back to defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "ferry");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.secondary_bot_token.is_none());
    assert!(config.telegram.admins.is_empty());
    assert!(config.storage.database_path.ends_with("ferry.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.clone.capacity_per_shard, 980_000);
    assert_eq!(config.index.window_size, 200);
    assert_eq!(config.index.batch_size, 100);
    assert_eq!(config.index.progress_every, 250);
    assert_eq!(config.index.max_gap, 1_000);
    assert_eq!(config.governor.minor_tier.budget_min, 1_500);
}

/// Dotted overrides reach nested tier tables, as the env provider does.
#[test]
fn dotted_override_reaches_governor_tier() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: FerryConfig = Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::string("[clone]\ncapacity_per_shard = 10\n"))
        .merge(("governor.micro.budget_max", 999))
        .merge(("clone.capacity_per_shard", 20))
        .extract()
        .expect("should merge overrides");

    assert_eq!(config.governor.micro_tier.budget_max, 999);
    assert_eq!(config.clone.capacity_per_shard, 20);
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[index]
batch_size = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero batch size is invalid");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size")))
    );
}

/// Wrong value types are reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[clone]
capacity_per_shard = "lots"
"#;
    let errors = load_and_validate_str(toml).expect_err("string is not a number");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

/// A missing config file is skipped silently.
#[test]
fn missing_config_files_silently_skipped() {
    let config = ferry_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/path/ferry.toml",
    ))
    .expect("missing file should be silently skipped");
    assert_eq!(config.agent.name, "ferry");
}
