// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of storage, transports and the engine, and the `ferry serve` loop.

use std::sync::Arc;
use std::time::Duration;

use ferry_config::model::FerryConfig;
use ferry_core::{FerryError, HealthStatus, PluginAdapter, StorageAdapter, TransportIdentity};
use ferry_engine::shutdown::install_signal_handler;
use ferry_engine::{Engine, Forwarder, Transports};
use ferry_storage::SqliteStorage;
use ferry_telegram::{BotContext, HostInfo, MemoryStats, TelegramTransport};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long to collect the parts of a media group before copying it.
const FORWARD_SETTLE: Duration = Duration::from_secs(2);

/// Initialize the global tracing subscriber.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ferry={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Allocator counters for `/server`.
#[cfg(not(target_env = "msvc"))]
fn memory_stats() -> Option<MemoryStats> {
    use tikv_jemalloc_ctl::{epoch, stats};

    epoch::advance().ok()?;
    Some(MemoryStats {
        allocated: stats::allocated::read().ok()? as u64,
        resident: stats::resident::read().ok()? as u64,
    })
}

#[cfg(target_env = "msvc")]
fn memory_stats() -> Option<MemoryStats> {
    None
}

pub async fn open_storage(config: &FerryConfig) -> Result<Arc<SqliteStorage>, FerryError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Both identities from `[telegram]`. The secondary one is optional.
pub fn telegram_transports(
    config: &FerryConfig,
) -> Result<(Arc<TelegramTransport>, Option<Arc<TelegramTransport>>), FerryError> {
    let telegram = &config.telegram;
    let token = telegram.bot_token.as_deref().ok_or_else(|| {
        FerryError::Config("telegram.bot_token is required to reach Telegram".into())
    })?;
    let primary = Arc::new(TelegramTransport::new(
        token,
        TransportIdentity::Primary,
        telegram.scratch_chat_id,
    )?);
    let secondary = telegram
        .secondary_bot_token
        .as_deref()
        .map(|token| {
            TelegramTransport::new(token, TransportIdentity::Secondary, telegram.scratch_chat_id)
        })
        .transpose()?
        .map(Arc::new);
    Ok((primary, secondary))
}

/// Everything a front-end needs.
pub struct Runtime {
    pub engine: Arc<Engine>,
    pub storage: Arc<SqliteStorage>,
    pub primary: Arc<TelegramTransport>,
    pub shutdown: CancellationToken,
}

pub async fn build_runtime(config: FerryConfig) -> Result<Runtime, FerryError> {
    let shutdown = install_signal_handler();
    let storage = open_storage(&config).await?;
    let (primary, secondary) = telegram_transports(&config)?;
    let transports = Transports {
        primary: primary.clone(),
        secondary: secondary.map(|t| t as Arc<dyn ferry_core::Transport>),
    };
    let engine = Arc::new(Engine::new(
        config,
        storage.clone() as Arc<dyn StorageAdapter>,
        transports,
        shutdown.clone(),
    ));
    Ok(Runtime {
        engine,
        storage,
        primary,
        shutdown,
    })
}

/// Run the command bot and the live forwarder until a shutdown signal.
pub async fn run_serve(config: FerryConfig) -> Result<(), FerryError> {
    let started = std::time::Instant::now();
    let admins = config.telegram.admins.clone();
    if admins.is_empty() {
        warn!("telegram.admins is empty; every command will be ignored");
    }
    let runtime = build_runtime(config).await?;

    match runtime.primary.health_check().await? {
        HealthStatus::Healthy => info!("telegram primary identity reachable"),
        HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
            error!(reason, "telegram primary identity unreachable");
            return Err(FerryError::Config(format!(
                "cannot reach Telegram with telegram.bot_token: {reason}"
            )));
        }
    }

    let forwarder = Arc::new(Forwarder::new(
        runtime.storage.clone() as Arc<dyn StorageAdapter>,
        runtime.primary.clone(),
        FORWARD_SETTLE,
    ));
    let ctx = Arc::new(BotContext {
        engine: Arc::clone(&runtime.engine),
        forwarder,
        admins,
        host: HostInfo {
            started,
            memory: memory_stats,
        },
    });

    ferry_telegram::run(ctx, runtime.primary.bot().clone(), runtime.shutdown.clone()).await;

    runtime.storage.shutdown().await?;
    info!("ferry stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ferry_core::Transport;

    use super::*;

    #[test]
    fn transports_need_a_primary_token() {
        let config = FerryConfig::default();
        match telegram_transports(&config) {
            Err(FerryError::Config(msg)) => assert!(msg.contains("bot_token")),
            Err(other) => panic!("expected Config error, got {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn secondary_identity_is_optional() {
        let mut config = FerryConfig::default();
        config.telegram.bot_token = Some("123:primary".into());
        let (primary, secondary) = telegram_transports(&config).unwrap();
        assert_eq!(primary.identity(), TransportIdentity::Primary);
        assert!(secondary.is_none());

        config.telegram.secondary_bot_token = Some("456:secondary".into());
        let (_, secondary) = telegram_transports(&config).unwrap();
        assert_eq!(secondary.unwrap().identity(), TransportIdentity::Secondary);
    }

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn memory_stats_come_from_jemalloc() {
        let stats = memory_stats().unwrap();
        assert!(stats.allocated > 0);
        assert!(stats.resident >= stats.allocated);
    }

    #[tokio::test]
    async fn storage_opens_in_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FerryConfig::default();
        config.storage.database_path = dir.path().join("ferry.db").to_string_lossy().into_owned();
        let storage = open_storage(&config).await.unwrap();
        assert_eq!(storage.catalog_count().await.unwrap(), 0);
    }
}
