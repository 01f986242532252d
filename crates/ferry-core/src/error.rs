// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ferry clone engine.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across Ferry adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors that the engine does not recover from on its own.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operator input rejected before any work started.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A destination refused delivery. The run halted and can be resumed.
    #[error(
        "destination {destination_id} (shard {shard_index}) is unavailable after {delivered} deliveries: {reason}"
    )]
    DestinationAccess {
        shard_index: u32,
        destination_id: String,
        delivered: u64,
        reason: String,
    },

    /// The destination ledger is empty, so there is nowhere to deliver to.
    #[error("no destination configured; run a clone first")]
    NoDestination,

    /// A shard plan with unconsumed work already exists.
    #[error("a clone plan is still in progress ({pending} items pending); resume it or reset first")]
    PlanInProgress { pending: u64 },

    /// Another job of the same kind is already running.
    #[error("{job} is already running")]
    Busy { job: &'static str },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classified outcome of a failed transport call.
///
/// The engine reacts to each variant differently: throttling waits and retries,
/// a stale handle falls back to copy, an unavailable destination halts the run.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The cached content handle is no longer accepted by the provider.
    #[error("content handle rejected: {0}")]
    InvalidHandle(String),

    /// The provider asked us to back off for `wait`.
    #[error("throttled, retry after {wait:?}")]
    Throttled { wait: Duration },

    /// The destination cannot be written to (missing, kicked, no rights).
    #[error("destination {destination} unavailable: {reason}")]
    DestinationUnavailable { destination: String, reason: String },

    /// The source message could not be read.
    #[error("source {source_location} unavailable: {reason}")]
    SourceUnavailable {
        source_location: String,
        reason: String,
    },

    /// Anything the transport could not classify.
    #[error("{message}")]
    Other {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    /// Provider-requested wait, if this is a throttling error.
    pub fn throttle_wait(&self) -> Option<Duration> {
        match self {
            TransportError::Throttled { wait } => Some(*wait),
            _ => None,
        }
    }
}

impl From<TransportError> for FerryError {
    fn from(err: TransportError) -> Self {
        FerryError::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
