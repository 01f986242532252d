// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Ferry clone engine.
//!
//! [`indexer`] fills the catalog from a source, [`allocator`] splits it into
//! destination shards, and [`pump`] delivers it under the pacing of
//! [`governor`]. [`resume`] picks an interrupted plan back up. [`Engine`]
//! wires these together for the front-ends.

pub mod allocator;
pub mod caption;
pub mod controller;
pub mod forwarder;
pub mod governor;
pub mod indexer;
pub mod progress;
pub mod pump;
pub mod resume;
pub mod run_lock;
pub mod shutdown;

pub use allocator::{DestinationPrompt, FixedDestinations};
pub use controller::{Engine, EngineStatus, Totals};
pub use forwarder::Forwarder;
pub use governor::{Cooldown, RateGovernor};
pub use indexer::{IndexReport, IndexRequest, IndexSettings, Indexer};
pub use progress::{LogProgress, Progress, ProgressSink};
pub use pump::{DeliverySummary, Pump, PumpOutcome, PumpSettings, RunState, Transports};
pub use resume::{ResumePoint, resume_point};
pub use run_lock::{RunGuard, RunLock};
