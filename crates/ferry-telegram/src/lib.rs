// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram support for Ferry.
//!
//! [`TelegramTransport`] implements the engine's `Transport` over the Bot
//! API via teloxide. [`handler`] runs the admin-gated command bot and feeds
//! channel posts to the live forwarder.

pub mod commands;
pub mod errors;
pub mod handler;
pub mod media;
pub mod status;
pub mod transport;

pub use commands::Command;
pub use handler::{BotContext, run};
pub use status::{HostInfo, MemoryStats, StatusMessage};
pub use transport::TelegramTransport;
