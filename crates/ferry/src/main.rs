// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ferry - bulk clone engine for Telegram channels.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cli;
mod progress;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ferry_core::CategoryFilter;

/// Ferry - bulk clone engine for Telegram channels.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the usual locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a source chat into the catalog.
    #[command(allow_negative_numbers = true)]
    Index {
        /// Chat id or @username.
        source: String,
        /// Start after this message number.
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Stop after this many items (0 for no limit).
        #[arg(long, default_value_t = 0)]
        limit: u64,
        /// all, docs, document, photo, video or audio.
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        /// Caption for every indexed item.
        #[arg(long)]
        caption: Option<String>,
    },
    /// Plan destination shards for the catalog and deliver it.
    #[command(allow_negative_numbers = true)]
    Clone {
        /// Destination of the first shard.
        destination: String,
        /// Destinations of the following shards, in order. Missing ones are
        /// asked for interactively.
        #[arg(long = "next")]
        next: Vec<String>,
    },
    /// Continue an interrupted clone.
    Resume,
    /// Show catalog and deferred totals.
    Total,
    /// List the destination plan.
    Shards,
    /// Clear the catalog and the destination plan.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Drop the destination plan and keep the catalog.
    ClearPlan {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Manage the caption template.
    Caption {
        #[command(subcommand)]
        action: CaptionAction,
    },
    /// Move deferred items back into the catalog.
    Requeue,
    /// Show totals, the plan and whether a clone can be resumed.
    Status,
    /// Run the Telegram command bot and live forwarder.
    Serve,
}

#[derive(Subcommand, Debug)]
enum CaptionAction {
    /// Print the current template.
    Show,
    /// Set the template; `{file_name}` is replaced by the item's name.
    Set { template: String },
    /// Remove the template.
    Remove,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ferry_config::load_and_validate_path(path),
        None => ferry_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ferry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        command => cli::run(command, config).await,
    };
    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}
