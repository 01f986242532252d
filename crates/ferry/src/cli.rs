// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI subcommands.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use ferry_config::model::FerryConfig;
use ferry_core::{DestinationShard, FerryError, PluginAdapter};
use ferry_engine::{
    DeliverySummary, DestinationPrompt, Engine, IndexRequest, ResumePoint, resume_point,
};
use indicatif::ProgressBar;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::progress::SpinnerProgress;
use crate::serve::build_runtime;
use crate::{CaptionAction, Commands};

pub async fn run(command: Commands, config: FerryConfig) -> Result<(), FerryError> {
    let runtime = build_runtime(config).await?;
    let result = dispatch(command, &runtime.engine).await;
    runtime.storage.shutdown().await?;
    result
}

async fn dispatch(command: Commands, engine: &Arc<Engine>) -> Result<(), FerryError> {
    match command {
        Commands::Index {
            source,
            offset,
            limit,
            category,
            caption,
        } => {
            let request = IndexRequest {
                offset,
                limit,
                filter: category,
                caption,
                ..IndexRequest::new(source)
            };
            let spinner = Arc::new(SpinnerProgress::new("indexing"));
            let result = engine.index(request, spinner.clone()).await;
            spinner.finish();
            let report = result?;
            let head = if report.cancelled {
                "indexing cancelled".yellow()
            } else {
                "indexing finished".green()
            };
            println!(
                "{head}: {} processed, {} saved, {} skipped (last message {})",
                report.processed, report.saved, report.skipped, report.last_sequence
            );
        }
        Commands::Clone { destination, next } => {
            let spinner = Arc::new(SpinnerProgress::new("planning shards"));
            let prompt = ReadlinePrompt::new(next, Some(spinner.bar()));
            let result = engine
                .start_clone(&destination, &prompt, spinner.clone())
                .await;
            spinner.finish();
            print_clone_result(result)?;
        }
        Commands::Resume => {
            let spinner = Arc::new(SpinnerProgress::new("resuming"));
            let result = engine.resume(spinner.clone()).await;
            spinner.finish();
            match result {
                Ok(None) => println!("{}", "nothing to resume".dimmed()),
                Ok(Some(summary)) => print_clone_result(Ok(summary))?,
                Err(e) => print_clone_result(Err(e))?,
            }
        }
        Commands::Total => {
            let totals = engine.totals().await?;
            println!("catalog:  {}", totals.catalog.to_string().bold());
            println!("deferred: {}", totals.deferred.to_string().bold());
        }
        Commands::Shards => print_shards(&engine.shards().await?),
        Commands::Reset { yes } => {
            if !yes && !ask("Clear the catalog and the destination plan?").await? {
                println!("{}", "aborted".dimmed());
                return Ok(());
            }
            engine.reset().await?;
            println!("{}", "catalog and destination plan cleared".green());
        }
        Commands::ClearPlan { yes } => {
            if !yes && !ask("Drop the destination plan? The catalog is kept.").await? {
                println!("{}", "aborted".dimmed());
                return Ok(());
            }
            match engine.clear_plan().await? {
                0 => println!("{}", "no destination plan to clear".dimmed()),
                n => println!("{}", format!("dropped a plan of {n} destinations").green()),
            }
        }
        Commands::Caption { action } => match action {
            CaptionAction::Show => match engine.caption().await? {
                Some(template) => println!("{template}"),
                None => println!("{}", "no caption template set".dimmed()),
            },
            CaptionAction::Set { template } => {
                engine.set_caption(&template).await?;
                println!("{}", "caption template saved".green());
            }
            CaptionAction::Remove => {
                if engine.clear_caption().await? {
                    println!("{}", "caption template removed".green());
                } else {
                    println!("{}", "no caption template set".dimmed());
                }
            }
        },
        Commands::Requeue => {
            let moved = engine.requeue().await?;
            println!("{moved} deferred items moved back to the catalog");
        }
        Commands::Status => {
            let totals = engine.totals().await?;
            println!(
                "catalog: {} | deferred: {}",
                totals.catalog, totals.deferred
            );
            match resume_point(engine.storage().as_ref()).await? {
                ResumePoint::NothingToResume => println!("{}", "no clone in progress".dimmed()),
                ResumePoint::Resume { delivered, pending } => println!(
                    "{}: {delivered} delivered, {pending} pending (run `ferry resume`)",
                    "clone interrupted".yellow()
                ),
            }
            print_shards(&engine.shards().await?);
        }
        Commands::Serve => {
            return Err(FerryError::Internal(
                "serve is a long-running command".into(),
            ));
        }
    }
    Ok(())
}

fn print_clone_result(result: Result<DeliverySummary, FerryError>) -> Result<(), FerryError> {
    match result {
        Ok(summary) => {
            let head = if summary.cancelled {
                "clone stopped".yellow()
            } else {
                "clone finished".green()
            };
            println!(
                "{head}: {} delivered, {} deferred",
                summary.delivered, summary.deferred
            );
            print_shards(&summary.shards);
            Ok(())
        }
        Err(e @ FerryError::DestinationAccess { .. }) => {
            eprintln!("{}: {e}", "halted".red());
            eprintln!("fix access to the destination, then run `ferry resume`");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn print_shards(shards: &[DestinationShard]) {
    if shards.is_empty() {
        println!("{}", "no destinations planned".dimmed());
        return;
    }
    println!(
        "{:>5}  {:<24} {:<9} {:>10} {:>10}",
        "shard".bold(),
        "destination".bold(),
        "state".bold(),
        "delivered".bold(),
        "pending".bold()
    );
    for s in shards {
        println!(
            "{:>5}  {:<24} {:<9} {:>10} {:>10}",
            s.shard_index, s.destination_id, s.state, s.delivered_count, s.pending_count
        );
    }
}

/// Destinations for shards after the first: taken from `--next` in order,
/// then asked for on the terminal.
pub struct ReadlinePrompt {
    preset: Vec<String>,
    bar: Option<ProgressBar>,
}

impl ReadlinePrompt {
    pub fn new(preset: Vec<String>, bar: Option<ProgressBar>) -> Self {
        Self { preset, bar }
    }
}

#[async_trait]
impl DestinationPrompt for ReadlinePrompt {
    async fn destination_for(&self, shard_index: u32, pending: u64) -> Result<String, FerryError> {
        let slot = shard_index.saturating_sub(2) as usize;
        if let Some(destination) = self.preset.get(slot) {
            return Ok(destination.clone());
        }
        let question = format!("destination for shard {shard_index} ({pending} items): ");
        let bar = self.bar.clone();
        let answer = tokio::task::spawn_blocking(move || match bar {
            Some(bar) => bar.suspend(|| read_line(&question)),
            None => read_line(&question),
        })
        .await
        .map_err(|e| FerryError::Internal(format!("prompt task failed: {e}")))??;
        match answer {
            Some(line) if !line.is_empty() => Ok(line),
            _ => Err(FerryError::Validation(format!(
                "no destination given for shard {shard_index}"
            ))),
        }
    }
}

/// `None` when the operator aborts with Ctrl+C or Ctrl+D.
fn read_line(prompt: &str) -> Result<Option<String>, FerryError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| FerryError::Internal(format!("failed to initialize readline: {e}")))?;
    match rl.readline(prompt) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(FerryError::Internal(format!("readline failed: {e}"))),
    }
}

async fn ask(question: &str) -> Result<bool, FerryError> {
    let prompt = format!("{question} [y/N] ");
    let answer = tokio::task::spawn_blocking(move || read_line(&prompt))
        .await
        .map_err(|e| FerryError::Internal(format!("prompt task failed: {e}")))??;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}
