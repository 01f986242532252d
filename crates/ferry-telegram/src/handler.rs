// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch and channel-post forwarding.

use std::sync::Arc;

use ferry_core::FerryError;
use ferry_engine::allocator::shard_count;
use ferry_engine::{Engine, FixedDestinations, Forwarder};
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{self, Command};
use crate::media;
use crate::status::{self, HostInfo, StatusMessage};

/// Checks if the message sender is in the allowed list.
///
/// An empty list authorizes nobody. Matches by numeric user ID or by
/// username, case-insensitive and without the leading `@`.
pub fn is_authorized(msg: &Message, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return false;
    }
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    let user_id = user.id.0.to_string();
    let username = user.username.as_deref().map(str::to_lowercase);
    allowed.iter().any(|entry| {
        let entry = entry.trim_start_matches('@');
        entry == user_id || username.as_deref() == Some(entry.to_lowercase().as_str())
    })
}

/// Everything the dispatcher's endpoints share.
pub struct BotContext {
    pub engine: Arc<Engine>,
    pub forwarder: Arc<Forwarder>,
    pub admins: Vec<String>,
    pub host: HostInfo,
}

/// Poll for updates until `shutdown` fires.
pub async fn run(ctx: Arc<BotContext>, bot: Bot, shutdown: CancellationToken) {
    let commands = {
        let ctx = Arc::clone(&ctx);
        Update::filter_message()
            .filter_command::<Command>()
            .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                let ctx = Arc::clone(&ctx);
                async move {
                    if !is_authorized(&msg, &ctx.admins) {
                        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized command");
                        return respond(());
                    }
                    ctx.handle(bot, msg, cmd).await;
                    respond(())
                }
            })
    };
    let posts = {
        let ctx = Arc::clone(&ctx);
        Update::filter_channel_post().endpoint(move |msg: Message| {
            let ctx = Arc::clone(&ctx);
            async move {
                ctx.forward(&msg).await;
                respond(())
            }
        })
    };

    let mut dispatcher = Dispatcher::builder(bot, dptree::entry().branch(commands).branch(posts))
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if let Ok(done) = token.shutdown() {
            done.await;
        }
    });

    info!("starting Telegram long polling");
    dispatcher.dispatch().await;
    info!("Telegram polling stopped");
}

impl BotContext {
    async fn handle(&self, bot: Bot, msg: Message, cmd: Command) {
        let chat = msg.chat.id;
        let text = self.answer(&bot, chat, cmd).await;
        reply(&bot, chat, text).await;
    }

    /// Run one command and return the immediate reply. Long jobs are spawned
    /// and report back in `chat` on their own.
    async fn answer(&self, bot: &Bot, chat: ChatId, cmd: Command) -> String {
        match cmd {
            Command::Help => Command::descriptions().to_string(),
            Command::Index(args) => match commands::parse_index_args(&args) {
                Ok(request) => {
                    let engine = Arc::clone(&self.engine);
                    let sink = Arc::new(StatusMessage::new(bot.clone(), chat));
                    let bot = bot.clone();
                    tokio::spawn(async move {
                        let text = match engine.index(request, sink).await {
                            Ok(report) => status::format_index_report(&report),
                            Err(e) => format!("Indexing failed: {e}"),
                        };
                        reply(&bot, chat, text).await;
                    });
                    "Indexing started.".to_string()
                }
                Err(e) => e,
            },
            Command::Clone(args) => self.start_clone(bot, chat, &args).await,
            Command::Reclone => {
                let engine = Arc::clone(&self.engine);
                let sink = Arc::new(StatusMessage::new(bot.clone(), chat));
                let bot = bot.clone();
                tokio::spawn(async move {
                    let text = match engine.resume(sink).await {
                        Ok(Some(summary)) => status::format_summary(&summary),
                        Ok(None) => "Nothing to resume.".to_string(),
                        Err(e) => clone_failure(&e),
                    };
                    reply(&bot, chat, text).await;
                });
                "Resuming the clone.".to_string()
            }
            Command::Total => match self.engine.totals().await {
                Ok(t) => format!("Catalog: {} items\nDeferred: {} items", t.catalog, t.deferred),
                Err(e) => format!("Failed to read totals: {e}"),
            },
            Command::Channels => match self.engine.shards().await {
                Ok(shards) => status::format_shards(&shards),
                Err(e) => format!("Failed to read destinations: {e}"),
            },
            Command::Setcaption(template) => match self.engine.set_caption(template.trim()).await {
                Ok(()) => "Caption template saved.".to_string(),
                Err(e) => e.to_string(),
            },
            Command::Showcaption => match self.engine.caption().await {
                Ok(Some(template)) => format!("Caption template:\n{template}"),
                Ok(None) => "No caption template set.".to_string(),
                Err(e) => e.to_string(),
            },
            Command::Removecaption => match self.engine.clear_caption().await {
                Ok(true) => "Caption template removed.".to_string(),
                Ok(false) => "No caption template set.".to_string(),
                Err(e) => e.to_string(),
            },
            Command::Cleardb => match self.engine.reset().await {
                Ok(()) => "Catalog and destination plan cleared.".to_string(),
                Err(e) => e.to_string(),
            },
            Command::Clearplan => match self.engine.clear_plan().await {
                Ok(0) => "No destination plan to clear.".to_string(),
                Ok(n) => format!("Dropped a plan of {n} destinations; the catalog is kept."),
                Err(e) => e.to_string(),
            },
            Command::Status => {
                let s = self.engine.status();
                let indexing = if s.indexing { "running" } else { "idle" };
                format!("Clone: {}\nIndexing: {indexing}", s.clone)
            }
            Command::Cancel => {
                if self.engine.cancel_index() {
                    "Cancelling indexing.".to_string()
                } else {
                    "No indexing job is running.".to_string()
                }
            }
            Command::Requeue => match self.engine.requeue().await {
                Ok(moved) => format!("{moved} deferred items moved back to the catalog."),
                Err(e) => e.to_string(),
            },
            Command::Addchat(args) => match commands::parse_rule(&args) {
                Ok(rule) => match self.engine.add_forward_rule(&rule).await {
                    Ok(true) => format!("Forwarding {} to {}.", rule.source, rule.destination),
                    Ok(false) => "That rule already exists.".to_string(),
                    Err(e) => e.to_string(),
                },
                Err(e) => format!("/addchat {e}"),
            },
            Command::Delchat(args) => match commands::parse_rule(&args) {
                Ok(rule) => match self.engine.remove_forward_rule(&rule).await {
                    Ok(true) => "Rule removed.".to_string(),
                    Ok(false) => "No such rule.".to_string(),
                    Err(e) => e.to_string(),
                },
                Err(e) => format!("/delchat {e}"),
            },
            Command::Listchats => match self.engine.forward_rules().await {
                Ok(rules) if rules.is_empty() => "No forwarding rules.".to_string(),
                Ok(rules) => rules
                    .iter()
                    .map(|r| format!("{} -> {}", r.source, r.destination))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => e.to_string(),
            },
            Command::Server => self.host.report(),
        }
    }

    /// Every destination comes in the command itself; the first one fills
    /// shard 1.
    async fn start_clone(&self, bot: &Bot, chat: ChatId, args: &str) -> String {
        let destinations = commands::parse_destinations(args);
        let Some((first, rest)) = destinations.split_first() else {
            return "usage: /clone <destination> [next destinations...]".to_string();
        };
        let capacity = self.engine.config().clone.capacity_per_shard;
        let needed = match self.engine.totals().await {
            Ok(totals) => shard_count(totals.catalog, capacity),
            Err(e) => return format!("Failed to read totals: {e}"),
        };
        let given = destinations.len() as u64;
        if needed > given {
            return format!(
                "The catalog needs {needed} destinations of {capacity} items each; {given} given."
            );
        }

        let engine = Arc::clone(&self.engine);
        let sink = Arc::new(StatusMessage::new(bot.clone(), chat));
        let first = first.clone();
        let prompt = FixedDestinations(rest.to_vec());
        let bot = bot.clone();
        tokio::spawn(async move {
            let text = match engine.start_clone(&first, &prompt, sink).await {
                Ok(summary) => status::format_summary(&summary),
                Err(e) => clone_failure(&e),
            };
            reply(&bot, chat, text).await;
        });
        "Clone started.".to_string()
    }

    async fn forward(&self, msg: &Message) {
        let source = msg.chat.id.0.to_string();
        let item = media::source_item(msg, i64::from(msg.id.0));
        match self.forwarder.on_post(&source, &item).await {
            Ok(0) => {}
            Ok(copied) => debug!(source, copied, "channel post forwarded"),
            Err(e) => warn!(source, error = %e, "failed to forward channel post"),
        }
    }
}

fn clone_failure(err: &FerryError) -> String {
    match err {
        FerryError::DestinationAccess { .. } => {
            format!("Clone halted: {err}\nFix access to the destination, then /reclone.")
        }
        _ => format!("Clone failed: {err}"),
    }
}

async fn reply(bot: &Bot, chat: ChatId, text: String) {
    if let Err(e) = bot.send_message(chat, text).await {
        warn!(chat_id = chat.0, error = %e, "failed to send reply");
    }
}
