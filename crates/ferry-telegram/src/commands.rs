// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator command set and argument parsing.

use std::str::FromStr;

use ferry_core::{CategoryFilter, ForwardRule};
use ferry_engine::IndexRequest;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Ferry commands:")]
pub enum Command {
    #[command(description = "show this help")]
    Help,
    #[command(description = "index a source: <source> [offset] [limit] [category] [caption...]")]
    Index(String),
    #[command(description = "plan and clone the catalog: <destination> [next destinations...]")]
    Clone(String),
    #[command(description = "resume an interrupted clone")]
    Reclone,
    #[command(description = "show catalog and deferred totals")]
    Total,
    #[command(description = "list planned destinations")]
    Channels,
    #[command(description = "set the caption template ({file_name} is replaced)")]
    Setcaption(String),
    #[command(description = "show the caption template")]
    Showcaption,
    #[command(description = "remove the caption template")]
    Removecaption,
    #[command(description = "clear the catalog and the destination plan")]
    Cleardb,
    #[command(description = "drop the destination plan, keeping the catalog")]
    Clearplan,
    #[command(description = "show job status")]
    Status,
    #[command(description = "cancel the running indexing job")]
    Cancel,
    #[command(description = "move deferred items back into the catalog")]
    Requeue,
    #[command(description = "forward new posts: <source> <destination>")]
    Addchat(String),
    #[command(description = "stop forwarding: <source> <destination>")]
    Delchat(String),
    #[command(description = "list forwarding rules")]
    Listchats,
    #[command(description = "show host uptime and memory")]
    Server,
}

/// `<source> [offset] [limit] [category] [caption...]`
///
/// Positional arguments after the source are optional, but each one needs
/// the ones before it.
pub fn parse_index_args(args: &str) -> Result<IndexRequest, String> {
    let mut parts = args.split_whitespace();
    let source = parts
        .next()
        .ok_or_else(|| "usage: /index <source> [offset] [limit] [category] [caption]".to_string())?;
    let mut request = IndexRequest::new(source);

    if let Some(offset) = parts.next() {
        request.offset = offset
            .parse()
            .map_err(|_| format!("offset must be a message number, got `{offset}`"))?;
    }
    if let Some(limit) = parts.next() {
        request.limit = limit
            .parse()
            .map_err(|_| format!("limit must be a number, got `{limit}`"))?;
    }
    if let Some(category) = parts.next() {
        request.filter = CategoryFilter::from_str(category)?;
    }
    let caption = parts.collect::<Vec<_>>().join(" ");
    if !caption.is_empty() {
        request.caption = Some(caption);
    }
    Ok(request)
}

pub fn parse_destinations(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

pub fn parse_rule(args: &str) -> Result<ForwardRule, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [source, destination] => Ok(ForwardRule {
            source: (*source).to_string(),
            destination: (*destination).to_string(),
        }),
        _ => Err("usage: <source> <destination>".to_string()),
    }
}
