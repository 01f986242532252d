// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Transport`] over the Telegram Bot API.

use async_trait::async_trait;
use ferry_core::traits::PluginAdapter;
use ferry_core::{
    AdapterType, FerryError, HealthStatus, ItemKind, SourceItem, SourceWindow, Transport,
    TransportError, TransportIdentity,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, MessageId, Recipient};
use tracing::{debug, warn};

use crate::errors::{classify, classify_read, is_missing_message};
use crate::media;

/// One bot identity.
///
/// Reading a source message forwards it into `scratch_chat`, reads the
/// forwarded copy, and deletes it again. Without a scratch chat the identity
/// can still deliver but cannot index.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    identity: TransportIdentity,
    scratch_chat: Option<ChatId>,
}

impl TelegramTransport {
    pub fn new(
        token: &str,
        identity: TransportIdentity,
        scratch_chat_id: Option<i64>,
    ) -> Result<Self, FerryError> {
        if token.trim().is_empty() {
            return Err(FerryError::Config(format!(
                "telegram token for the {identity} identity cannot be empty"
            )));
        }
        Ok(Self {
            bot: Bot::new(token),
            identity,
            scratch_chat: scratch_chat_id.map(ChatId),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    async fn read_one(
        &self,
        scratch: ChatId,
        source: &str,
        sequence: i64,
    ) -> Result<Option<SourceItem>, TransportError> {
        let from = recipient(source)?;
        let forwarded = match self
            .bot
            .forward_message(scratch, from, message_id(sequence)?)
            .await
        {
            Ok(msg) => msg,
            Err(e) if is_missing_message(&e) => return Ok(None),
            Err(e) => return Err(classify_read(e, source)),
        };
        let item = media::source_item(&forwarded, sequence);
        if let Err(e) = self.bot.delete_message(scratch, forwarded.id).await {
            debug!(error = %e, "failed to remove scratch copy");
        }
        Ok(Some(item))
    }

    fn scratch(&self) -> Result<ChatId, TransportError> {
        self.scratch_chat.ok_or_else(|| TransportError::Other {
            message: "telegram.scratch_chat_id is required to read source messages".into(),
            source: None,
        })
    }
}

/// Parse a chat reference: a numeric id or an `@username`.
pub fn recipient(chat: &str) -> Result<Recipient, TransportError> {
    let chat = chat.trim();
    if let Ok(id) = chat.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat.len() > 1 && chat.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat.to_string()));
    }
    Err(TransportError::Other {
        message: format!("`{chat}` is not a chat id or @username"),
        source: None,
    })
}

fn message_id(sequence: i64) -> Result<MessageId, TransportError> {
    i32::try_from(sequence)
        .map(MessageId)
        .map_err(|_| TransportError::Other {
            message: format!("message id {sequence} is out of range"),
            source: None,
        })
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Telegram API error: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn identity(&self) -> TransportIdentity {
        self.identity
    }

    async fn send_cached(
        &self,
        destination: &str,
        content_id: &str,
        kind: ItemKind,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let to = recipient(destination)?;
        let file = InputFile::file_id(FileId(content_id.to_string()));
        let caption = caption.map(str::to_string);
        let sent = match kind {
            ItemKind::Document => {
                let mut req = self.bot.send_document(to, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            ItemKind::Photo => {
                let mut req = self.bot.send_photo(to, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            ItemKind::Video => {
                let mut req = self.bot.send_video(to, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            ItemKind::Audio => {
                let mut req = self.bot.send_audio(to, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            ItemKind::Message => {
                return Err(TransportError::InvalidHandle(
                    "bare messages have no content handle".into(),
                ));
            }
        };
        sent.map(drop).map_err(|e| classify(e, destination, ""))
    }

    async fn copy_item(
        &self,
        destination: &str,
        source: &str,
        sequence: i64,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut req = self
            .bot
            .copy_message(recipient(destination)?, recipient(source)?, message_id(sequence)?);
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        req.await
            .map(drop)
            .map_err(|e| classify(e, destination, source))
    }

    async fn copy_items(
        &self,
        destination: &str,
        source: &str,
        sequences: &[i64],
    ) -> Result<(), TransportError> {
        let ids = sequences
            .iter()
            .map(|&seq| message_id(seq))
            .collect::<Result<Vec<_>, _>>()?;
        self.bot
            .copy_messages(recipient(destination)?, recipient(source)?, ids)
            .await
            .map(drop)
            .map_err(|e| classify(e, destination, source))
    }

    async fn fetch_item(
        &self,
        source: &str,
        sequence: i64,
    ) -> Result<Option<SourceItem>, TransportError> {
        let scratch = self.scratch()?;
        self.read_one(scratch, source, sequence).await
    }

    /// Every id in the range is read; deleted ids are skipped. The Bot API
    /// cannot tell where a channel ends, so windows are never `exhausted`
    /// and the indexer stops after a long run of empty ids.
    async fn fetch_window(
        &self,
        source: &str,
        offset: i64,
        limit: usize,
    ) -> Result<SourceWindow, TransportError> {
        let scratch = self.scratch()?;
        let mut window = SourceWindow {
            scanned_to: offset,
            ..SourceWindow::default()
        };
        let end = offset.saturating_add(i64::try_from(limit).unwrap_or(i64::MAX));
        for sequence in offset.saturating_add(1)..=end {
            match self.read_one(scratch, source, sequence).await {
                Ok(Some(item)) => window.items.push(item),
                Ok(None) => {}
                // Hand back what was read; the next window picks up after it.
                Err(TransportError::Throttled { wait }) if window.scanned_to > offset => {
                    warn!(source, sequence, ?wait, "throttled mid-window");
                    break;
                }
                Err(e) => return Err(e),
            }
            window.scanned_to = sequence;
        }
        Ok(window)
    }

    async fn can_read(&self, source: &str) -> bool {
        let Ok(chat) = recipient(source) else {
            return false;
        };
        match self.bot.get_chat(chat).await {
            Ok(_) => true,
            Err(e) => {
                debug!(source, identity = %self.identity, error = %e, "source not readable");
                false
            }
        }
    }
}
