// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram messages into source items.

use ferry_core::{ItemKind, MediaRef, SourceItem};
use teloxide::types::{FileMeta, Message};

/// Read the forwardable parts of `msg`, recorded under `sequence`.
///
/// Forwarded copies carry a new message id, so the caller supplies the
/// sequence number of the original.
pub fn source_item(msg: &Message, sequence: i64) -> SourceItem {
    SourceItem {
        sequence,
        media: media_ref(msg),
        caption: msg
            .caption()
            .or_else(|| msg.text())
            .map(str::to_string),
        group_id: msg.media_group_id().map(|id| id.to_string()),
    }
}

/// Media attached to `msg`, if any of the cloned kinds.
///
/// The catalog key is the file's unique id, which stays the same across
/// messages and bots; the file id is kept separately for sending.
pub fn media_ref(msg: &Message) -> Option<MediaRef> {
    if let Some(doc) = msg.document() {
        return Some(from_file(&doc.file, ItemKind::Document, doc.file_name.clone()));
    }
    if let Some(video) = msg.video() {
        return Some(from_file(&video.file, ItemKind::Video, video.file_name.clone()));
    }
    if let Some(audio) = msg.audio() {
        return Some(from_file(&audio.file, ItemKind::Audio, audio.file_name.clone()));
    }
    // Sizes are ordered smallest first.
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(from_file(&largest.file, ItemKind::Photo, None));
    }
    None
}

fn from_file(file: &FileMeta, kind: ItemKind, display_name: Option<String>) -> MediaRef {
    MediaRef {
        content_id: file.unique_id.to_string(),
        send_handle: Some(file.id.to_string()),
        kind,
        display_name,
    }
}
