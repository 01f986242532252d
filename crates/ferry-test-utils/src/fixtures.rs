// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for source messages and catalog items.

use ferry_core::{CatalogItem, ItemKind, MediaRef, SourceItem, TransportIdentity};

/// A message carrying media.
pub fn media(sequence: i64, content_id: &str, kind: ItemKind, name: &str) -> SourceItem {
    SourceItem {
        sequence,
        media: Some(MediaRef {
            content_id: content_id.to_string(),
            send_handle: None,
            kind,
            display_name: Some(name.to_string()),
        }),
        caption: None,
        group_id: None,
    }
}

/// A message without media.
pub fn text(sequence: i64) -> SourceItem {
    SourceItem {
        sequence,
        media: None,
        caption: Some(format!("text {sequence}")),
        group_id: None,
    }
}

/// One part of a multi-part group.
pub fn group_part(sequence: i64, group: &str, caption: Option<&str>) -> SourceItem {
    SourceItem {
        sequence,
        media: Some(MediaRef {
            content_id: format!("photo-{sequence}"),
            send_handle: None,
            kind: ItemKind::Photo,
            display_name: None,
        }),
        caption: caption.map(str::to_string),
        group_id: Some(group.to_string()),
    }
}

/// A catalog row for a video in `source`.
pub fn catalog_item(source: &str, sequence: i64, identity: TransportIdentity) -> CatalogItem {
    CatalogItem {
        content_id: format!("file-{source}-{sequence}"),
        send_handle: None,
        display_name: format!("clip-{sequence}.mp4"),
        source_location: source.to_string(),
        kind: ItemKind::Video,
        source_sequence: sequence,
        identity,
        caption: None,
    }
}

/// `count` catalog rows with sequences `1..=count`.
pub fn catalog_items(source: &str, count: i64, identity: TransportIdentity) -> Vec<CatalogItem> {
    (1..=count)
        .map(|seq| catalog_item(source, seq, identity))
        .collect()
}
