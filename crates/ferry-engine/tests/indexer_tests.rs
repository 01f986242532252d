// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexer behavior against a scripted source.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ferry_core::{CategoryFilter, FerryError, ItemKind, TransportError, TransportIdentity};
use ferry_engine::{IndexReport, IndexRequest, IndexSettings, Indexer, LogProgress, Progress};
use ferry_test_utils::TestHarness;
use ferry_test_utils::fixtures::{group_part, media, text};
use tokio_util::sync::CancellationToken;

use common::{CollectProgress, engine};

const SOURCE: &str = "-1001";

async fn seed_mixed(harness: &TestHarness) {
    harness
        .primary
        .add_source_items(
            SOURCE,
            [
                media(1, "doc-1", ItemKind::Document, "a.pdf"),
                media(2, "vid-2", ItemKind::Video, "b.mp4"),
                text(3),
                media(4, "pic-4", ItemKind::Photo, "c.jpg"),
                media(5, "aud-5", ItemKind::Audio, "d.mp3"),
                text(6),
            ],
        )
        .await;
}

fn indexer(harness: &TestHarness) -> Indexer {
    Indexer::new(
        Arc::clone(&harness.storage),
        harness.primary.clone(),
        Arc::new(LogProgress),
        IndexSettings::from(&harness.config.index),
    )
}

#[tokio::test]
async fn reindexing_the_same_range_only_skips() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    let request = IndexRequest::new(SOURCE);
    let cancel = CancellationToken::new();

    let first = indexer(&harness).run(&request, &cancel).await.unwrap();
    assert_eq!(
        first,
        IndexReport {
            processed: 6,
            saved: 6,
            skipped: 0,
            last_sequence: 6,
            cancelled: false,
        }
    );

    let second = indexer(&harness).run(&request, &cancel).await.unwrap();
    assert_eq!(second.saved, 0);
    assert_eq!(second.skipped, 6);
    assert_eq!(harness.storage.catalog_count().await.unwrap(), 6);
}

#[tokio::test]
async fn bare_messages_are_keyed_by_source_and_sequence() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();

    let catalog = harness.storage.fetch_catalog().await.unwrap();
    let bare = catalog
        .iter()
        .find(|i| i.source_sequence == 3)
        .unwrap();
    assert_eq!(bare.content_id, "-1001_3");
    assert_eq!(bare.display_name, "message_-1001_3");
    assert_eq!(bare.kind, ItemKind::Message);
    assert_eq!(bare.caption.as_deref(), Some("text 3"));
    assert_eq!(bare.identity, TransportIdentity::Primary);
}

#[tokio::test]
async fn category_filter_limits_kinds() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    let request = IndexRequest {
        filter: CategoryFilter::DocumentsAndVideos,
        ..IndexRequest::new(SOURCE)
    };
    let report = indexer(&harness)
        .run(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.processed, 2);

    let kinds: Vec<ItemKind> = harness
        .storage
        .fetch_catalog()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.kind)
        .collect();
    assert_eq!(kinds, vec![ItemKind::Document, ItemKind::Video]);

    let photos = IndexRequest {
        filter: CategoryFilter::Only(ItemKind::Photo),
        ..IndexRequest::new(SOURCE)
    };
    let report = indexer(&harness)
        .run(&photos, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((report.processed, report.saved), (1, 1));
}

#[tokio::test]
async fn offset_and_limit_bound_the_scan() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(SOURCE, (1..=20).map(text))
        .await;
    let request = IndexRequest {
        offset: 5,
        limit: 4,
        ..IndexRequest::new(SOURCE)
    };
    let report = indexer(&harness)
        .run(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.processed, 4);
    assert_eq!(report.last_sequence, 9);

    let seqs: Vec<i64> = harness
        .storage
        .fetch_catalog()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.source_sequence)
        .collect();
    assert_eq!(seqs, vec![6, 7, 8, 9]);
}

#[tokio::test]
async fn scan_pages_by_window_until_empty() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(SOURCE, (1..=450).map(text))
        .await;
    let progress = Arc::new(CollectProgress::default());
    let indexer = Indexer::new(
        Arc::clone(&harness.storage),
        harness.primary.clone(),
        progress.clone(),
        IndexSettings::from(&harness.config.index),
    );
    let report = indexer
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.saved, 450);

    let offsets: Vec<i64> = harness
        .primary
        .windows_served()
        .await
        .into_iter()
        .map(|(offset, _)| offset)
        .collect();
    assert_eq!(offsets, vec![0, 200, 400]);

    let events = progress.events().await;
    assert_eq!(
        events,
        vec![Progress::Indexed {
            processed: 250,
            saved: 200,
            skipped: 0,
            last_sequence: 250,
        }]
    );
}

#[tokio::test]
async fn deleted_runs_longer_than_a_window_are_scanned_past() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(SOURCE, (1..=50).chain(501..=520).map(text))
        .await;
    let report = indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.saved, 70);
    assert_eq!(report.last_sequence, 520);

    let offsets: Vec<i64> = harness
        .primary
        .windows_served()
        .await
        .into_iter()
        .map(|(offset, _)| offset)
        .collect();
    assert_eq!(offsets, vec![0, 200, 400]);
}

#[tokio::test]
async fn long_silence_ends_the_scan() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(SOURCE, (1..=10).chain(2_000..=2_005).map(text))
        .await;
    let settings = IndexSettings {
        max_gap: 300,
        ..IndexSettings::from(&harness.config.index)
    };
    let indexer = Indexer::new(
        Arc::clone(&harness.storage),
        harness.primary.clone(),
        Arc::new(LogProgress),
        settings,
    );
    let report = indexer
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.saved, 10);
    assert_eq!(harness.primary.windows_served().await.len(), 2);
}

#[tokio::test]
async fn group_captions_join_onto_first_part() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(
            SOURCE,
            [
                text(1),
                group_part(4, "album", None),
                group_part(2, "album", Some("first")),
                group_part(3, "album", Some("second")),
                text(5),
            ],
        )
        .await;
    indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();

    let catalog = harness.storage.fetch_catalog().await.unwrap();
    assert_eq!(catalog.len(), 5);
    let caption_of = |seq: i64| {
        catalog
            .iter()
            .find(|i| i.source_sequence == seq)
            .and_then(|i| i.caption.clone())
    };
    assert_eq!(caption_of(2).as_deref(), Some("first\nsecond"));
    assert_eq!(caption_of(3).as_deref(), Some("second"));
    assert_eq!(caption_of(4), None);

    let group_name = catalog
        .iter()
        .find(|i| i.source_sequence == 4)
        .map(|i| i.display_name.clone())
        .unwrap();
    assert_eq!(group_name, "photo_-1001_4");
}

#[tokio::test]
async fn custom_caption_replaces_every_caption() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    let request = IndexRequest {
        caption: Some("mirror".into()),
        ..IndexRequest::new(SOURCE)
    };
    indexer(&harness)
        .run(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert!(
        harness
            .storage
            .fetch_catalog()
            .await
            .unwrap()
            .iter()
            .all(|i| i.caption.as_deref() == Some("mirror"))
    );
}

#[tokio::test]
async fn repeated_content_in_one_run_is_skipped() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(
            SOURCE,
            [
                media(1, "same", ItemKind::Video, "a.mp4"),
                media(2, "same", ItemKind::Video, "a-again.mp4"),
            ],
        )
        .await;
    let report = indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((report.processed, report.saved, report.skipped), (2, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn throttled_window_is_retried_after_wait() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    harness
        .primary
        .fail_next_window(TransportError::Throttled {
            wait: Duration::from_secs(30),
        })
        .await;

    let start = tokio::time::Instant::now();
    let report = indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.saved, 6);
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test]
async fn transport_failure_keeps_collected_items() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .primary
        .add_source_items(SOURCE, (1..=300).map(text))
        .await;
    let cancel = CancellationToken::new();
    let indexer = indexer(&harness);
    let request = IndexRequest {
        limit: 200,
        ..IndexRequest::new(SOURCE)
    };
    indexer.run(&request, &cancel).await.unwrap();

    harness
        .primary
        .fail_next_window(TransportError::SourceUnavailable {
            source_location: SOURCE.into(),
            reason: "channel is private".into(),
        })
        .await;
    let err = indexer
        .run(&IndexRequest::new(SOURCE), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::Transport { .. }));
    assert_eq!(harness.storage.catalog_count().await.unwrap(), 200);
}

#[tokio::test]
async fn cancellation_stops_before_next_page() {
    let harness = TestHarness::new().await.unwrap();
    seed_mixed(&harness).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = indexer(&harness)
        .run(&IndexRequest::new(SOURCE), &cancel)
        .await
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert!(harness.primary.windows_served().await.is_empty());
}

#[tokio::test]
async fn engine_picks_first_identity_that_can_read() {
    let harness = TestHarness::new().await.unwrap();
    harness.primary.set_unreadable(SOURCE).await;
    harness
        .secondary
        .add_source_items(SOURCE, [media(1, "vid-1", ItemKind::Video, "a.mp4")])
        .await;
    let engine = engine(&harness);

    let report = engine
        .index(IndexRequest::new(SOURCE), Arc::new(LogProgress))
        .await
        .unwrap();
    assert_eq!(report.saved, 1);
    let item = &harness.storage.fetch_catalog().await.unwrap()[0];
    assert_eq!(item.identity, TransportIdentity::Secondary);
}

#[tokio::test]
async fn engine_rejects_unreadable_source() {
    let harness = TestHarness::new().await.unwrap();
    harness.primary.set_unreadable(SOURCE).await;
    harness.secondary.set_unreadable(SOURCE).await;
    let engine = engine(&harness);
    let err = engine
        .index(IndexRequest::new(SOURCE), Arc::new(LogProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::Transport { .. }));
    assert!(!engine.status().indexing);
}
