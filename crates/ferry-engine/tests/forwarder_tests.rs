// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live forwarding of new posts.

use std::sync::Arc;
use std::time::Duration;

use ferry_core::{ForwardRule, TransportError};
use ferry_engine::Forwarder;
use ferry_test_utils::fixtures::{group_part, text};
use ferry_test_utils::{MockTransport, SendMethod, TestHarness};

const SETTLE: Duration = Duration::from_millis(200);

async fn forwarder_with_rules(harness: &TestHarness, destinations: &[&str]) -> Arc<Forwarder> {
    for destination in destinations {
        harness
            .storage
            .add_forward_rule(&ForwardRule {
                source: "-1".into(),
                destination: destination.to_string(),
            })
            .await
            .unwrap();
    }
    Arc::new(Forwarder::new(
        Arc::clone(&harness.storage),
        harness.primary.clone(),
        SETTLE,
    ))
}

#[tokio::test]
async fn posts_without_rules_are_ignored() {
    let harness = TestHarness::new().await.unwrap();
    let forwarder = forwarder_with_rules(&harness, &[]).await;
    assert_eq!(forwarder.on_post("-1", &text(1)).await.unwrap(), 0);
    assert_eq!(harness.primary.sent_count().await, 0);
}

#[tokio::test]
async fn single_post_reaches_every_destination() {
    let harness = TestHarness::new().await.unwrap();
    let forwarder = forwarder_with_rules(&harness, &["-2", "-3"]).await;
    assert_eq!(forwarder.on_post("-1", &text(5)).await.unwrap(), 2);

    let mut destinations: Vec<String> = harness
        .primary
        .sent()
        .await
        .into_iter()
        .map(|s| s.destination)
        .collect();
    destinations.sort();
    assert_eq!(destinations, vec!["-2", "-3"]);
}

#[tokio::test]
async fn group_is_copied_once_after_settling() {
    let harness = TestHarness::new().await.unwrap();
    let forwarder = forwarder_with_rules(&harness, &["-2"]).await;
    for part in [
        group_part(10, "album", Some("a")),
        group_part(12, "album", None),
        group_part(11, "album", None),
    ] {
        assert_eq!(forwarder.on_post("-1", &part).await.unwrap(), 0);
    }
    assert_eq!(harness.primary.sent_count().await, 0);

    tokio::time::sleep(SETTLE * 4).await;
    let sent = harness.primary.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, SendMethod::CopyMany);
    assert_eq!(sent[0].key, "-1:10,11,12");

    assert_eq!(forwarder.flush_group("-1", "album").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn throttled_copy_is_retried_once() {
    let harness = TestHarness::new().await.unwrap();
    let forwarder = forwarder_with_rules(&harness, &["-2"]).await;
    harness
        .primary
        .fail_next(
            MockTransport::copy_key("-1", 7),
            TransportError::Throttled {
                wait: Duration::from_secs(15),
            },
        )
        .await;
    assert_eq!(forwarder.on_post("-1", &text(7)).await.unwrap(), 1);

    harness
        .primary
        .fail_next(
            MockTransport::copy_key("-1", 8),
            TransportError::Throttled {
                wait: Duration::from_secs(15),
            },
        )
        .await;
    harness
        .primary
        .fail_next(
            MockTransport::copy_key("-1", 8),
            TransportError::Throttled {
                wait: Duration::from_secs(15),
            },
        )
        .await;
    assert_eq!(forwarder.on_post("-1", &text(8)).await.unwrap(), 0);
    assert_eq!(harness.primary.sent_count().await, 1);
}
