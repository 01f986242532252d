// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator operations on the engine.

mod common;

use std::sync::Arc;

use ferry_core::{DestinationShard, FerryError, ForwardRule, RunStatus, TransportIdentity};
use ferry_engine::{EngineStatus, FixedDestinations, LogProgress, Totals};
use ferry_test_utils::TestHarness;
use ferry_test_utils::fixtures::catalog_items;

use common::engine;

#[tokio::test]
async fn totals_count_catalog_and_deferred() {
    let harness = TestHarness::new().await.unwrap();
    let items = catalog_items("-1", 4, TransportIdentity::Primary);
    harness.seed_catalog(&items).await.unwrap();
    harness.storage.defer_item(&items[0], "gone").await.unwrap();

    let engine = engine(&harness);
    assert_eq!(
        engine.totals().await.unwrap(),
        Totals {
            catalog: 3,
            deferred: 1,
        }
    );
}

#[tokio::test]
async fn reset_wipes_catalog_and_plan() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .seed_catalog(&catalog_items("-1", 4, TransportIdentity::Primary))
        .await
        .unwrap();
    harness
        .seed_shards(&[DestinationShard::new("-2", 1, 4)])
        .await
        .unwrap();
    let engine = engine(&harness);

    engine.reset().await.unwrap();
    assert_eq!(harness.storage.catalog_count().await.unwrap(), 0);
    assert!(engine.shards().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clearing_the_plan_keeps_the_catalog() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .seed_catalog(&catalog_items("-1", 5, TransportIdentity::Primary))
        .await
        .unwrap();
    harness.primary.reject_destination("-100typo", "chat not found").await;
    let engine = engine(&harness);
    let prompt = FixedDestinations::default();

    let err = engine
        .start_clone("-100typo", &prompt, Arc::new(LogProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::DestinationAccess { delivered: 0, .. }));
    let err = engine
        .start_clone("-100good", &prompt, Arc::new(LogProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::PlanInProgress { pending: 5 }));

    assert_eq!(engine.clear_plan().await.unwrap(), 1);
    assert!(engine.shards().await.unwrap().is_empty());
    assert_eq!(harness.storage.catalog_count().await.unwrap(), 5);
    assert_eq!(engine.clear_plan().await.unwrap(), 0);

    let summary = engine
        .start_clone("-100good", &prompt, Arc::new(LogProgress))
        .await
        .unwrap();
    assert_eq!(summary.delivered, 5);
    assert!(
        harness
            .primary
            .sent()
            .await
            .iter()
            .all(|s| s.destination == "-100good")
    );
}

#[tokio::test]
async fn caption_template_lifecycle() {
    let harness = TestHarness::new().await.unwrap();
    let engine = engine(&harness);

    assert!(matches!(
        engine.set_caption("   ").await,
        Err(FerryError::Validation(_))
    ));
    engine.set_caption("{file_name} via ferry").await.unwrap();
    assert_eq!(
        engine.caption().await.unwrap().as_deref(),
        Some("{file_name} via ferry")
    );
    assert!(engine.clear_caption().await.unwrap());
    assert!(!engine.clear_caption().await.unwrap());
    assert_eq!(engine.caption().await.unwrap(), None);
}

#[tokio::test]
async fn forward_rules_are_validated() {
    let harness = TestHarness::new().await.unwrap();
    let engine = engine(&harness);
    let loopback = ForwardRule {
        source: "-1".into(),
        destination: "-1".into(),
    };
    assert!(matches!(
        engine.add_forward_rule(&loopback).await,
        Err(FerryError::Validation(_))
    ));

    let rule = ForwardRule {
        source: "-1".into(),
        destination: "-2".into(),
    };
    assert!(engine.add_forward_rule(&rule).await.unwrap());
    assert_eq!(engine.forward_rules().await.unwrap(), vec![rule.clone()]);
    assert!(engine.remove_forward_rule(&rule).await.unwrap());
    assert!(engine.forward_rules().await.unwrap().is_empty());
}

#[tokio::test]
async fn idle_engine_reports_idle() {
    let harness = TestHarness::new().await.unwrap();
    let engine = engine(&harness);
    assert_eq!(
        engine.status(),
        EngineStatus {
            clone: RunStatus::Idle,
            indexing: false,
        }
    );
    assert!(!engine.cancel_index());
    assert_eq!(*engine.subscribe_clone_status().borrow(), RunStatus::Idle);
}

#[tokio::test]
async fn empty_catalog_cannot_be_cloned() {
    let harness = TestHarness::new().await.unwrap();
    let engine = engine(&harness);
    let err = engine
        .start_clone(
            "-2",
            &ferry_engine::FixedDestinations::default(),
            std::sync::Arc::new(ferry_engine::LogProgress),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FerryError::Validation(_)));
}
