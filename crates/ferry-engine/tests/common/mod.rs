// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use ferry_core::Transport;
use ferry_engine::{Engine, Progress, ProgressSink, Transports};
use ferry_test_utils::TestHarness;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Keeps every progress update for assertions.
#[derive(Default)]
pub struct CollectProgress {
    events: Mutex<Vec<Progress>>,
}

impl CollectProgress {
    pub async fn events(&self) -> Vec<Progress> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl ProgressSink for CollectProgress {
    async fn report(&self, progress: Progress) {
        self.events.lock().await.push(progress);
    }
}

pub fn transports(harness: &TestHarness) -> Transports {
    Transports {
        primary: harness.primary.clone(),
        secondary: Some(harness.secondary.clone() as Arc<dyn Transport>),
    }
}

pub fn engine(harness: &TestHarness) -> Engine {
    Engine::new(
        harness.config.clone(),
        Arc::clone(&harness.storage),
        transports(harness),
        CancellationToken::new(),
    )
}
