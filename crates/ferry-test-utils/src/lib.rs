// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ferry integration tests.
//!
//! Provides a scripted transport and a harness with temporary storage for
//! fast, deterministic tests without a live messaging service.
//!
//! # Components
//!
//! - [`MockTransport`] - Transport with seeded sources, scripted failures, and captured sends
//! - [`TestHarness`] - Temp SQLite storage, both mock identities, and test-friendly config
//! - [`fixtures`] - Builders for source messages and catalog items

pub mod fixtures;
pub mod harness;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_transport::{MockTransport, SendMethod, SentRecord};
