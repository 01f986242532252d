// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`Database`](crate::Database)
//! and runs one short call on the writer thread.

pub mod captions;
pub mod catalog;
pub mod deferred;
pub mod forward_rules;
pub mod shards;
