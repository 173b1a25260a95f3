// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! # Ledger Storage Module
//!
//! Persistent storage for the wallet ledger, payment logs and the order/swap
//! records the payment materializer finalizes, backed by redb (embedded,
//! pure Rust, ACID).
//!
//! ## Correctness Model
//!
//! - The ledger `reference` key is unique; duplicate-delivery safety is
//!   enforced by the storage layer, not by per-handler checks.
//! - Balance mutations commit atomically with their ledger entry in a
//!   single write transaction, never as read-modify-write across calls.
//! - Ledger entries are append-only; only `Pending -> Success|Failed`
//!   status transitions are permitted. Nothing is ever pruned; the entry
//!   history is the audit trail.

pub mod ledger;
pub mod orders;
pub mod store;

pub use ledger::{
    Channel, Direction, EntryStatus, LedgerEntry, PaymentLog, PaymentMethod, PaymentType,
};
pub use orders::{Order, OrderStatus, Swap, SwapStatus};
pub use store::{LedgerStore, RefundOutcome, StoreError, StoreResult};
