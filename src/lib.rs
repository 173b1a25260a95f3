// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Swapmart Payments Server - Webhook Ingestion & Wallet Ledger Engine
//!
//! This crate receives asynchronous payment-provider webhooks (card charges,
//! virtual account credits, outbound transfer outcomes) and reconciles them
//! into an auditable wallet ledger. Every balance mutation is exactly-once:
//! the ledger reference doubles as the idempotency key, enforced inside a
//! single storage transaction.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `provider` - Webhook signature verification and event envelope parsing
//! - `payments` - Event classification, intent application, compensation
//! - `storage` - Embedded ACID ledger store (redb)
//! - `notify` - Fire-and-forget user notification fan-out

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod payments;
pub mod provider;
pub mod state;
pub mod storage;
