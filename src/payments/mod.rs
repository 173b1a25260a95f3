// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Payment processing: event classification, the apply-payment-intent
//! orchestrator, and the compensation engine.

pub mod classifier;
pub mod compensation;
pub mod processor;

pub use classifier::{classify, PaymentIntent, Purpose};
pub use compensation::{compensate, CompensationOutcome};
pub use processor::{PaymentProcessor, WebhookOutcome};
