// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Event classification: map a verified provider event onto a typed
//! payment intent.
//!
//! Charge successes are disambiguated by the `purpose` tag the checkout
//! layer wrote into the event metadata at initiation time. An unrecognized
//! purpose falls back to a wallet top-up (the money did arrive, so the
//! safest interpretation is to credit it) and the fallback is logged.
//! Intents that settle a specific entity read the id from
//! `metadata.entity_id`; a missing or empty id drops the event.

use tracing::warn;

use crate::provider::{EventData, EventKind};

/// Business purpose tag carried in charge metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    WalletTopup,
    ProUpgrade,
    OrderPayment,
    HybridPayment,
    CartPayment,
    CartHybridPayment,
    SwapPayment,
}

impl Purpose {
    /// Parse a metadata purpose tag. `None` tag or unknown value both fall
    /// back to [`Purpose::WalletTopup`] (documented default, not an error).
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("wallet_topup") | None => Self::WalletTopup,
            Some("pro_upgrade") => Self::ProUpgrade,
            Some("order_payment") => Self::OrderPayment,
            Some("hybrid_payment") => Self::HybridPayment,
            Some("cart_payment") => Self::CartPayment,
            Some("cart_hybrid_payment") => Self::CartHybridPayment,
            Some("swap_payment") => Self::SwapPayment,
            Some(other) => {
                warn!(purpose = other, "unrecognized payment purpose, treating as wallet top-up");
                Self::WalletTopup
            }
        }
    }
}

/// Typed intent consumed by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntent {
    /// Credit the full charge amount to the customer's wallet
    WalletTopup,
    /// Incoming transfer to the customer's dedicated virtual account
    VirtualAccountCredit,
    /// Activate a pro subscription; no wallet mutation
    ProUpgrade,
    /// Settle a single order paid fully through the provider
    OrderPayment { order_id: String },
    /// Settle the card leg of a hybrid (wallet + card) order payment
    HybridPayment { order_id: String },
    /// Settle every order sharing the payment reference
    CartPayment,
    /// Settle the card leg of a hybrid cart payment
    CartHybridPayment,
    /// Finalize a swap's settlement payment
    SwapPayment { swap_id: String },
    /// A card charge failed; compensate any wallet hold under the reference
    ChargeLegFailed,
    /// An outbound transfer settled; confirm the pending withdrawal
    WithdrawalSettled,
    /// An outbound transfer failed or was reversed; refund the withdrawal
    WithdrawalFailed,
}

/// Classify a verified event. Returns `None` when the event should be
/// dropped (logged upstream as ignored); never panics on malformed input.
pub fn classify(kind: EventKind, data: &EventData) -> Option<PaymentIntent> {
    match kind {
        EventKind::ChargeSuccess => classify_charge_success(data),
        EventKind::ChargeFailed => Some(PaymentIntent::ChargeLegFailed),
        EventKind::VirtualAccountCredit => Some(PaymentIntent::VirtualAccountCredit),
        EventKind::TransferSuccess => Some(PaymentIntent::WithdrawalSettled),
        EventKind::TransferFailed => Some(PaymentIntent::WithdrawalFailed),
    }
}

fn classify_charge_success(data: &EventData) -> Option<PaymentIntent> {
    let purpose = Purpose::from_tag(data.metadata.purpose.as_deref());
    match purpose {
        Purpose::WalletTopup => Some(PaymentIntent::WalletTopup),
        Purpose::ProUpgrade => Some(PaymentIntent::ProUpgrade),
        Purpose::CartPayment => Some(PaymentIntent::CartPayment),
        Purpose::CartHybridPayment => Some(PaymentIntent::CartHybridPayment),
        Purpose::OrderPayment => {
            let order_id = require_entity(data, "order")?;
            Some(PaymentIntent::OrderPayment { order_id })
        }
        Purpose::HybridPayment => {
            let order_id = require_entity(data, "order")?;
            Some(PaymentIntent::HybridPayment { order_id })
        }
        Purpose::SwapPayment => {
            let swap_id = require_entity(data, "swap")?;
            Some(PaymentIntent::SwapPayment { swap_id })
        }
    }
}

/// Pull the correlated entity id out of the metadata, dropping the event
/// (with a log line) when it is absent or empty.
fn require_entity(data: &EventData, entity: &str) -> Option<String> {
    match data.metadata.entity_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            warn!(
                reference = %data.reference,
                entity,
                "event missing entity_id metadata, dropping"
            );
            None
        }
    }
}
