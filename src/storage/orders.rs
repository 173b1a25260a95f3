// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Order and swap records finalized by the payment materializer.
//!
//! Orders are created at checkout time (outside this engine) in `Pending`
//! status; a confirmed payment intent transitions them to `Paid`. Multiple
//! orders may share one payment `reference` when a single charge settles a
//! cart, in which case they must transition together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment confirmation
    Pending,
    /// Payment confirmed and stamped
    Paid,
}

/// A marketplace order awaiting or holding payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Unique order identifier
    pub order_id: String,
    /// Payment reference correlating this order with its ledger entry
    /// and payment log (shared across a cart)
    pub reference: String,
    /// Buyer who pays for the order
    pub buyer_user_id: String,
    /// Order total in minor currency units
    pub amount: u64,
    /// Current payment status
    pub status: OrderStatus,
    /// Portion settled from wallet balance
    pub wallet_paid: u64,
    /// Portion settled by the provider charge
    pub paystack_paid: u64,
    /// When payment was confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// When the order was created
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order awaiting payment.
    pub fn new_pending(
        order_id: String,
        reference: String,
        buyer_user_id: String,
        amount: u64,
    ) -> Self {
        Self {
            order_id,
            reference,
            buyer_user_id,
            amount,
            status: OrderStatus::Pending,
            wallet_paid: 0,
            paystack_paid: 0,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    /// Stamp the order paid with the amounts that settled it.
    pub fn mark_paid(&mut self, wallet_paid: u64, paystack_paid: u64) {
        self.status = OrderStatus::Paid;
        self.wallet_paid = wallet_paid;
        self.paystack_paid = paystack_paid;
        self.paid_at = Some(Utc::now());
    }
}

/// Payment status of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    /// Awaiting the settlement payment (price difference / service fee)
    Pending,
    /// Settlement payment confirmed
    Paid,
}

/// A product swap whose settlement payment flows through the engine.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Swap {
    /// Unique swap identifier
    pub swap_id: String,
    /// Payment reference for the swap settlement
    pub reference: String,
    /// User paying the settlement amount
    pub payer_user_id: String,
    /// Settlement amount in minor currency units
    pub amount: u64,
    /// Current payment status
    pub status: SwapStatus,
    /// When the settlement payment was confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// When the swap was created
    pub created_at: DateTime<Utc>,
}

impl Swap {
    /// Create a pending swap awaiting settlement.
    pub fn new_pending(
        swap_id: String,
        reference: String,
        payer_user_id: String,
        amount: u64,
    ) -> Self {
        Self {
            swap_id,
            reference,
            payer_user_id,
            amount,
            status: SwapStatus::Pending,
            paid_at: None,
            created_at: Utc::now(),
        }
    }
}
