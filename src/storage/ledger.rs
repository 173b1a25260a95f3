// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Wallet ledger domain types.
//!
//! A [`LedgerEntry`] is one immutable record of a wallet balance mutation,
//! keyed by the provider `reference` (the idempotency key). A [`PaymentLog`]
//! is the coarser business-intent record written alongside it; both carry the
//! same reference so they can be cross-audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direction of a balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money entering the wallet
    Fund,
    /// Money leaving the wallet
    Withdrawal,
}

/// Lifecycle status of a ledger entry.
///
/// `Pending` entries are holds awaiting an external confirmation (card leg
/// of a hybrid payment, outbound transfer). The only permitted transitions
/// are `Pending -> Success` and `Pending -> Failed`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Success,
    Failed,
}

/// Origin channel of a balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Card charge confirmed by the provider
    Card,
    /// Incoming transfer to the user's dedicated virtual account
    VirtualAccount,
    /// Outbound bank transfer (withdrawal)
    BankTransfer,
    /// Compensating credit restoring a failed hold
    Refund,
    /// Internal movement (escrow holds, fees)
    System,
}

/// One immutable wallet balance mutation.
///
/// Never physically deleted; `status` is the only field that may change
/// after creation (see [`EntryStatus`]).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    /// Owner of the mutated wallet
    pub user_id: String,
    /// Provider-supplied or self-generated idempotency key, globally unique
    pub reference: String,
    /// Positive magnitude in minor currency units (kobo)
    pub amount: u64,
    /// Fund or withdrawal
    pub direction: Direction,
    /// Current lifecycle status
    pub status: EntryStatus,
    /// Where the money came from / went to
    pub channel: Channel,
    /// Human-readable cause
    pub narration: String,
    /// Whether a trusted signal (verified webhook) confirmed this mutation,
    /// as opposed to it merely having been requested
    pub verified: bool,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a confirmed entry (webhook-verified credit or debit).
    pub fn new_success(
        user_id: String,
        reference: String,
        amount: u64,
        direction: Direction,
        channel: Channel,
        narration: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            reference,
            amount,
            direction,
            status: EntryStatus::Success,
            channel,
            narration,
            verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a pending hold awaiting external confirmation.
    pub fn new_pending(
        user_id: String,
        reference: String,
        amount: u64,
        direction: Direction,
        channel: Channel,
        narration: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            reference,
            amount,
            direction,
            status: EntryStatus::Pending,
            channel,
            narration,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the entry confirmed by a trusted signal.
    pub fn mark_success(&mut self) {
        self.status = EntryStatus::Success;
        self.verified = true;
        self.updated_at = Utc::now();
    }

    /// Mark the entry failed.
    pub fn mark_failed(&mut self) {
        self.status = EntryStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Whether the entry has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, EntryStatus::Success | EntryStatus::Failed)
    }
}

/// Business intent behind a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    WalletTopup,
    ProUpgrade,
    OrderPayment,
    CartPayment,
    HybridPayment,
    CartHybridPayment,
    SwapPayment,
    ServiceFee,
    ShippingFee,
}

/// Provider channel used for a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    VirtualAccount,
    BankTransfer,
    Wallet,
}

/// Coarse-grained record of one provider-facing payment attempt.
///
/// Records *why* money moved; the matching [`LedgerEntry`] records *that* a
/// specific wallet balance changed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentLog {
    /// Correlation key shared with the ledger entry and any orders
    pub reference: String,
    /// User the payment belongs to
    pub user_id: String,
    /// Business intent
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Provider channel
    pub method: PaymentMethod,
    /// Amount in minor currency units
    pub amount: u64,
    /// Linked order, when the intent settles one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTime<Utc>,
}

impl PaymentLog {
    /// Create a payment log entry stamped now.
    pub fn new(
        reference: String,
        user_id: String,
        payment_type: PaymentType,
        method: PaymentMethod,
        amount: u64,
        order_id: Option<String>,
    ) -> Self {
        Self {
            reference,
            user_id,
            payment_type,
            method,
            amount,
            order_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_entry_starts_unverified() {
        let entry = LedgerEntry::new_pending(
            "user-1".to_string(),
            "SWM-REF-1".to_string(),
            2500,
            Direction::Withdrawal,
            Channel::BankTransfer,
            "Withdrawal to bank".to_string(),
        );

        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(!entry.verified);
        assert!(!entry.is_terminal());
    }

    #[test]
    fn mark_success_sets_verified_and_timestamp() {
        let mut entry = LedgerEntry::new_pending(
            "user-1".to_string(),
            "SWM-REF-2".to_string(),
            1000,
            Direction::Fund,
            Channel::Card,
            "Hybrid hold".to_string(),
        );

        entry.mark_success();
        assert_eq!(entry.status, EntryStatus::Success);
        assert!(entry.verified);
        assert!(entry.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let entry = LedgerEntry::new_success(
            "user-1".to_string(),
            "SWM-REF-3".to_string(),
            500,
            Direction::Fund,
            Channel::VirtualAccount,
            "Bank transfer credit".to_string(),
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["channel"], "virtual_account");
        assert_eq!(json["direction"], "fund");
    }
}
