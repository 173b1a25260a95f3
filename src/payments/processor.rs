// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Payment event processor.
//!
//! [`PaymentProcessor::process_event`] is the single "apply payment intent"
//! operation: it sequences classifier → ledger writer / compensation →
//! order/swap materializer → payment log → notifier. Callers never perform
//! the individual steps themselves, so the writer-then-materializer
//! ordering and the compensation paths cannot be skipped or reordered.
//!
//! Every path funnels duplicate deliveries into [`WebhookOutcome::Duplicate`]
//! (the handler answers 200 either way, which is what stops provider
//! redelivery) and every unknown or unresolvable event into
//! [`WebhookOutcome::Ignored`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::notify::{Notification, Notifier};
use crate::provider::{EventData, WebhookEnvelope};
use crate::storage::{
    Channel, LedgerEntry, LedgerStore, PaymentLog, PaymentMethod, PaymentType, StoreError,
    StoreResult,
};

use super::classifier::{classify, PaymentIntent};
use super::compensation::{compensate, CompensationOutcome};

/// What the webhook handler should tell the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event applied; state changed.
    Processed,
    /// Event already applied earlier (at-least-once redelivery); no change.
    Duplicate,
    /// Event not relevant or not resolvable; logged, no change.
    Ignored,
}

/// Orchestrates webhook events against the ledger store.
pub struct PaymentProcessor {
    store: Arc<LedgerStore>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentProcessor {
    pub fn new(store: Arc<LedgerStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    // =========================================================================
    // Initiation paths (called by the checkout layer before contacting the
    // provider; the webhook later settles or compensates these holds)
    // =========================================================================

    /// Debit the wallet portion of a hybrid payment as a pending hold.
    pub fn begin_hybrid_hold(
        &self,
        user_id: &str,
        wallet_amount: u64,
        reference: &str,
    ) -> StoreResult<LedgerEntry> {
        self.store.debit_pending(
            user_id,
            wallet_amount,
            reference,
            Channel::System,
            "Wallet portion of hybrid payment",
        )
    }

    /// Remove a withdrawal amount from the wallet as a pending hold while
    /// the outbound transfer is in flight.
    pub fn begin_withdrawal(
        &self,
        user_id: &str,
        amount: u64,
        reference: &str,
    ) -> StoreResult<LedgerEntry> {
        self.store.debit_pending(
            user_id,
            amount,
            reference,
            Channel::BankTransfer,
            "Withdrawal to bank account",
        )
    }

    // =========================================================================
    // Webhook ingestion
    // =========================================================================

    /// Apply one verified webhook event.
    ///
    /// Returns `Err` only for storage failures the provider should retry
    /// (the handler maps those to 500); everything expected (duplicates,
    /// unknown events, unresolvable customers) is an `Ok` outcome.
    pub fn process_event(&self, envelope: &WebhookEnvelope) -> StoreResult<WebhookOutcome> {
        let Some(kind) = envelope.kind() else {
            info!(event = %envelope.event, "unhandled event type, ignoring");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(intent) = classify(kind, &envelope.data) else {
            return Ok(WebhookOutcome::Ignored);
        };

        let data = &envelope.data;
        let reference = data.reference.as_str();

        match intent {
            PaymentIntent::WalletTopup => {
                self.credit_wallet(data, Channel::Card, PaymentMethod::Card, "Wallet top-up via card")
            }
            PaymentIntent::VirtualAccountCredit => self.credit_wallet(
                data,
                Channel::VirtualAccount,
                PaymentMethod::VirtualAccount,
                "Bank transfer to virtual account",
            ),
            PaymentIntent::ProUpgrade => self.activate_pro_upgrade(data),
            PaymentIntent::OrderPayment { order_id } => {
                if !self.order_matches_reference(&order_id, reference)? {
                    return Ok(WebhookOutcome::Ignored);
                }
                self.settle_orders(data, 0, data.amount, PaymentType::OrderPayment, Some(order_id))
            }
            PaymentIntent::CartPayment => {
                self.settle_orders(data, 0, data.amount, PaymentType::CartPayment, None)
            }
            PaymentIntent::HybridPayment { order_id } => {
                if !self.order_matches_reference(&order_id, reference)? {
                    return Ok(WebhookOutcome::Ignored);
                }
                self.settle_hybrid(data, PaymentType::HybridPayment, Some(order_id))
            }
            PaymentIntent::CartHybridPayment => {
                self.settle_hybrid(data, PaymentType::CartHybridPayment, None)
            }
            PaymentIntent::SwapPayment { swap_id } => self.finalize_swap(data, &swap_id),
            PaymentIntent::ChargeLegFailed => {
                self.run_compensation(reference, "Refund: card charge failed")
            }
            PaymentIntent::WithdrawalFailed => {
                self.run_compensation(reference, "Refund: outbound transfer failed")
            }
            PaymentIntent::WithdrawalSettled => self.settle_withdrawal(reference),
        }
    }

    /// Credit the customer's wallet with the full event amount.
    fn credit_wallet(
        &self,
        data: &EventData,
        channel: Channel,
        method: PaymentMethod,
        narration: &str,
    ) -> StoreResult<WebhookOutcome> {
        let Some(user_id) = self.resolve_user(data)? else {
            return Ok(WebhookOutcome::Ignored);
        };

        let entry = match self
            .store
            .credit(&user_id, data.amount, &data.reference, channel, narration)
        {
            Ok(entry) => entry,
            Err(StoreError::DuplicateReference(reference)) => {
                info!(%reference, "duplicate credit delivery, no-op");
                // Backfill the payment log in case the earlier delivery
                // failed between the credit and the log write.
                self.store.record_payment_log(&PaymentLog::new(
                    data.reference.clone(),
                    user_id,
                    PaymentType::WalletTopup,
                    method,
                    data.amount,
                    None,
                ))?;
                return Ok(WebhookOutcome::Duplicate);
            }
            Err(e) => return Err(e),
        };

        self.store.record_payment_log(&PaymentLog::new(
            data.reference.clone(),
            user_id.clone(),
            PaymentType::WalletTopup,
            method,
            data.amount,
            None,
        ))?;

        info!(
            reference = %entry.reference,
            user_id = %user_id,
            amount = entry.amount,
            "wallet credited"
        );
        self.notifier.notify(Notification::WalletCredited {
            user_id,
            amount: entry.amount,
            reference: entry.reference,
        });
        Ok(WebhookOutcome::Processed)
    }

    /// Record a pro-upgrade payment. No wallet mutation; the payment-log
    /// insert doubles as the idempotency guard for this intent.
    fn activate_pro_upgrade(&self, data: &EventData) -> StoreResult<WebhookOutcome> {
        let Some(user_id) = self.resolve_user(data)? else {
            return Ok(WebhookOutcome::Ignored);
        };

        let inserted = self.store.record_payment_log(&PaymentLog::new(
            data.reference.clone(),
            user_id.clone(),
            PaymentType::ProUpgrade,
            PaymentMethod::Card,
            data.amount,
            None,
        ))?;
        if !inserted {
            info!(reference = %data.reference, "duplicate pro-upgrade delivery, no-op");
            return Ok(WebhookOutcome::Duplicate);
        }

        info!(reference = %data.reference, user_id = %user_id, "pro upgrade activated");
        self.notifier.notify(Notification::ProUpgradeActivated {
            user_id,
            reference: data.reference.clone(),
        });
        Ok(WebhookOutcome::Processed)
    }

    /// Transition the orders under a reference to paid and log the intent.
    fn settle_orders(
        &self,
        data: &EventData,
        wallet_paid: u64,
        paystack_paid: u64,
        payment_type: PaymentType,
        order_id: Option<String>,
    ) -> StoreResult<WebhookOutcome> {
        let updated = match self
            .store
            .mark_orders_paid(&data.reference, wallet_paid, paystack_paid)
        {
            Ok(updated) => updated,
            Err(StoreError::DuplicateReference(reference)) => {
                info!(%reference, "orders already paid, duplicate delivery");
                return Ok(WebhookOutcome::Duplicate);
            }
            Err(StoreError::NotFound(_)) => {
                error!(
                    reference = %data.reference,
                    "payment confirmed but no orders exist for reference, dropping"
                );
                return Ok(WebhookOutcome::Ignored);
            }
            // PartialCartState propagates: escalated for reconciliation
            Err(e) => return Err(e),
        };

        let buyer = updated
            .first()
            .map(|o| o.buyer_user_id.clone())
            .unwrap_or_default();
        self.store.record_payment_log(&PaymentLog::new(
            data.reference.clone(),
            buyer,
            payment_type,
            PaymentMethod::Card,
            data.amount,
            order_id,
        ))?;

        info!(
            reference = %data.reference,
            orders = updated.len(),
            wallet_paid,
            paystack_paid,
            "orders settled"
        );
        self.notifier.notify(Notification::OrdersPaid {
            reference: data.reference.clone(),
            order_count: updated.len(),
        });
        Ok(WebhookOutcome::Processed)
    }

    /// Settle the card leg of a hybrid payment: confirm the wallet hold,
    /// then transition the orders with both paid amounts stamped.
    fn settle_hybrid(
        &self,
        data: &EventData,
        payment_type: PaymentType,
        order_id: Option<String>,
    ) -> StoreResult<WebhookOutcome> {
        let hold = match self.store.settle_pending(&data.reference) {
            Ok(entry) => entry,
            Err(StoreError::DuplicateReference(reference)) => {
                // The hold settled on an earlier delivery that may have
                // failed before the orders transitioned. Re-attempt the
                // materialization so the retry converges; if the orders are
                // already paid it reports Duplicate below.
                info!(%reference, "hybrid hold already settled, re-checking orders");
                match self.store.entry(&data.reference)? {
                    Some(entry) => entry,
                    None => return Ok(WebhookOutcome::Duplicate),
                }
            }
            Err(StoreError::NotFound(_)) => {
                error!(
                    reference = %data.reference,
                    "hybrid charge confirmed but no wallet hold exists, dropping"
                );
                return Ok(WebhookOutcome::Ignored);
            }
            Err(StoreError::InvalidTransition { reference, from }) => {
                warn!(%reference, ?from, "hybrid charge arrived after compensation, dropping");
                return Ok(WebhookOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        self.settle_orders(data, hold.amount, data.amount, payment_type, order_id)
    }

    /// Finalize a swap settlement payment.
    fn finalize_swap(&self, data: &EventData, swap_id: &str) -> StoreResult<WebhookOutcome> {
        if !self.swap_matches_reference(swap_id, &data.reference)? {
            return Ok(WebhookOutcome::Ignored);
        }

        let swap = match self.store.mark_swap_paid(swap_id) {
            Ok(swap) => swap,
            Err(StoreError::DuplicateReference(reference)) => {
                info!(%reference, "swap already finalized, duplicate delivery");
                return Ok(WebhookOutcome::Duplicate);
            }
            Err(StoreError::NotFound(_)) => {
                warn!(swap_id, reference = %data.reference, "swap payment for unknown swap, dropping");
                return Ok(WebhookOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        self.store.record_payment_log(&PaymentLog::new(
            data.reference.clone(),
            swap.payer_user_id.clone(),
            PaymentType::SwapPayment,
            PaymentMethod::Card,
            data.amount,
            None,
        ))?;

        info!(swap_id, reference = %data.reference, "swap finalized");
        self.notifier.notify(Notification::SwapFinalized {
            swap_id: swap.swap_id,
            reference: data.reference.clone(),
        });
        Ok(WebhookOutcome::Processed)
    }

    /// Run the compensation engine for a failed charge or transfer.
    fn run_compensation(&self, reference: &str, narration: &str) -> StoreResult<WebhookOutcome> {
        match compensate(&self.store, reference, narration)? {
            CompensationOutcome::Refunded(refund) => {
                self.notifier.notify(Notification::WalletRefunded {
                    user_id: refund.user_id.clone(),
                    amount: refund.amount,
                    reference: refund.reference,
                });
                Ok(WebhookOutcome::Processed)
            }
            CompensationOutcome::AlreadyCompensated => Ok(WebhookOutcome::Duplicate),
            CompensationOutcome::AlreadySettled | CompensationOutcome::NothingHeld => {
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Confirm a pending withdrawal after the outbound transfer settled.
    fn settle_withdrawal(&self, reference: &str) -> StoreResult<WebhookOutcome> {
        let entry = match self.store.settle_pending(reference) {
            Ok(entry) => entry,
            Err(StoreError::DuplicateReference(reference)) => {
                info!(%reference, "withdrawal already settled, duplicate delivery");
                return Ok(WebhookOutcome::Duplicate);
            }
            Err(StoreError::NotFound(_)) => {
                warn!(reference, "transfer settled for unknown withdrawal, dropping");
                return Ok(WebhookOutcome::Ignored);
            }
            Err(StoreError::InvalidTransition { reference, from }) => {
                warn!(%reference, ?from, "transfer settled after compensation, dropping");
                return Ok(WebhookOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        info!(reference, amount = entry.amount, "withdrawal settled");
        self.notifier.notify(Notification::WithdrawalSettled {
            user_id: entry.user_id,
            amount: entry.amount,
            reference: entry.reference,
        });
        Ok(WebhookOutcome::Processed)
    }

    /// Resolve the event's customer email to a local user.
    fn resolve_user(&self, data: &EventData) -> StoreResult<Option<String>> {
        let Some(email) = data.customer.email.as_deref() else {
            warn!(reference = %data.reference, "event carries no customer email, dropping");
            return Ok(None);
        };
        match self.store.user_by_email(email)? {
            Some(user_id) => Ok(Some(user_id)),
            None => {
                warn!(reference = %data.reference, email, "no user for customer email, dropping");
                Ok(None)
            }
        }
    }

    /// Defensive correlation check: the metadata's order id must name an
    /// order created under the event's reference.
    fn order_matches_reference(&self, order_id: &str, reference: &str) -> StoreResult<bool> {
        match self.store.order(order_id)? {
            Some(order) if order.reference == reference => Ok(true),
            Some(order) => {
                error!(
                    order_id,
                    event_reference = reference,
                    order_reference = %order.reference,
                    "order reference mismatch, dropping"
                );
                Ok(false)
            }
            None => {
                warn!(order_id, reference, "payment for unknown order, dropping");
                Ok(false)
            }
        }
    }

    /// Defensive correlation check: the metadata's swap id must name a swap
    /// created under the event's reference. Checked before finalization so
    /// a mis-correlated charge cannot consume the swap's settlement slot.
    fn swap_matches_reference(&self, swap_id: &str, reference: &str) -> StoreResult<bool> {
        match self.store.swap(swap_id)? {
            Some(swap) if swap.reference == reference => Ok(true),
            Some(swap) => {
                error!(
                    swap_id,
                    event_reference = reference,
                    swap_reference = %swap.reference,
                    "swap reference mismatch, dropping"
                );
                Ok(false)
            }
            None => {
                warn!(swap_id, reference, "payment for unknown swap, dropping");
                Ok(false)
            }
        }
    }
}
