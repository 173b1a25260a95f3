// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Compensation engine: return previously-held funds when a downstream
//! leg fails.
//!
//! Compensation is local only. It restores the internal ledger to the
//! state it would have had if the failed step had never started. It never
//! attempts to reverse anything at the provider. The refund entry carries
//! the derived reference `REFUND-<original>`, so it passes through the
//! same unique-key idempotency guard as any other mutation and duplicate
//! failure webhooks cannot double-refund.

use tracing::{error, info, warn};

use crate::storage::{EntryStatus, LedgerEntry, LedgerStore, RefundOutcome, StoreResult};

/// Result of running compensation for a reference.
#[derive(Debug, Clone)]
pub enum CompensationOutcome {
    /// Funds were returned; contains the refund ledger entry.
    Refunded(LedgerEntry),
    /// Compensation already ran for this reference (duplicate delivery).
    AlreadyCompensated,
    /// The original payment settled before the failure signal arrived;
    /// nothing to unwind locally.
    AlreadySettled,
    /// No ledger entry exists for the reference; nothing was ever held.
    NothingHeld,
}

/// Compensate the pending hold recorded under `reference`, if any.
///
/// A storage failure here is the one error class that must be surfaced
/// aggressively: funds have left the balance and the refund could not be
/// written, so the ledger is in an inconsistent state until the provider
/// redelivers the failure event or an operator reconciles it by hand.
pub fn compensate(
    store: &LedgerStore,
    reference: &str,
    narration: &str,
) -> StoreResult<CompensationOutcome> {
    match store.entry(reference)? {
        Some(_) => {}
        None => {
            info!(reference, "failure event for unknown reference, nothing held");
            return Ok(CompensationOutcome::NothingHeld);
        }
    }

    match store.refund_pending(reference, narration) {
        Ok(RefundOutcome::Refunded(refund)) => {
            info!(
                reference,
                refund_reference = %refund.reference,
                amount = refund.amount,
                "compensated failed payment leg"
            );
            Ok(CompensationOutcome::Refunded(refund))
        }
        Ok(RefundOutcome::AlreadyFinal(EntryStatus::Failed)) => {
            info!(reference, "compensation already applied");
            Ok(CompensationOutcome::AlreadyCompensated)
        }
        Ok(RefundOutcome::AlreadyFinal(status)) => {
            warn!(
                reference,
                ?status,
                "failure event for a settled payment, ignoring"
            );
            Ok(CompensationOutcome::AlreadySettled)
        }
        Err(e) => {
            error!(
                reference,
                error = %e,
                integrity = true,
                "compensation failed, funds held without refund"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Channel;
    use tempfile::TempDir;

    fn store_with_hold(amount: u64, reference: &str) -> (TempDir, LedgerStore) {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::open(&temp.path().join("ledger.redb")).unwrap();
        store.register_user("user-1", "buyer@example.com").unwrap();
        store
            .credit("user-1", 10_000, "SWM-SEED", Channel::Card, "seed")
            .unwrap();
        store
            .debit_pending("user-1", amount, reference, Channel::System, "hybrid hold")
            .unwrap();
        (temp, store)
    }

    #[test]
    fn refunds_pending_hold() {
        let (_temp, store) = store_with_hold(4_000, "SWM-HYB-9");
        assert_eq!(store.balance("user-1").unwrap(), 6_000);

        let outcome = compensate(&store, "SWM-HYB-9", "card leg failed").unwrap();
        assert!(matches!(outcome, CompensationOutcome::Refunded(_)));
        assert_eq!(store.balance("user-1").unwrap(), 10_000);
    }

    #[test]
    fn duplicate_failure_is_noop() {
        let (_temp, store) = store_with_hold(4_000, "SWM-HYB-9");
        compensate(&store, "SWM-HYB-9", "card leg failed").unwrap();

        let outcome = compensate(&store, "SWM-HYB-9", "card leg failed").unwrap();
        assert!(matches!(outcome, CompensationOutcome::AlreadyCompensated));
        assert_eq!(store.balance("user-1").unwrap(), 10_000);
    }

    #[test]
    fn settled_payment_is_left_alone() {
        let (_temp, store) = store_with_hold(4_000, "SWM-HYB-9");
        store.settle_pending("SWM-HYB-9").unwrap();

        let outcome = compensate(&store, "SWM-HYB-9", "late failure").unwrap();
        assert!(matches!(outcome, CompensationOutcome::AlreadySettled));
        assert_eq!(store.balance("user-1").unwrap(), 6_000);
    }

    #[test]
    fn unknown_reference_held_nothing() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::open(&temp.path().join("ledger.redb")).unwrap();

        let outcome = compensate(&store, "SWM-UNKNOWN", "failure").unwrap();
        assert!(matches!(outcome, CompensationOutcome::NothingHeld));
    }
}
