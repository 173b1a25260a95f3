// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Notification side effects emitted after successful ledger mutations.
//!
//! Notifications are strictly fire-and-forget: implementations must never
//! block the webhook request on a slow delivery channel (spawn internally
//! if delivery does I/O) and must never surface an error to the caller.
//! A failed email is a log line, not a failed webhook: the ledger is
//! already committed by the time a notification is emitted.

use serde::Serialize;

/// Events worth telling the user (or an in-app inbox) about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    WalletCredited {
        user_id: String,
        amount: u64,
        reference: String,
    },
    WalletRefunded {
        user_id: String,
        amount: u64,
        reference: String,
    },
    WithdrawalSettled {
        user_id: String,
        amount: u64,
        reference: String,
    },
    OrdersPaid {
        reference: String,
        order_count: usize,
    },
    SwapFinalized {
        swap_id: String,
        reference: String,
    },
    ProUpgradeActivated {
        user_id: String,
        reference: String,
    },
}

/// External notification collaborator (email, in-app inbox).
pub trait Notifier: Send + Sync {
    /// Emit a notification. Must not block and must not fail.
    fn notify(&self, notification: Notification);
}

/// Default notifier that records deliveries as structured log lines.
///
/// Stands in for the email/in-app providers, which live outside this
/// engine; swapping in a real transport is a matter of implementing
/// [`Notifier`] and spawning the delivery internally.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(payload) => tracing::info!(notification = %payload, "notification emitted"),
            Err(error) => tracing::warn!(%error, "failed to serialize notification"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    #[test]
    fn recording_notifier_captures_events() {
        let notifier = RecordingNotifier::default();
        notifier.notify(Notification::WalletCredited {
            user_id: "user-1".to_string(),
            amount: 500,
            reference: "SWM-1".to_string(),
        });

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Notification::WalletCredited { amount: 500, .. }));
    }

    #[test]
    fn notification_serializes_with_kind_tag() {
        let n = Notification::OrdersPaid {
            reference: "SWM-CART-1".to_string(),
            order_count: 3,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "orders_paid");
        assert_eq!(json["order_count"], 3);
    }
}
