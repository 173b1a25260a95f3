// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Provider webhook event envelope.
//!
//! The provider delivers events as a JSON envelope
//! `{event, data: {reference, amount, customer, status, metadata, ...}}`.
//! Amounts arrive already in minor currency units (kobo). Unknown envelope
//! fields are ignored; unknown event types map to `None` and are logged
//! and dropped by the handler rather than treated as an error.

use serde::Deserialize;

/// Closed set of provider event types the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Card charge confirmed
    ChargeSuccess,
    /// Card charge declined or abandoned
    ChargeFailed,
    /// Incoming bank transfer to a user's dedicated virtual account
    VirtualAccountCredit,
    /// Outbound transfer (withdrawal) settled
    TransferSuccess,
    /// Outbound transfer failed or was reversed by the receiving bank
    TransferFailed,
}

impl EventKind {
    /// Parse the provider's `event` string. Returns `None` for types the
    /// engine does not process (subscription events, disputes, ...).
    pub fn parse(event: &str) -> Option<Self> {
        match event {
            "charge.success" => Some(Self::ChargeSuccess),
            "charge.failed" => Some(Self::ChargeFailed),
            "dedicatedaccount.credit" => Some(Self::VirtualAccountCredit),
            "transfer.success" => Some(Self::TransferSuccess),
            "transfer.failed" | "transfer.reversed" => Some(Self::TransferFailed),
            _ => None,
        }
    }
}

/// Customer identity attached to an event.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Customer {
    /// Email the provider holds for the paying customer; resolved to a
    /// local user through the identity map.
    #[serde(default)]
    pub email: Option<String>,
}

/// Structured correlation metadata set at payment-initiation time.
///
/// Entity ids travel here explicitly instead of being parsed back out of
/// the reference string, so a renamed reference format cannot silently
/// break materialization.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventMetadata {
    /// Business purpose tag selecting the payment intent
    #[serde(default)]
    pub purpose: Option<String>,
    /// Order / swap / cart identifier for intents that settle one
    #[serde(default)]
    pub entity_id: Option<String>,
}

/// The `data` object of a webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Provider-supplied idempotency key for this payment
    pub reference: String,
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: u64,
    /// Paying customer identity
    #[serde(default)]
    pub customer: Customer,
    /// Provider-side status string (informational)
    #[serde(default)]
    pub status: Option<String>,
    /// Correlation metadata set at initiation time
    #[serde(default)]
    pub metadata: EventMetadata,
    /// Provider's human-readable outcome (e.g. "Approved")
    #[serde(default)]
    pub gateway_response: Option<String>,
    /// When the provider settled the payment
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// Full webhook envelope as delivered by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Event type string, e.g. `charge.success`
    pub event: String,
    /// Event payload
    pub data: EventData,
}

impl WebhookEnvelope {
    /// Parse the envelope's event type, if the engine handles it.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event)
    }
}
