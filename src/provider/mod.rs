// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Payment provider collaboration: webhook envelope types and signature
//! verification. No payload is trusted until the signature check passes.

pub mod event;
pub mod signature;

pub use event::{Customer, EventData, EventKind, EventMetadata, WebhookEnvelope};
pub use signature::{sign_body, verify_signature, SIGNATURE_HEADER};
