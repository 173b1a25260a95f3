// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Webhook signature verification.
//!
//! The provider signs every webhook body with HMAC-SHA512 keyed on the
//! shared secret and sends the lowercase-hex digest in the `X-Signature`
//! header. Verification must run over the raw request bytes captured
//! before JSON parsing; re-serializing a parsed body does not reproduce
//! the byte stream the signature was computed over.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Name of the header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Check a webhook signature header against the raw body.
///
/// Returns `false` for a missing digest match, malformed hex, or a header
/// of the wrong length. The comparison goes through [`Mac::verify_slice`],
/// which is constant-time.
pub fn verify_signature(secret: &[u8], raw_body: &[u8], signature_header: &str) -> bool {
    let Ok(expected) = hex::decode(signature_header.trim()) else {
        return false;
    };

    let mut mac = match HmacSha512::new_from_slice(secret) {
        Ok(mac) => mac,
        // Hmac accepts any key length; unreachable in practice
        Err(_) => return false,
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the hex signature for a body. Used by tests and by outbound
/// tooling that replays stored events against a local instance.
pub fn sign_body(secret: &[u8], raw_body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}
