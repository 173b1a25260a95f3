// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

use std::sync::Arc;

use crate::notify::Notifier;
use crate::payments::PaymentProcessor;
use crate::storage::LedgerStore;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<LedgerStore>,
    processor: Arc<PaymentProcessor>,
    webhook_secret: Arc<Vec<u8>>,
}

impl AppState {
    pub fn new(
        store: Arc<LedgerStore>,
        notifier: Arc<dyn Notifier>,
        webhook_secret: Vec<u8>,
    ) -> Self {
        let processor = Arc::new(PaymentProcessor::new(store.clone(), notifier));
        Self {
            store,
            processor,
            webhook_secret: Arc::new(webhook_secret),
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn processor(&self) -> &PaymentProcessor {
        &self.processor
    }

    /// Shared secret the provider signs webhook bodies with.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.webhook_secret
    }
}
