// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wallets`: user_id → balance (u64, minor currency units)
//! - `users_by_email`: provider customer email → user_id
//! - `ledger`: reference → serialized LedgerEntry
//! - `ledger_user_index`: composite key (user_id|!timestamp|reference) → reference
//! - `payment_logs`: reference → serialized PaymentLog
//! - `orders`: order_id → serialized Order
//! - `order_ref_index`: composite key (reference|order_id) → order_id
//! - `swaps`: swap_id → serialized Swap
//!
//! ## Correctness Model
//!
//! The `ledger` table key is the idempotency key: every balance mutation
//! checks for an existing entry and inserts the new one inside a single
//! write transaction, so two concurrent deliveries of the same reference
//! cannot both commit. The balance update rides in the same transaction,
//! which rules out read-modify-write lost updates without any application
//! level lock.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::ledger::{Channel, Direction, EntryStatus, LedgerEntry, PaymentLog};
use super::orders::{Order, OrderStatus, Swap, SwapStatus};

// =============================================================================
// Table Definitions
// =============================================================================

/// Wallet balances: user_id → balance in minor units.
const WALLETS: TableDefinition<&str, u64> = TableDefinition::new("wallets");

/// Customer identity map: email → user_id.
const USERS_BY_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("users_by_email");

/// Primary ledger: reference → serialized LedgerEntry (JSON bytes).
/// The key is the idempotency key; at most one entry per reference.
const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

/// Index: composite key → reference.
/// Key format: `user_id|!timestamp_be|reference` for newest-first range scans.
const LEDGER_USER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("ledger_user_index");

/// Payment intent log: reference → serialized PaymentLog (JSON bytes).
const PAYMENT_LOGS: TableDefinition<&str, &[u8]> = TableDefinition::new("payment_logs");

/// Orders: order_id → serialized Order (JSON bytes).
const ORDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Index: composite key (reference|order_id) → order_id, for cart lookups.
const ORDER_REF_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("order_ref_index");

/// Swaps: swap_id → serialized Swap (JSON bytes).
const SWAPS: TableDefinition<&str, &[u8]> = TableDefinition::new("swaps");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A ledger entry for this reference already exists. Webhook callers
    /// treat this as a duplicate delivery: success, no mutation.
    #[error("duplicate reference: {0}")]
    DuplicateReference(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: u64, requested: u64 },

    #[error("balance overflow for user {0}")]
    BalanceOverflow(String),

    #[error("invalid status transition for {reference}: already {from:?}")]
    InvalidTransition { reference: String, from: EntryStatus },

    /// Orders sharing one reference were found in mixed paid/pending state.
    /// This should be impossible under the atomic bulk transition and is
    /// escalated for manual reconciliation rather than silently patched.
    #[error("partial cart state for reference {0}")]
    PartialCartState(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a compensating refund attempt.
#[derive(Debug, Clone)]
pub enum RefundOutcome {
    /// The pending hold was refunded; contains the new refund entry.
    Refunded(LedgerEntry),
    /// The original entry already reached a terminal state, so either the
    /// payment settled or compensation already ran. Nothing to do.
    AlreadyFinal(EntryStatus),
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the ledger_user_index table.
///
/// Format: `user_id | inverted_timestamp_be_bytes | reference`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_user_index_key(user_id: &str, timestamp: i64, reference: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8 + 1 + reference.len());
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(reference.as_bytes());
    key
}

/// Build a composite key for the order_ref_index table.
fn make_order_index_key(reference: &str, order_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(reference.len() + 1 + order_id.len());
    key.extend_from_slice(reference.as_bytes());
    key.push(b'|');
    key.extend_from_slice(order_id.as_bytes());
    key
}

/// Build a prefix for range scanning all composite keys starting with `head`.
fn make_prefix(head: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(head.len() + 1);
    prefix.extend_from_slice(head.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a prefix range scan.
fn make_prefix_end(head: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(head.len() + 1 + 20);
    end.extend_from_slice(head.as_bytes());
    end.push(b'|');
    // Past any valid key with this prefix
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// LedgerStore
// =============================================================================

/// Embedded ACID store for wallets, the transaction ledger, payment logs
/// and the order/swap records the materializer finalizes.
///
/// This is the only component permitted to mutate a wallet balance; every
/// mutation is committed atomically with its ledger entry.
pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(LEDGER_USER_INDEX)?;
            let _ = write_txn.open_table(PAYMENT_LOGS)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(ORDER_REF_INDEX)?;
            let _ = write_txn.open_table(SWAPS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Users & Wallets
    // =========================================================================

    /// Register a user and create their wallet with balance 0.
    pub fn register_user(&self, user_id: &str, email: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut wallets = write_txn.open_table(WALLETS)?;
            if wallets.get(user_id)?.is_some() {
                return Err(StoreError::AlreadyExists(format!("User {user_id}")));
            }

            // An email silently re-pointed at a new user would redirect
            // future webhook credits; reject it like a duplicate user id.
            let mut emails = write_txn.open_table(USERS_BY_EMAIL)?;
            if emails.get(email)?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Email {email}")));
            }

            wallets.insert(user_id, 0)?;
            emails.insert(email, user_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Resolve a provider customer email to a user id.
    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS_BY_EMAIL)?;
        Ok(table.get(email)?.map(|v| v.value().to_string()))
    }

    /// Current wallet balance in minor units.
    pub fn balance(&self, user_id: &str) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(user_id)? {
            Some(v) => Ok(v.value()),
            None => Err(StoreError::NotFound(format!("Wallet for user {user_id}"))),
        }
    }

    // =========================================================================
    // Ledger Writer
    // =========================================================================

    /// Credit a wallet and append the confirmed ledger entry, atomically.
    ///
    /// Fails with [`StoreError::DuplicateReference`] if an entry for this
    /// reference already exists; the caller treats that as an at-least-once
    /// redelivery and performs no further work.
    pub fn credit(
        &self,
        user_id: &str,
        amount: u64,
        reference: &str,
        channel: Channel,
        narration: &str,
    ) -> StoreResult<LedgerEntry> {
        let entry = LedgerEntry::new_success(
            user_id.to_string(),
            reference.to_string(),
            amount,
            Direction::Fund,
            channel,
            narration.to_string(),
        );
        self.apply_entry(&entry)?;
        Ok(entry)
    }

    /// Debit a wallet and append the confirmed ledger entry, atomically.
    ///
    /// Never drives the balance negative: fails with
    /// [`StoreError::InsufficientFunds`] and no mutation if the wallet
    /// cannot cover the amount.
    pub fn debit(
        &self,
        user_id: &str,
        amount: u64,
        reference: &str,
        channel: Channel,
        narration: &str,
    ) -> StoreResult<LedgerEntry> {
        let entry = LedgerEntry::new_success(
            user_id.to_string(),
            reference.to_string(),
            amount,
            Direction::Withdrawal,
            channel,
            narration.to_string(),
        );
        self.apply_entry(&entry)?;
        Ok(entry)
    }

    /// Remove funds from a wallet as a pending hold awaiting external
    /// confirmation (hybrid card leg, outbound transfer).
    ///
    /// The hold is settled by [`settle_pending`](Self::settle_pending) or
    /// returned by [`refund_pending`](Self::refund_pending).
    pub fn debit_pending(
        &self,
        user_id: &str,
        amount: u64,
        reference: &str,
        channel: Channel,
        narration: &str,
    ) -> StoreResult<LedgerEntry> {
        let entry = LedgerEntry::new_pending(
            user_id.to_string(),
            reference.to_string(),
            amount,
            Direction::Withdrawal,
            channel,
            narration.to_string(),
        );
        self.apply_entry(&entry)?;
        Ok(entry)
    }

    /// Insert a ledger entry and apply its balance effect in one commit.
    ///
    /// Pending withdrawals remove balance immediately (the hold); pending
    /// funds would not touch the balance until settled, but no current path
    /// creates one.
    fn apply_entry(&self, entry: &LedgerEntry) -> StoreResult<()> {
        let json = serde_json::to_vec(entry)?;
        let timestamp = entry.created_at.timestamp();

        let write_txn = self.db.begin_write()?;
        {
            let mut ledger = write_txn.open_table(LEDGER)?;

            // Idempotency guard: the reference is the unique key. Check and
            // insert happen inside this one write transaction, so concurrent
            // duplicates cannot both commit.
            if ledger.get(entry.reference.as_str())?.is_some() {
                return Err(StoreError::DuplicateReference(entry.reference.clone()));
            }

            let mut wallets = write_txn.open_table(WALLETS)?;
            let current = match wallets.get(entry.user_id.as_str())? {
                Some(v) => v.value(),
                None => {
                    return Err(StoreError::NotFound(format!(
                        "Wallet for user {}",
                        entry.user_id
                    )))
                }
            };

            let apply_now = match (entry.direction, entry.status) {
                (Direction::Fund, EntryStatus::Success) => true,
                (Direction::Withdrawal, _) => true,
                _ => false,
            };

            if apply_now {
                let updated = match entry.direction {
                    Direction::Fund => current
                        .checked_add(entry.amount)
                        .ok_or_else(|| StoreError::BalanceOverflow(entry.user_id.clone()))?,
                    Direction::Withdrawal => {
                        current
                            .checked_sub(entry.amount)
                            .ok_or(StoreError::InsufficientFunds {
                                available: current,
                                requested: entry.amount,
                            })?
                    }
                };
                wallets.insert(entry.user_id.as_str(), updated)?;
            }

            ledger.insert(entry.reference.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(LEDGER_USER_INDEX)?;
            let key = make_user_index_key(&entry.user_id, timestamp, &entry.reference);
            index.insert(key.as_slice(), entry.reference.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Transition a pending entry to `Success` (trusted signal arrived).
    ///
    /// An entry already in `Success` is a duplicate delivery; an entry in
    /// `Failed` was compensated and must not be revived.
    pub fn settle_pending(&self, reference: &str) -> StoreResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut ledger = write_txn.open_table(LEDGER)?;

            let bytes = {
                let existing = ledger
                    .get(reference)?
                    .ok_or_else(|| StoreError::NotFound(format!("Ledger entry {reference}")))?;
                existing.value().to_vec()
            };

            let mut entry: LedgerEntry = serde_json::from_slice(&bytes)?;
            match entry.status {
                EntryStatus::Pending => {}
                EntryStatus::Success => {
                    return Err(StoreError::DuplicateReference(reference.to_string()))
                }
                EntryStatus::Failed => {
                    return Err(StoreError::InvalidTransition {
                        reference: reference.to_string(),
                        from: EntryStatus::Failed,
                    })
                }
            }

            entry.mark_success();
            let json = serde_json::to_vec(&entry)?;
            ledger.insert(reference, json.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Compensate a pending hold: credit the held amount back under a
    /// derived `REFUND-<reference>` entry and mark the original `Failed`,
    /// all in one commit.
    ///
    /// The derived reference flows through the same unique-key guard as any
    /// other entry, so a duplicate failure webhook cannot double-refund.
    /// Compensation is local only; it never contacts the provider.
    pub fn refund_pending(&self, reference: &str, narration: &str) -> StoreResult<RefundOutcome> {
        let refund_reference = format!("REFUND-{reference}");

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut ledger = write_txn.open_table(LEDGER)?;

            let bytes = {
                let existing = ledger
                    .get(reference)?
                    .ok_or_else(|| StoreError::NotFound(format!("Ledger entry {reference}")))?;
                existing.value().to_vec()
            };
            let mut original: LedgerEntry = serde_json::from_slice(&bytes)?;

            if original.is_terminal() {
                return Ok(RefundOutcome::AlreadyFinal(original.status));
            }
            if ledger.get(refund_reference.as_str())?.is_some() {
                return Err(StoreError::DuplicateReference(refund_reference));
            }

            let refund = LedgerEntry::new_success(
                original.user_id.clone(),
                refund_reference.clone(),
                original.amount,
                Direction::Fund,
                Channel::Refund,
                narration.to_string(),
            );

            let mut wallets = write_txn.open_table(WALLETS)?;
            let current = match wallets.get(refund.user_id.as_str())? {
                Some(v) => v.value(),
                None => {
                    return Err(StoreError::NotFound(format!(
                        "Wallet for user {}",
                        refund.user_id
                    )))
                }
            };
            let updated = current
                .checked_add(refund.amount)
                .ok_or_else(|| StoreError::BalanceOverflow(refund.user_id.clone()))?;
            wallets.insert(refund.user_id.as_str(), updated)?;

            let refund_json = serde_json::to_vec(&refund)?;
            ledger.insert(refund_reference.as_str(), refund_json.as_slice())?;

            original.mark_failed();
            let original_json = serde_json::to_vec(&original)?;
            ledger.insert(reference, original_json.as_slice())?;

            let mut index = write_txn.open_table(LEDGER_USER_INDEX)?;
            let key = make_user_index_key(
                &refund.user_id,
                refund.created_at.timestamp(),
                &refund_reference,
            );
            index.insert(key.as_slice(), refund_reference.as_str())?;

            RefundOutcome::Refunded(refund)
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Look up a ledger entry by reference.
    pub fn entry(&self, reference: &str) -> StoreResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER)?;
        match table.get(reference)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List a user's ledger entries, newest first.
    pub fn entries_for_user(&self, user_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LEDGER_USER_INDEX)?;
        let ledger = read_txn.open_table(LEDGER)?;

        let prefix = make_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        let mut entries = Vec::new();
        for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let item = item?;
            let reference = item.1.value().to_string();
            if let Some(value) = ledger.get(reference.as_str())? {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Payment Logs
    // =========================================================================

    /// Record a payment log if none exists for its reference yet.
    ///
    /// Returns `false` when the reference was already logged (duplicate
    /// delivery of an intent that mutates no wallet, e.g. a pro upgrade).
    pub fn record_payment_log(&self, log: &PaymentLog) -> StoreResult<bool> {
        let json = serde_json::to_vec(log)?;
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(PAYMENT_LOGS)?;
            if table.get(log.reference.as_str())?.is_some() {
                false
            } else {
                table.insert(log.reference.as_str(), json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    /// Look up a payment log by reference.
    pub fn payment_log(&self, reference: &str) -> StoreResult<Option<PaymentLog>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_LOGS)?;
        match table.get(reference)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Orders & Swaps (materializer storage)
    // =========================================================================

    /// Store a new pending order.
    pub fn create_order(&self, order: &Order) -> StoreResult<()> {
        let json = serde_json::to_vec(order)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut orders = write_txn.open_table(ORDERS)?;
            if orders.get(order.order_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Order {}",
                    order.order_id
                )));
            }
            orders.insert(order.order_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ORDER_REF_INDEX)?;
            let key = make_order_index_key(&order.reference, &order.order_id);
            index.insert(key.as_slice(), order.order_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an order by id.
    pub fn order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All orders created under one payment reference (a cart shares one).
    pub fn orders_by_reference(&self, reference: &str) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_REF_INDEX)?;
        let orders = read_txn.open_table(ORDERS)?;

        let prefix = make_prefix(reference);
        let prefix_end = make_prefix_end(reference);

        let mut found = Vec::new();
        for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let item = item?;
            let order_id = item.1.value().to_string();
            if let Some(value) = orders.get(order_id.as_str())? {
                let order: Order = serde_json::from_slice(value.value())?;
                found.push(order);
            }
        }
        Ok(found)
    }

    /// Transition every pending order under a reference to `Paid`, stamping
    /// the settled amounts, as one all-or-nothing commit.
    ///
    /// - No orders for the reference → [`StoreError::NotFound`]
    /// - All already paid → [`StoreError::DuplicateReference`] (redelivery)
    /// - Mixed paid/pending → [`StoreError::PartialCartState`], escalated
    ///   for manual reconciliation
    pub fn mark_orders_paid(
        &self,
        reference: &str,
        wallet_paid: u64,
        paystack_paid: u64,
    ) -> StoreResult<Vec<Order>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let index = write_txn.open_table(ORDER_REF_INDEX)?;
            let mut orders_table = write_txn.open_table(ORDERS)?;

            let prefix = make_prefix(reference);
            let prefix_end = make_prefix_end(reference);

            let mut orders = Vec::new();
            for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
                let item = item?;
                let order_id = item.1.value().to_string();
                let bytes = {
                    let value = orders_table.get(order_id.as_str())?.ok_or_else(|| {
                        StoreError::PartialCartState(reference.to_string())
                    })?;
                    value.value().to_vec()
                };
                let order: Order = serde_json::from_slice(&bytes)?;
                orders.push(order);
            }

            if orders.is_empty() {
                return Err(StoreError::NotFound(format!(
                    "Orders for reference {reference}"
                )));
            }

            let paid = orders
                .iter()
                .filter(|o| o.status == OrderStatus::Paid)
                .count();
            if paid == orders.len() {
                return Err(StoreError::DuplicateReference(reference.to_string()));
            }
            if paid > 0 {
                return Err(StoreError::PartialCartState(reference.to_string()));
            }

            for order in &mut orders {
                order.mark_paid(wallet_paid, paystack_paid);
                let json = serde_json::to_vec(order)?;
                orders_table.insert(order.order_id.as_str(), json.as_slice())?;
            }
            orders
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Store a new pending swap.
    pub fn create_swap(&self, swap: &Swap) -> StoreResult<()> {
        let json = serde_json::to_vec(swap)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SWAPS)?;
            if table.get(swap.swap_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Swap {}", swap.swap_id)));
            }
            table.insert(swap.swap_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a swap by id.
    pub fn swap(&self, swap_id: &str) -> StoreResult<Option<Swap>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SWAPS)?;
        match table.get(swap_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Finalize a swap's settlement payment.
    ///
    /// Already-paid swaps surface as [`StoreError::DuplicateReference`].
    pub fn mark_swap_paid(&self, swap_id: &str) -> StoreResult<Swap> {
        let write_txn = self.db.begin_write()?;
        let swap = {
            let mut table = write_txn.open_table(SWAPS)?;
            let bytes = {
                let value = table
                    .get(swap_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("Swap {swap_id}")))?;
                value.value().to_vec()
            };
            let mut swap: Swap = serde_json::from_slice(&bytes)?;
            if swap.status == SwapStatus::Paid {
                return Err(StoreError::DuplicateReference(swap.reference.clone()));
            }
            swap.status = SwapStatus::Paid;
            swap.paid_at = Some(chrono::Utc::now());
            let json = serde_json::to_vec(&swap)?;
            table.insert(swap_id, json.as_slice())?;
            swap
        };
        write_txn.commit()?;
        Ok(swap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, LedgerStore) {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::open(&temp.path().join("ledger.redb")).unwrap();
        store.register_user("user-1", "buyer@example.com").unwrap();
        (temp, store)
    }

    #[test]
    fn credit_updates_balance_and_appends_entry() {
        let (_temp, store) = test_store();

        let entry = store
            .credit("user-1", 200_000, "SWM-TOPUP-1", Channel::Card, "Wallet top-up")
            .unwrap();

        assert_eq!(store.balance("user-1").unwrap(), 200_000);
        assert_eq!(entry.status, EntryStatus::Success);
        assert!(entry.verified);

        let stored = store.entry("SWM-TOPUP-1").unwrap().unwrap();
        assert_eq!(stored.amount, 200_000);
        assert_eq!(stored.direction, Direction::Fund);
    }

    #[test]
    fn duplicate_reference_rejected_without_mutation() {
        let (_temp, store) = test_store();

        store
            .credit("user-1", 500_000, "SWM-VA-1", Channel::VirtualAccount, "Transfer credit")
            .unwrap();
        let result = store.credit(
            "user-1",
            500_000,
            "SWM-VA-1",
            Channel::VirtualAccount,
            "Transfer credit",
        );

        assert!(matches!(result, Err(StoreError::DuplicateReference(_))));
        // Exactly one credit applied
        assert_eq!(store.balance("user-1").unwrap(), 500_000);
    }

    #[test]
    fn debit_never_goes_negative() {
        let (_temp, store) = test_store();
        store
            .credit("user-1", 1_000, "SWM-TOPUP-2", Channel::Card, "top-up")
            .unwrap();

        let result = store.debit("user-1", 2_000, "SWM-WD-1", Channel::BankTransfer, "withdrawal");
        assert!(matches!(
            result,
            Err(StoreError::InsufficientFunds {
                available: 1_000,
                requested: 2_000
            })
        ));
        // No entry, no balance change
        assert_eq!(store.balance("user-1").unwrap(), 1_000);
        assert!(store.entry("SWM-WD-1").unwrap().is_none());
    }

    #[test]
    fn pending_debit_holds_funds_until_settled() {
        let (_temp, store) = test_store();
        store
            .credit("user-1", 10_000, "SWM-TOPUP-3", Channel::Card, "top-up")
            .unwrap();

        store
            .debit_pending("user-1", 4_000, "SWM-WD-2", Channel::BankTransfer, "withdrawal")
            .unwrap();
        assert_eq!(store.balance("user-1").unwrap(), 6_000);

        let settled = store.settle_pending("SWM-WD-2").unwrap();
        assert_eq!(settled.status, EntryStatus::Success);
        assert!(settled.verified);
        // Settling does not move the balance again
        assert_eq!(store.balance("user-1").unwrap(), 6_000);

        // Second settle is a duplicate
        assert!(matches!(
            store.settle_pending("SWM-WD-2"),
            Err(StoreError::DuplicateReference(_))
        ));
    }

    #[test]
    fn refund_pending_restores_balance_once() {
        let (_temp, store) = test_store();
        store
            .credit("user-1", 10_000, "SWM-TOPUP-4", Channel::Card, "top-up")
            .unwrap();
        store
            .debit_pending("user-1", 3_000, "SWM-HYB-1", Channel::System, "hybrid hold")
            .unwrap();
        assert_eq!(store.balance("user-1").unwrap(), 7_000);

        let outcome = store.refund_pending("SWM-HYB-1", "card leg failed").unwrap();
        match outcome {
            RefundOutcome::Refunded(refund) => {
                assert_eq!(refund.reference, "REFUND-SWM-HYB-1");
                assert_eq!(refund.channel, Channel::Refund);
                assert_eq!(refund.amount, 3_000);
            }
            other => panic!("expected refund, got {other:?}"),
        }
        assert_eq!(store.balance("user-1").unwrap(), 10_000);

        let original = store.entry("SWM-HYB-1").unwrap().unwrap();
        assert_eq!(original.status, EntryStatus::Failed);

        // Redelivered failure webhook: original is terminal, no second refund
        let outcome = store.refund_pending("SWM-HYB-1", "card leg failed").unwrap();
        assert!(matches!(
            outcome,
            RefundOutcome::AlreadyFinal(EntryStatus::Failed)
        ));
        assert_eq!(store.balance("user-1").unwrap(), 10_000);
    }

    #[test]
    fn settle_after_refund_is_rejected() {
        let (_temp, store) = test_store();
        store
            .credit("user-1", 5_000, "SWM-TOPUP-5", Channel::Card, "top-up")
            .unwrap();
        store
            .debit_pending("user-1", 5_000, "SWM-WD-3", Channel::BankTransfer, "withdrawal")
            .unwrap();
        store.refund_pending("SWM-WD-3", "transfer failed").unwrap();

        assert!(matches!(
            store.settle_pending("SWM-WD-3"),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn entries_for_user_newest_first() {
        let (_temp, store) = test_store();
        store
            .credit("user-1", 100, "SWM-A", Channel::Card, "first")
            .unwrap();
        store
            .credit("user-1", 200, "SWM-B", Channel::Card, "second")
            .unwrap();

        let entries = store.entries_for_user("user-1").unwrap();
        assert_eq!(entries.len(), 2);
        // Entries created within the same second keep stable ordering by key;
        // both must be present regardless
        let refs: Vec<&str> = entries.iter().map(|e| e.reference.as_str()).collect();
        assert!(refs.contains(&"SWM-A"));
        assert!(refs.contains(&"SWM-B"));
    }

    #[test]
    fn cart_orders_transition_together() {
        let (_temp, store) = test_store();
        for i in 1..=3 {
            store
                .create_order(&Order::new_pending(
                    format!("order-{i}"),
                    "SWM-CART-1".to_string(),
                    "user-1".to_string(),
                    1_000,
                ))
                .unwrap();
        }

        let updated = store.mark_orders_paid("SWM-CART-1", 0, 3_000).unwrap();
        assert_eq!(updated.len(), 3);
        for order in store.orders_by_reference("SWM-CART-1").unwrap() {
            assert_eq!(order.status, OrderStatus::Paid);
            assert_eq!(order.paystack_paid, 3_000);
            assert!(order.paid_at.is_some());
        }

        // Redelivery: all already paid
        assert!(matches!(
            store.mark_orders_paid("SWM-CART-1", 0, 3_000),
            Err(StoreError::DuplicateReference(_))
        ));
    }

    #[test]
    fn mark_orders_paid_requires_orders() {
        let (_temp, store) = test_store();
        assert!(matches!(
            store.mark_orders_paid("SWM-NOPE", 0, 100),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn swap_finalization_is_idempotent() {
        let (_temp, store) = test_store();
        store
            .create_swap(&Swap::new_pending(
                "swap-1".to_string(),
                "SWM-SWAP-1".to_string(),
                "user-1".to_string(),
                2_500,
            ))
            .unwrap();

        let swap = store.mark_swap_paid("swap-1").unwrap();
        assert_eq!(swap.status, SwapStatus::Paid);

        assert!(matches!(
            store.mark_swap_paid("swap-1"),
            Err(StoreError::DuplicateReference(_))
        ));
    }

    #[test]
    fn payment_log_insert_if_absent() {
        use crate::storage::ledger::{PaymentMethod, PaymentType};

        let (_temp, store) = test_store();
        let log = PaymentLog::new(
            "SWM-PRO-1".to_string(),
            "user-1".to_string(),
            PaymentType::ProUpgrade,
            PaymentMethod::Card,
            150_000,
            None,
        );

        assert!(store.record_payment_log(&log).unwrap());
        assert!(!store.record_payment_log(&log).unwrap());

        let stored = store.payment_log("SWM-PRO-1").unwrap().unwrap();
        assert_eq!(stored.payment_type, PaymentType::ProUpgrade);
    }

    #[test]
    fn duplicate_email_rejected() {
        let (_temp, store) = test_store();

        let result = store.register_user("user-2", "buyer@example.com");
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));

        // The original mapping still stands and user-2 got no wallet
        assert_eq!(
            store.user_by_email("buyer@example.com").unwrap().as_deref(),
            Some("user-1")
        );
        assert!(matches!(
            store.balance("user-2"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_wallet_rejected() {
        let (_temp, store) = test_store();
        let result = store.credit("ghost", 100, "SWM-GHOST-1", Channel::Card, "top-up");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
