// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Read-only ledger endpoints consumed by the marketplace UI layer.
//!
//! No mutation capability is exposed here; every balance change flows
//! through the webhook processor and the initiation operations.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::storage::{LedgerEntry, StoreError};
use crate::state::AppState;

/// Wallet balance response.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    /// Wallet owner.
    pub user_id: String,
    /// Balance in minor currency units (kobo).
    pub balance: u64,
}

/// Ledger history response, newest entries first.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerHistoryResponse {
    /// Wallet owner.
    pub user_id: String,
    /// Number of entries returned.
    pub total: usize,
    /// Entries, newest first.
    pub transactions: Vec<LedgerEntry>,
}

/// Get a user's wallet balance.
#[utoipa::path(
    get,
    path = "/v1/ledger/{user_id}/balance",
    tag = "Ledger",
    params(
        ("user_id" = String, Path, description = "Wallet owner")
    ),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 404, description = "No wallet for user")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.store().balance(&user_id).map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::not_found("Wallet not found"),
        other => ApiError::internal(format!("Failed to read balance: {other}")),
    })?;

    Ok(Json(BalanceResponse { user_id, balance }))
}

/// List a user's ledger entries, newest first.
#[utoipa::path(
    get,
    path = "/v1/ledger/{user_id}/transactions",
    tag = "Ledger",
    params(
        ("user_id" = String, Path, description = "Wallet owner")
    ),
    responses(
        (status = 200, description = "Ledger history", body = LedgerHistoryResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LedgerHistoryResponse>, ApiError> {
    let transactions = state
        .store()
        .entries_for_user(&user_id)
        .map_err(|e| ApiError::internal(format!("Failed to list ledger entries: {e}")))?;

    Ok(Json(LedgerHistoryResponse {
        user_id,
        total: transactions.len(),
        transactions,
    }))
}
