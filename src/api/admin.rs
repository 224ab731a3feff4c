// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints: approval queues, account overview, signed
//! balance adjustments and platform statistics.
//!
//! The privileged-caller check happens in the [`AdminOnly`] extractor; the
//! gateway has already authenticated the session and asserted the role.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{AdjustBalanceRequest, BalanceResponse},
    state::AppState,
    storage::{Account, Deposit, LedgerStats, Withdrawal},
};

// ============================================================================
// Deposit approval queue
// ============================================================================

/// Every deposit claim on the platform, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/deposits",
    tag = "Admin",
    responses(
        (status = 200, description = "All deposits", body = [Deposit]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_deposits(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<Deposit>>, ApiError> {
    let deposits = state.ledger.list_all_deposits()?;
    Ok(Json(deposits))
}

/// Approve a pending deposit, crediting the owning account.
#[utoipa::path(
    post,
    path = "/v1/admin/deposits/{deposit_id}/approve",
    tag = "Admin",
    params(
        ("deposit_id" = String, Path, description = "Deposit ID")
    ),
    responses(
        (status = 200, description = "Deposit approved", body = Deposit),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Deposit not found"),
        (status = 422, description = "Deposit is not pending")
    )
)]
pub async fn approve_deposit(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
) -> Result<Json<Deposit>, ApiError> {
    let deposit = state.ledger.approve_deposit(&deposit_id)?;
    Ok(Json(deposit))
}

/// Decline a pending deposit. Never credits.
#[utoipa::path(
    post,
    path = "/v1/admin/deposits/{deposit_id}/decline",
    tag = "Admin",
    params(
        ("deposit_id" = String, Path, description = "Deposit ID")
    ),
    responses(
        (status = 200, description = "Deposit declined", body = Deposit),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Deposit not found"),
        (status = 422, description = "Deposit is not pending")
    )
)]
pub async fn decline_deposit(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Path(deposit_id): Path<String>,
) -> Result<Json<Deposit>, ApiError> {
    let deposit = state.ledger.decline_deposit(&deposit_id)?;
    Ok(Json(deposit))
}

// ============================================================================
// Withdrawal approval queue
// ============================================================================

/// Every withdrawal request on the platform, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/withdrawals",
    tag = "Admin",
    responses(
        (status = 200, description = "All withdrawals", body = [Withdrawal]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_withdrawals(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    let withdrawals = state.ledger.list_all_withdrawals()?;
    Ok(Json(withdrawals))
}

/// Approve a pending withdrawal. The funds were already reserved at
/// request time, so this only finalizes the status.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{withdrawal_id}/approve",
    tag = "Admin",
    params(
        ("withdrawal_id" = String, Path, description = "Withdrawal ID")
    ),
    responses(
        (status = 200, description = "Withdrawal approved", body = Withdrawal),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Withdrawal not found"),
        (status = 422, description = "Withdrawal is not pending")
    )
)]
pub async fn approve_withdrawal(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Path(withdrawal_id): Path<String>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state.ledger.approve_withdrawal(&withdrawal_id)?;
    Ok(Json(withdrawal))
}

/// Decline a pending withdrawal and refund the reservation.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{withdrawal_id}/decline",
    tag = "Admin",
    params(
        ("withdrawal_id" = String, Path, description = "Withdrawal ID")
    ),
    responses(
        (status = 200, description = "Withdrawal declined and refunded", body = Withdrawal),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Withdrawal not found"),
        (status = 422, description = "Withdrawal is not pending")
    )
)]
pub async fn decline_withdrawal(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Path(withdrawal_id): Path<String>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state.ledger.decline_withdrawal(&withdrawal_id)?;
    Ok(Json(withdrawal))
}

// ============================================================================
// Accounts
// ============================================================================

/// Every account on the platform, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/accounts",
    tag = "Admin",
    responses(
        (status = 200, description = "All accounts", body = [Account]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_accounts(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let accounts = state.ledger.list_accounts()?;
    Ok(Json(accounts))
}

/// Apply a signed balance adjustment: positive for a reward, negative for
/// a penalty. The non-negative balance invariant applies either way.
#[utoipa::path(
    post,
    path = "/v1/admin/accounts/{account_id}/adjust",
    tag = "Admin",
    params(
        ("account_id" = String, Path, description = "Account ID")
    ),
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "Balance adjusted", body = BalanceResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Account not found"),
        (status = 422, description = "Adjustment would overdraw the account")
    )
)]
pub async fn adjust_balance(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<AdjustBalanceRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.adjust_balance(&account_id, request.amount)?;
    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

// ============================================================================
// Statistics
// ============================================================================

/// Aggregate platform totals.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Platform statistics", body = LedgerStats),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn stats(
    AdminOnly(_caller): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<LedgerStats>, ApiError> {
    let stats = state.ledger.stats()?;
    Ok(Json(stats))
}
