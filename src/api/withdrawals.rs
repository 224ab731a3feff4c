// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal requests: submission and history.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::{
    auth::Identity,
    error::ApiError,
    models::CreateWithdrawalRequest,
    state::AppState,
    storage::Withdrawal,
};

use super::idempotency_key;

/// Request a withdrawal.
///
/// The amount is reserved against the balance in the same unit of work
/// that records the request, so concurrent requests cannot jointly
/// overdraw. Declining later refunds the reservation. Supports the
/// `Idempotency-Key` header.
#[utoipa::path(
    post,
    path = "/v1/withdrawals",
    tag = "Withdrawals",
    request_body = CreateWithdrawalRequest,
    responses(
        (status = 201, description = "Withdrawal requested", body = Withdrawal),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Insufficient funds")
    )
)]
pub async fn create_withdrawal(
    Identity(caller): Identity,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), ApiError> {
    let withdrawal = state.ledger.create_withdrawal(
        &caller.account_id,
        request.amount,
        &request.currency,
        &request.chain,
        &request.address,
        idempotency_key(&headers),
    )?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// The caller's withdrawal history, newest first.
#[utoipa::path(
    get,
    path = "/v1/withdrawals",
    tag = "Withdrawals",
    responses(
        (status = 200, description = "Withdrawal history", body = [Withdrawal]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_withdrawals(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    let withdrawals = state.ledger.list_withdrawals(&caller.account_id)?;
    Ok(Json(withdrawals))
}
