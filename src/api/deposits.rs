// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deposit claims: submission and history.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::{
    auth::Identity,
    error::ApiError,
    models::CreateDepositRequest,
    state::AppState,
    storage::Deposit,
};

use super::idempotency_key;

/// Submit a deposit claim.
///
/// Records the claimed transaction hash as pending; the balance is only
/// credited when an administrator approves the claim. Supports the
/// `Idempotency-Key` header: a replay returns the original claim.
#[utoipa::path(
    post,
    path = "/v1/deposits",
    tag = "Deposits",
    request_body = CreateDepositRequest,
    responses(
        (status = 201, description = "Deposit claim recorded", body = Deposit),
        (status = 400, description = "Invalid input or duplicate tx hash"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_deposit(
    Identity(caller): Identity,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDepositRequest>,
) -> Result<(StatusCode, Json<Deposit>), ApiError> {
    let deposit = state.ledger.create_deposit(
        &caller.account_id,
        request.amount,
        &request.currency,
        &request.chain,
        &request.tx_hash,
        idempotency_key(&headers),
    )?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

/// The caller's deposit history, newest first.
#[utoipa::path(
    get,
    path = "/v1/deposits",
    tag = "Deposits",
    responses(
        (status = 200, description = "Deposit history", body = [Deposit]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_deposits(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<Deposit>>, ApiError> {
    let deposits = state.ledger.list_deposits(&caller.account_id)?;
    Ok(Json(deposits))
}
