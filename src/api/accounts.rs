// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account provisioning and the caller's own account view.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Identity,
    error::ApiError,
    models::CreateAccountRequest,
    state::AppState,
    storage::Account,
};

/// Provision a new account.
///
/// Called by the registration collaborator after credentials are
/// established. The optional referral code links the new account under an
/// upline; an unknown code leaves it unparented.
#[utoipa::path(
    post,
    path = "/v1/accounts",
    tag = "Accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account provisioned", body = Account),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state
        .ledger
        .create_account(request.referral_code.as_deref())?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// The caller's own account: balance, referral code and upline.
#[utoipa::path(
    get,
    path = "/v1/account",
    tag = "Accounts",
    responses(
        (status = 200, description = "Caller's account", body = Account),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Account>, ApiError> {
    let account = state.ledger.get_account(&caller.account_id)?;
    Ok(Json(account))
}
