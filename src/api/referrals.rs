// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral surfaces: the caller's direct downline and bonus history.

use axum::{extract::State, Json};

use crate::{
    auth::Identity,
    error::ApiError,
    models::ReferralSummary,
    state::AppState,
    storage::ReferralBonus,
};

/// Accounts the caller directly referred.
#[utoipa::path(
    get,
    path = "/v1/referrals",
    tag = "Referrals",
    responses(
        (status = 200, description = "Direct downline", body = [ReferralSummary]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_referrals(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferralSummary>>, ApiError> {
    let referrals = state.ledger.list_referrals(&caller.account_id)?;
    Ok(Json(referrals.into_iter().map(Into::into).collect()))
}

/// The caller's referral bonus history, newest first.
#[utoipa::path(
    get,
    path = "/v1/referrals/bonuses",
    tag = "Referrals",
    responses(
        (status = 200, description = "Bonus history", body = [ReferralBonus]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_bonuses(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferralBonus>>, ApiError> {
    let bonuses = state.ledger.list_bonuses(&caller.account_id)?;
    Ok(Json(bonuses))
}
