// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures used by the REST API. All types
//! derive `Serialize`/`Deserialize` and `ToSchema` for automatic JSON
//! handling and OpenAPI documentation.
//!
//! Ledger entities (accounts, deposits, withdrawals, nodes, bonuses) are
//! returned as-is from [`crate::storage`]; the types here cover inbound
//! payloads and the few read shapes that differ from a stored entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to provision a new account.
///
/// Sent by the registration collaborator once credentials are established.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Referral code of the upline account, if the user registered through
    /// a referral link. An unknown code is ignored.
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Request to record a deposit claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDepositRequest {
    /// Claimed amount. Must be positive.
    pub amount: Decimal,
    /// Currency ticker (e.g. "USDT").
    pub currency: String,
    /// Chain the funds were sent on (e.g. "TRC20").
    pub chain: String,
    /// Claimed on-chain transaction hash. Recorded verbatim, never verified.
    pub tx_hash: String,
}

/// Request to create a withdrawal.
///
/// The amount is reserved against the balance immediately; an
/// administrator later approves or declines the request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWithdrawalRequest {
    /// Requested amount. Must be positive and within the current balance.
    pub amount: Decimal,
    /// Currency ticker.
    pub currency: String,
    /// Destination chain.
    pub chain: String,
    /// Destination address.
    pub address: String,
}

/// Request to activate a node.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivateNodeRequest {
    /// Display label for the node.
    pub node_name: String,
    /// Capital to lock. Must be positive and within the current balance.
    pub amount: Decimal,
    /// Declared maturity goal. Advisory only.
    pub target_amount: Decimal,
}

/// Administrative signed balance adjustment.
///
/// Positive for a reward, negative for a penalty. The non-negative balance
/// invariant applies either way.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustBalanceRequest {
    pub amount: Decimal,
}

/// Balance after an adjustment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: Decimal,
}

/// One entry in a caller's direct downline.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReferralSummary {
    /// The referred account.
    pub account_id: String,
    /// Its current balance.
    pub balance: Decimal,
    /// When it registered.
    pub created_at: DateTime<Utc>,
}

impl From<crate::storage::Account> for ReferralSummary {
    fn from(account: crate::storage::Account) -> Self {
        Self {
            account_id: account.account_id,
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_account_request_defaults_to_no_code() {
        let req: CreateAccountRequest = serde_json::from_str("{}").unwrap();
        assert!(req.referral_code.is_none());
    }

    #[test]
    fn deposit_request_parses_decimal_amount() {
        let req: CreateDepositRequest = serde_json::from_str(
            r#"{"amount":"250.50","currency":"USDT","chain":"TRC20","tx_hash":"0xabc"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Decimal::new(25050, 2));
    }
}
