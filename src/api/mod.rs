// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        ActivateNodeRequest, AdjustBalanceRequest, BalanceResponse, CreateAccountRequest,
        CreateDepositRequest, CreateWithdrawalRequest, ReferralSummary,
    },
    state::AppState,
    storage::{
        Account, Deposit, LedgerStats, Node, NodeActivity, NodeStatus, ReferralBonus,
        RequestStatus, Withdrawal,
    },
};

pub mod accounts;
pub mod admin;
pub mod deposits;
pub mod health;
pub mod nodes;
pub mod referrals;
pub mod withdrawals;

/// Header carrying an optional client idempotency key on create operations.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Extract a non-empty idempotency key from the request headers.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/accounts", post(accounts::create_account))
        .route("/account", get(accounts::get_account))
        .route(
            "/deposits",
            get(deposits::list_deposits).post(deposits::create_deposit),
        )
        .route(
            "/withdrawals",
            get(withdrawals::list_withdrawals).post(withdrawals::create_withdrawal),
        )
        .route("/nodes", get(nodes::list_nodes).post(nodes::activate_node))
        .route("/nodes/{node_id}/activity", get(nodes::node_activity))
        .route("/referrals", get(referrals::list_referrals))
        .route("/referrals/bonuses", get(referrals::list_bonuses))
        .route("/admin/deposits", get(admin::list_deposits))
        .route(
            "/admin/deposits/{deposit_id}/approve",
            post(admin::approve_deposit),
        )
        .route(
            "/admin/deposits/{deposit_id}/decline",
            post(admin::decline_deposit),
        )
        .route("/admin/withdrawals", get(admin::list_withdrawals))
        .route(
            "/admin/withdrawals/{withdrawal_id}/approve",
            post(admin::approve_withdrawal),
        )
        .route(
            "/admin/withdrawals/{withdrawal_id}/decline",
            post(admin::decline_withdrawal),
        )
        .route("/admin/accounts", get(admin::list_accounts))
        .route(
            "/admin/accounts/{account_id}/adjust",
            post(admin::adjust_balance),
        )
        .route("/admin/stats", get(admin::stats))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::create_account,
        accounts::get_account,
        deposits::create_deposit,
        deposits::list_deposits,
        withdrawals::create_withdrawal,
        withdrawals::list_withdrawals,
        nodes::activate_node,
        nodes::list_nodes,
        nodes::node_activity,
        referrals::list_referrals,
        referrals::list_bonuses,
        admin::list_deposits,
        admin::approve_deposit,
        admin::decline_deposit,
        admin::list_withdrawals,
        admin::approve_withdrawal,
        admin::decline_withdrawal,
        admin::list_accounts,
        admin::adjust_balance,
        admin::stats,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Account,
            Deposit,
            Withdrawal,
            Node,
            NodeActivity,
            ReferralBonus,
            RequestStatus,
            NodeStatus,
            LedgerStats,
            CreateAccountRequest,
            CreateDepositRequest,
            CreateWithdrawalRequest,
            ActivateNodeRequest,
            AdjustBalanceRequest,
            BalanceResponse,
            ReferralSummary,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Accounts", description = "Account provisioning and self view"),
        (name = "Deposits", description = "Deposit claims and history"),
        (name = "Withdrawals", description = "Withdrawal requests and history"),
        (name = "Nodes", description = "Node activation and activity"),
        (name = "Referrals", description = "Downline and bonus history"),
        (name = "Admin", description = "Approval queues and platform management"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerDb;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        (AppState::new(ledger), dir)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn idempotency_key_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, "  ".parse().unwrap());
        assert_eq!(idempotency_key(&headers), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, "k-123".parse().unwrap());
        assert_eq!(idempotency_key(&headers), Some("k-123"));
    }
}
