// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Node activation, listing and the per-node activity log.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};

use crate::{
    auth::Identity,
    error::ApiError,
    models::ActivateNodeRequest,
    state::AppState,
    storage::{Node, NodeActivity},
};

use super::idempotency_key;

/// Activate a node.
///
/// Locks the requested capital, appends the activation log entry and
/// settles the three-tier referral cascade, all in one atomic unit of
/// work. Supports the `Idempotency-Key` header: a replay returns the
/// originally created node without a second debit or cascade.
#[utoipa::path(
    post,
    path = "/v1/nodes",
    tag = "Nodes",
    request_body = ActivateNodeRequest,
    responses(
        (status = 201, description = "Node activated", body = Node),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Insufficient funds")
    )
)]
pub async fn activate_node(
    Identity(caller): Identity,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ActivateNodeRequest>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let node = state.ledger.activate_node(
        &caller.account_id,
        &request.node_name,
        request.amount,
        request.target_amount,
        idempotency_key(&headers),
    )?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// The caller's active nodes, newest first.
#[utoipa::path(
    get,
    path = "/v1/nodes",
    tag = "Nodes",
    responses(
        (status = 200, description = "Active nodes", body = [Node]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_nodes(
    Identity(caller): Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let nodes = state.ledger.list_nodes(&caller.account_id)?;
    Ok(Json(nodes))
}

/// Activity log for one of the caller's nodes, newest first.
///
/// A node owned by another account is reported as not found rather than
/// forbidden, so the endpoint does not leak which node ids exist.
#[utoipa::path(
    get,
    path = "/v1/nodes/{node_id}/activity",
    tag = "Nodes",
    params(
        ("node_id" = String, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Activity log", body = [NodeActivity]),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Node not found")
    )
)]
pub async fn node_activity(
    Identity(caller): Identity,
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<NodeActivity>>, ApiError> {
    let node = state.ledger.get_node(&node_id)?;
    if node.account_id != caller.account_id {
        return Err(ApiError::not_found(format!("Node {node_id} not found")));
    }

    let activity = state.ledger.list_node_activity(&node_id)?;
    Ok(Json(activity))
}
