// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Node contracts and their append-only activity log.
//!
//! A node locks capital against a declared target value. In the current
//! design a node never matures or closes: the only transition that exists
//! is creation, and the only status ever produced is `active`. The
//! `target_amount` is advisory display data.
//!
//! ## Table Layout
//!
//! - `nodes`: node_id → serialized Node (JSON bytes)
//! - `node_account_idx`: composite key (account|!timestamp|id)
//! - `node_activity`: activity_id → serialized NodeActivity
//! - `node_activity_idx`: composite key (node|!timestamp|id)

use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::ledger::LedgerResult;
use super::{entity_id_from_key, owner_index_key, owner_prefix, owner_prefix_end};

pub(crate) const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
pub(crate) const NODE_ACCOUNT_IDX: TableDefinition<&[u8], ()> =
    TableDefinition::new("node_account_idx");
pub(crate) const NODE_ACTIVITY: TableDefinition<&str, &[u8]> =
    TableDefinition::new("node_activity");
pub(crate) const NODE_ACTIVITY_IDX: TableDefinition<&[u8], ()> =
    TableDefinition::new("node_activity_idx");

/// Activity action tag written when a node is created.
pub const ACTION_ACTIVATION: &str = "ACTIVATION";

/// Node status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Capital is locked and the node is running.
    Active,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A capital-locking investment contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Node {
    /// Unique node identifier (UUID).
    pub node_id: String,
    /// Owning account.
    pub account_id: String,
    /// Display label chosen at activation.
    pub node_name: String,
    /// Capital locked into the node.
    pub amount: Decimal,
    /// Declared maturity goal. Advisory only.
    pub target_amount: Decimal,
    /// Current status.
    pub status: NodeStatus,
    /// When the node was activated.
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Create a new active node.
    pub fn new(
        account_id: String,
        node_name: String,
        amount: Decimal,
        target_amount: Decimal,
    ) -> Self {
        Self {
            node_id: Uuid::new_v4().to_string(),
            account_id,
            node_name,
            amount,
            target_amount,
            status: NodeStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// One append-only log entry tied to a node.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeActivity {
    /// Unique entry identifier (UUID).
    pub activity_id: String,
    /// Node this entry belongs to.
    pub node_id: String,
    /// Action tag, e.g. `ACTIVATION`.
    pub action: String,
    /// Free-text detail for display.
    pub detail: String,
    /// When the event occurred.
    pub created_at: DateTime<Utc>,
}

pub(crate) fn load(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    node_id: &str,
) -> LedgerResult<Option<Node>> {
    match table.get(node_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert a node and its per-account index entry.
pub(crate) fn insert(txn: &WriteTransaction, node: &Node) -> LedgerResult<()> {
    let json = serde_json::to_vec(node)?;
    {
        let mut table = txn.open_table(NODES)?;
        table.insert(node.node_id.as_str(), json.as_slice())?;
    }
    let mut idx = txn.open_table(NODE_ACCOUNT_IDX)?;
    let key = owner_index_key(
        &node.account_id,
        node.created_at.timestamp_millis(),
        &node.node_id,
    );
    idx.insert(key.as_slice(), ())?;
    Ok(())
}

/// Append an activity entry for a node inside the caller's transaction.
///
/// Must run in the same unit of work as the event it describes, so a
/// rolled-back operation never leaves a stray log line behind.
pub(crate) fn record_activity(
    txn: &WriteTransaction,
    node_id: &str,
    action: &str,
    detail: String,
) -> LedgerResult<NodeActivity> {
    let activity = NodeActivity {
        activity_id: Uuid::new_v4().to_string(),
        node_id: node_id.to_string(),
        action: action.to_string(),
        detail,
        created_at: Utc::now(),
    };

    let json = serde_json::to_vec(&activity)?;
    {
        let mut table = txn.open_table(NODE_ACTIVITY)?;
        table.insert(activity.activity_id.as_str(), json.as_slice())?;
    }
    let mut idx = txn.open_table(NODE_ACTIVITY_IDX)?;
    let key = owner_index_key(
        node_id,
        activity.created_at.timestamp_millis(),
        &activity.activity_id,
    );
    idx.insert(key.as_slice(), ())?;
    Ok(activity)
}

/// Newest-first list of an account's active nodes.
pub(crate) fn nodes_by_account(
    txn: &ReadTransaction,
    account_id: &str,
) -> LedgerResult<Vec<Node>> {
    let idx = txn.open_table(NODE_ACCOUNT_IDX)?;
    let table = txn.open_table(NODES)?;

    let prefix = owner_prefix(account_id);
    let end = owner_prefix_end(account_id);

    let mut nodes = Vec::new();
    for entry in idx.range(prefix.as_slice()..end.as_slice())? {
        let entry = entry?;
        if let Some(id) = entity_id_from_key(entry.0.value()) {
            if let Some(node) = load(&table, &id)? {
                if node.status == NodeStatus::Active {
                    nodes.push(node);
                }
            }
        }
    }
    Ok(nodes)
}

/// Look up a node in a read transaction.
pub(crate) fn get(txn: &ReadTransaction, node_id: &str) -> LedgerResult<Option<Node>> {
    let table = txn.open_table(NODES)?;
    load(&table, node_id)
}

/// Newest-first activity log for one node.
pub(crate) fn activity_by_node(
    txn: &ReadTransaction,
    node_id: &str,
) -> LedgerResult<Vec<NodeActivity>> {
    let idx = txn.open_table(NODE_ACTIVITY_IDX)?;
    let table = txn.open_table(NODE_ACTIVITY)?;

    let prefix = owner_prefix(node_id);
    let end = owner_prefix_end(node_id);

    let mut entries = Vec::new();
    for entry in idx.range(prefix.as_slice()..end.as_slice())? {
        let entry = entry?;
        if let Some(id) = entity_id_from_key(entry.0.value()) {
            if let Some(value) = table.get(id.as_str())? {
                entries.push(serde_json::from_slice::<NodeActivity>(value.value())?);
            }
        }
    }
    Ok(entries)
}

/// Count of active nodes across the whole ledger. Admin stats.
pub(crate) fn count_active(txn: &ReadTransaction) -> LedgerResult<usize> {
    let table = txn.open_table(NODES)?;
    let mut count = 0;
    for entry in table.iter()? {
        let entry = entry?;
        let node: Node = serde_json::from_slice(entry.1.value())?;
        if node.status == NodeStatus::Active {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_active() {
        let node = Node::new(
            "acct".into(),
            "Quantum Node".into(),
            Decimal::new(500, 0),
            Decimal::new(1000, 0),
        );
        assert_eq!(node.status, NodeStatus::Active);
        assert_eq!(node.amount, Decimal::new(500, 0));
    }

    #[test]
    fn node_status_serializes_lowercase() {
        let json = serde_json::to_string(&NodeStatus::Active).unwrap();
        assert_eq!(json, r#""active""#);
    }
}
