// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entity repositories over the ledger database.
//!
//! Each repository owns its table definitions and the serialization of one
//! entity family. Mutating functions take a caller-supplied
//! `&redb::WriteTransaction` and never commit themselves: the unit of work
//! belongs to [`LedgerDb`](super::LedgerDb), which composes repository calls
//! and commits (or rolls back) the whole operation.

pub mod accounts;
pub mod nodes;
pub mod referrals;
pub mod requests;

pub use accounts::Account;
pub use nodes::{Node, NodeActivity, NodeStatus};
pub use referrals::ReferralBonus;
pub use requests::{Deposit, RequestStatus, Withdrawal};

/// Build a composite key for an owner-scoped index table.
///
/// Format: `owner_id | inverted_timestamp_be_bytes | entity_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
pub(crate) fn owner_index_key(owner_id: &str, timestamp_millis: i64, entity_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner_id.len() + 1 + 8 + 1 + entity_id.len());
    key.extend_from_slice(owner_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp_millis as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(entity_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all entities of an owner.
pub(crate) fn owner_prefix(owner_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner_id.len() + 1);
    prefix.extend_from_slice(owner_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
pub(crate) fn owner_prefix_end(owner_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(owner_id.len() + 1 + 20);
    end.extend_from_slice(owner_id.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the entity id portion from a composite index key.
///
/// Key format: `owner_id|timestamp_bytes|entity_id`
pub(crate) fn entity_id_from_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}
