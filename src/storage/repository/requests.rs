// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request ledger: deposits and withdrawals through their approval
//! lifecycle.
//!
//! ## State Machine
//!
//! ```text
//! pending ──► approved   (terminal)
//!    └──────► declined   (terminal)
//! ```
//!
//! Any transition out of a terminal state fails with
//! `InvalidStateTransition`. Balance effects are deliberately *not* applied
//! here: [`LedgerDb`](super::super::LedgerDb) pairs the status write with
//! the matching account credit/debit inside one write transaction.
//!
//! ## Table Layout
//!
//! - `deposits` / `withdrawals`: id → serialized entity (JSON bytes)
//! - `deposit_account_idx` / `withdrawal_account_idx`: composite key
//!   (account|!timestamp|id) for newest-first per-account scans
//! - `deposit_tx_hashes`: claimed tx hash → deposit_id (submission dedup)

use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::ledger::{LedgerError, LedgerResult};
use super::{entity_id_from_key, owner_index_key, owner_prefix, owner_prefix_end};

pub(crate) const DEPOSITS: TableDefinition<&str, &[u8]> = TableDefinition::new("deposits");
pub(crate) const DEPOSIT_ACCOUNT_IDX: TableDefinition<&[u8], ()> =
    TableDefinition::new("deposit_account_idx");
pub(crate) const DEPOSIT_TX_HASHES: TableDefinition<&str, &str> =
    TableDefinition::new("deposit_tx_hashes");

pub(crate) const WITHDRAWALS: TableDefinition<&str, &[u8]> = TableDefinition::new("withdrawals");
pub(crate) const WITHDRAWAL_ACCOUNT_IDX: TableDefinition<&[u8], ()> =
    TableDefinition::new("withdrawal_account_idx");

/// Lifecycle status shared by deposits and withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting an administrative decision.
    Pending,
    /// Accepted. Terminal.
    Approved,
    /// Rejected. Terminal.
    Declined,
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        };
        write!(f, "{s}")
    }
}

/// A user's claim that funds were sent on-chain.
///
/// The transaction hash is recorded verbatim and never verified; crediting
/// happens only when an administrator approves the claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Deposit {
    /// Unique deposit identifier (UUID).
    pub deposit_id: String,
    /// Owning account.
    pub account_id: String,
    /// Claimed amount.
    pub amount: Decimal,
    /// Currency ticker (e.g. "USDT").
    pub currency: String,
    /// Chain the funds were claimed to move on (e.g. "TRC20").
    pub chain: String,
    /// Claimed on-chain transaction hash.
    pub tx_hash: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// When the claim was submitted.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl Deposit {
    /// Create a new pending deposit claim.
    pub fn new_pending(
        account_id: String,
        amount: Decimal,
        currency: String,
        chain: String,
        tx_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            deposit_id: Uuid::new_v4().to_string(),
            account_id,
            amount,
            currency,
            chain,
            tx_hash,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A request to move funds out to an external address.
///
/// The amount is reserved (debited) when the request is created, not when
/// it is approved. Declining refunds the reservation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Withdrawal {
    /// Unique withdrawal identifier (UUID).
    pub withdrawal_id: String,
    /// Owning account.
    pub account_id: String,
    /// Requested amount, reserved at creation time.
    pub amount: Decimal,
    /// Currency ticker.
    pub currency: String,
    /// Destination chain.
    pub chain: String,
    /// Destination address.
    pub address: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Create a new pending withdrawal request.
    pub fn new_pending(
        account_id: String,
        amount: Decimal,
        currency: String,
        chain: String,
        address: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            withdrawal_id: Uuid::new_v4().to_string(),
            account_id,
            amount,
            currency,
            chain,
            address,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Deposits
// =============================================================================

pub(crate) fn load_deposit(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    deposit_id: &str,
) -> LedgerResult<Option<Deposit>> {
    match table.get(deposit_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert a pending deposit, its per-account index entry and the tx-hash
/// dedup mapping.
pub(crate) fn insert_deposit(txn: &WriteTransaction, deposit: &Deposit) -> LedgerResult<()> {
    let json = serde_json::to_vec(deposit)?;
    {
        let mut table = txn.open_table(DEPOSITS)?;
        table.insert(deposit.deposit_id.as_str(), json.as_slice())?;
    }
    {
        let mut idx = txn.open_table(DEPOSIT_ACCOUNT_IDX)?;
        let key = owner_index_key(
            &deposit.account_id,
            deposit.created_at.timestamp_millis(),
            &deposit.deposit_id,
        );
        idx.insert(key.as_slice(), ())?;
    }
    let mut hashes = txn.open_table(DEPOSIT_TX_HASHES)?;
    hashes.insert(deposit.tx_hash.as_str(), deposit.deposit_id.as_str())?;
    Ok(())
}

/// True if a deposit already claims this transaction hash.
pub(crate) fn tx_hash_exists(txn: &WriteTransaction, tx_hash: &str) -> LedgerResult<bool> {
    let table = txn.open_table(DEPOSIT_TX_HASHES)?;
    let exists = table.get(tx_hash)?.is_some();
    Ok(exists)
}

/// Move a pending deposit into a terminal status.
///
/// Fails with `NotFound` for an unknown id and `InvalidStateTransition`
/// when the deposit is not pending. Returns the updated entity so the
/// caller can pair the status change with the balance credit.
pub(crate) fn mark_deposit(
    txn: &WriteTransaction,
    deposit_id: &str,
    status: RequestStatus,
) -> LedgerResult<Deposit> {
    let mut table = txn.open_table(DEPOSITS)?;
    let mut deposit = load_deposit(&table, deposit_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("Deposit {deposit_id}")))?;

    if deposit.status != RequestStatus::Pending {
        return Err(LedgerError::InvalidStateTransition(format!(
            "deposit {deposit_id} is already {}",
            deposit.status
        )));
    }

    deposit.status = status;
    deposit.updated_at = Utc::now();
    let json = serde_json::to_vec(&deposit)?;
    table.insert(deposit_id, json.as_slice())?;
    Ok(deposit)
}

/// Newest-first deposit history for one account.
pub(crate) fn deposits_by_account(
    txn: &ReadTransaction,
    account_id: &str,
) -> LedgerResult<Vec<Deposit>> {
    let idx = txn.open_table(DEPOSIT_ACCOUNT_IDX)?;
    let table = txn.open_table(DEPOSITS)?;

    let prefix = owner_prefix(account_id);
    let end = owner_prefix_end(account_id);

    let mut deposits = Vec::new();
    for entry in idx.range(prefix.as_slice()..end.as_slice())? {
        let entry = entry?;
        if let Some(id) = entity_id_from_key(entry.0.value()) {
            if let Some(deposit) = load_deposit(&table, &id)? {
                deposits.push(deposit);
            }
        }
    }
    Ok(deposits)
}

/// Every deposit in the ledger, newest first. Admin surface.
pub(crate) fn all_deposits(txn: &ReadTransaction) -> LedgerResult<Vec<Deposit>> {
    let table = txn.open_table(DEPOSITS)?;
    let mut deposits = Vec::new();
    for entry in table.iter()? {
        let entry = entry?;
        deposits.push(serde_json::from_slice::<Deposit>(entry.1.value())?);
    }
    deposits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(deposits)
}

// =============================================================================
// Withdrawals
// =============================================================================

pub(crate) fn load_withdrawal(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    withdrawal_id: &str,
) -> LedgerResult<Option<Withdrawal>> {
    match table.get(withdrawal_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert a pending withdrawal and its per-account index entry.
pub(crate) fn insert_withdrawal(
    txn: &WriteTransaction,
    withdrawal: &Withdrawal,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(withdrawal)?;
    {
        let mut table = txn.open_table(WITHDRAWALS)?;
        table.insert(withdrawal.withdrawal_id.as_str(), json.as_slice())?;
    }
    let mut idx = txn.open_table(WITHDRAWAL_ACCOUNT_IDX)?;
    let key = owner_index_key(
        &withdrawal.account_id,
        withdrawal.created_at.timestamp_millis(),
        &withdrawal.withdrawal_id,
    );
    idx.insert(key.as_slice(), ())?;
    Ok(())
}

/// Move a pending withdrawal into a terminal status.
///
/// Same guards as [`mark_deposit`]. The caller pairs a decline with the
/// reservation refund.
pub(crate) fn mark_withdrawal(
    txn: &WriteTransaction,
    withdrawal_id: &str,
    status: RequestStatus,
) -> LedgerResult<Withdrawal> {
    let mut table = txn.open_table(WITHDRAWALS)?;
    let mut withdrawal = load_withdrawal(&table, withdrawal_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("Withdrawal {withdrawal_id}")))?;

    if withdrawal.status != RequestStatus::Pending {
        return Err(LedgerError::InvalidStateTransition(format!(
            "withdrawal {withdrawal_id} is already {}",
            withdrawal.status
        )));
    }

    withdrawal.status = status;
    withdrawal.updated_at = Utc::now();
    let json = serde_json::to_vec(&withdrawal)?;
    table.insert(withdrawal_id, json.as_slice())?;
    Ok(withdrawal)
}

/// Newest-first withdrawal history for one account.
pub(crate) fn withdrawals_by_account(
    txn: &ReadTransaction,
    account_id: &str,
) -> LedgerResult<Vec<Withdrawal>> {
    let idx = txn.open_table(WITHDRAWAL_ACCOUNT_IDX)?;
    let table = txn.open_table(WITHDRAWALS)?;

    let prefix = owner_prefix(account_id);
    let end = owner_prefix_end(account_id);

    let mut withdrawals = Vec::new();
    for entry in idx.range(prefix.as_slice()..end.as_slice())? {
        let entry = entry?;
        if let Some(id) = entity_id_from_key(entry.0.value()) {
            if let Some(withdrawal) = load_withdrawal(&table, &id)? {
                withdrawals.push(withdrawal);
            }
        }
    }
    Ok(withdrawals)
}

/// Every withdrawal in the ledger, newest first. Admin surface.
pub(crate) fn all_withdrawals(txn: &ReadTransaction) -> LedgerResult<Vec<Withdrawal>> {
    let table = txn.open_table(WITHDRAWALS)?;
    let mut withdrawals = Vec::new();
    for entry in table.iter()? {
        let entry = entry?;
        withdrawals.push(serde_json::from_slice::<Withdrawal>(entry.1.value())?);
    }
    withdrawals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(withdrawals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pending_deposit_starts_pending() {
        let deposit = Deposit::new_pending(
            "acct".into(),
            Decimal::new(100, 0),
            "USDT".into(),
            "TRC20".into(),
            "0xabc".into(),
        );
        assert_eq!(deposit.status, RequestStatus::Pending);
        assert_eq!(deposit.created_at, deposit.updated_at);
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(RequestStatus::Pending.to_string(), "pending");
        assert_eq!(RequestStatus::Approved.to_string(), "approved");
        assert_eq!(RequestStatus::Declined.to_string(), "declined");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Approved).unwrap();
        assert_eq!(json, r#""approved""#);
    }
}
