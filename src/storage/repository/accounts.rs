// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account store: balances and the referral-parent edge.
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account (JSON bytes)
//! - `referral_codes`: referral code → account_id
//!
//! The balance is mutated through exactly one entry point,
//! [`adjust_balance`], which enforces the non-negative invariant. Every
//! mutation here runs inside a caller-supplied write transaction; this
//! module never opens or commits one itself.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::ledger::{LedgerError, LedgerResult};

/// Primary table: account_id → serialized Account (JSON bytes).
pub(crate) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Unique referral code → account_id.
pub(crate) const REFERRAL_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("referral_codes");

/// A balance-holding identity plus its referral-parent edge.
///
/// Accounts are provisioned by the registration collaborator and never
/// deleted. The `referred_by` edges form a forest; the cascade engine walks
/// them upward at most three hops.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Unique account identifier (UUID).
    pub account_id: String,
    /// Current spendable balance. Never negative.
    pub balance: Decimal,
    /// Code other users enter at registration to become this account's
    /// downline.
    pub referral_code: String,
    /// Account that referred this one, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    /// When the account was provisioned.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account with a zero balance and a generated referral
    /// code.
    pub fn new(referred_by: Option<String>) -> Self {
        Self {
            account_id: Uuid::new_v4().to_string(),
            balance: Decimal::ZERO,
            referral_code: new_referral_code(),
            referred_by,
            created_at: Utc::now(),
        }
    }
}

/// Generate an 8-character uppercase referral code.
fn new_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Look up an account in any readable view of the `accounts` table.
pub(crate) fn load(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    account_id: &str,
) -> LedgerResult<Option<Account>> {
    match table.get(account_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert a freshly provisioned account and its referral-code mapping.
pub(crate) fn insert(txn: &WriteTransaction, account: &Account) -> LedgerResult<()> {
    let json = serde_json::to_vec(account)?;
    {
        let mut table = txn.open_table(ACCOUNTS)?;
        table.insert(account.account_id.as_str(), json.as_slice())?;
    }
    let mut codes = txn.open_table(REFERRAL_CODES)?;
    codes.insert(account.referral_code.as_str(), account.account_id.as_str())?;
    Ok(())
}

/// Apply a signed delta to an account balance and return the new balance.
///
/// Fails with `NotFound` for an unknown account and `InsufficientFunds`
/// when a negative delta would take the balance below zero. This is the
/// only function that writes a balance; withdrawals, node activation,
/// bonus credits and administrative adjustments all route through it.
pub(crate) fn adjust_balance(
    txn: &WriteTransaction,
    account_id: &str,
    delta: Decimal,
) -> LedgerResult<Decimal> {
    let mut table = txn.open_table(ACCOUNTS)?;
    let mut account = load(&table, account_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("Account {account_id}")))?;

    let next = account.balance + delta;
    if next < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            requested: delta.abs(),
            available: account.balance,
        });
    }

    account.balance = next;
    let json = serde_json::to_vec(&account)?;
    table.insert(account_id, json.as_slice())?;
    Ok(next)
}

/// Return the referral parent of an account, if it has one.
///
/// A missing account yields `None` rather than an error so that a cascade
/// walk simply terminates on a dangling parent pointer.
pub(crate) fn referrer_of(
    txn: &WriteTransaction,
    account_id: &str,
) -> LedgerResult<Option<String>> {
    let table = txn.open_table(ACCOUNTS)?;
    Ok(load(&table, account_id)?.and_then(|account| account.referred_by))
}

/// Resolve a referral code to the account that owns it.
pub(crate) fn account_id_for_code(
    txn: &WriteTransaction,
    code: &str,
) -> LedgerResult<Option<String>> {
    let table = txn.open_table(REFERRAL_CODES)?;
    let result = match table.get(code)? {
        Some(value) => Ok(Some(value.value().to_string())),
        None => Ok(None),
    };
    result
}

/// Fetch an account inside a write transaction, failing with `NotFound`.
pub(crate) fn require(txn: &WriteTransaction, account_id: &str) -> LedgerResult<Account> {
    let table = txn.open_table(ACCOUNTS)?;
    load(&table, account_id)?.ok_or_else(|| LedgerError::NotFound(format!("Account {account_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerDb;

    fn temp_db() -> (LedgerDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn referral_code_is_eight_uppercase_chars() {
        let code = new_referral_code();
        assert_eq!(code.len(), 8);
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn new_account_starts_at_zero() {
        let account = Account::new(None);
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.referred_by.is_none());
    }

    #[test]
    fn adjust_balance_enforces_non_negative_invariant() {
        let (db, _dir) = temp_db();
        let account = db.create_account(None).unwrap();

        db.adjust_balance(&account.account_id, Decimal::new(100, 0))
            .unwrap();

        let err = db
            .adjust_balance(&account.account_id, Decimal::new(-150, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        // The failed debit left the balance untouched
        let account = db.get_account(&account.account_id).unwrap();
        assert_eq!(account.balance, Decimal::new(100, 0));
    }

    #[test]
    fn adjust_balance_unknown_account_is_not_found() {
        let (db, _dir) = temp_db();
        let err = db.adjust_balance("missing", Decimal::ONE).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn referral_code_resolves_to_owner() {
        let (db, _dir) = temp_db();
        let upline = db.create_account(None).unwrap();
        let downline = db.create_account(Some(&upline.referral_code)).unwrap();
        assert_eq!(downline.referred_by.as_deref(), Some(upline.account_id.as_str()));
    }

    #[test]
    fn unknown_referral_code_leaves_account_unparented() {
        let (db, _dir) = temp_db();
        let account = db.create_account(Some("NOSUCHCO")).unwrap();
        assert!(account.referred_by.is_none());
    }
}
