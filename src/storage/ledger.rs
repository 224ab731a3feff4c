// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! Every public mutation on [`LedgerDb`] is one atomic unit of work: a
//! single redb write transaction spanning all the tables the operation
//! touches. redb serializes writers, so a balance sufficiency check and the
//! debit it gates can never interleave with another mutation on the same
//! account: two concurrent withdrawals whose sum exceeds the balance
//! cannot both commit.
//!
//! Multi-statement operations (deposit approval + credit, withdrawal
//! creation + reservation, node activation + activity append + referral
//! cascade) commit or roll back together. There is no partial application:
//! an error anywhere before `commit()` drops the transaction and every
//! prior step with it.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::repository::nodes::ACTION_ACTIVATION;
use super::repository::{
    accounts, nodes, referrals, requests, Account, Deposit, Node, NodeActivity, ReferralBonus,
    RequestStatus, Withdrawal,
};

/// Idempotency keys for create-type operations: "op:key" → entity_id.
const IDEMPOTENCY: TableDefinition<&str, &str> = TableDefinition::new("idempotency_keys");

// =============================================================================
// Error Type
// =============================================================================

/// The ledger error taxonomy.
///
/// The first four variants are business-rule violations reported to the
/// caller before or during the unit of work; the remainder are internal
/// storage/serialization failures that roll the unit of work back in full.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Platform statistics
// =============================================================================

/// Aggregate totals for the admin dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerStats {
    pub total_accounts: usize,
    pub total_deposits: usize,
    pub pending_deposits: usize,
    pub total_withdrawals: usize,
    pub pending_withdrawals: usize,
    pub active_nodes: usize,
    pub total_bonuses: usize,
    /// Sum of every referral bonus ever settled.
    pub total_bonus_amount: Decimal,
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the ledger database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(accounts::ACCOUNTS)?;
            let _ = write_txn.open_table(accounts::REFERRAL_CODES)?;
            let _ = write_txn.open_table(requests::DEPOSITS)?;
            let _ = write_txn.open_table(requests::DEPOSIT_ACCOUNT_IDX)?;
            let _ = write_txn.open_table(requests::DEPOSIT_TX_HASHES)?;
            let _ = write_txn.open_table(requests::WITHDRAWALS)?;
            let _ = write_txn.open_table(requests::WITHDRAWAL_ACCOUNT_IDX)?;
            let _ = write_txn.open_table(nodes::NODES)?;
            let _ = write_txn.open_table(nodes::NODE_ACCOUNT_IDX)?;
            let _ = write_txn.open_table(nodes::NODE_ACTIVITY)?;
            let _ = write_txn.open_table(nodes::NODE_ACTIVITY_IDX)?;
            let _ = write_txn.open_table(referrals::BONUSES)?;
            let _ = write_txn.open_table(referrals::BONUS_ACCOUNT_IDX)?;
            let _ = write_txn.open_table(IDEMPOTENCY)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Provision a new account, optionally linked to an upline by referral
    /// code. An unknown code leaves the account unparented rather than
    /// failing: the code is advisory input from the registration form.
    pub fn create_account(&self, upline_code: Option<&str>) -> LedgerResult<Account> {
        let txn = self.db.begin_write()?;

        let referred_by = match upline_code {
            Some(code) => accounts::account_id_for_code(&txn, code)?,
            None => None,
        };

        let account = Account::new(referred_by);
        accounts::insert(&txn, &account)?;
        txn.commit()?;

        tracing::info!(account_id = %account.account_id, "account provisioned");
        Ok(account)
    }

    /// Fetch one account.
    pub fn get_account(&self, account_id: &str) -> LedgerResult<Account> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(accounts::ACCOUNTS)?;
        accounts::load(&table, account_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Account {account_id}")))
    }

    /// Every account, newest first. Admin surface.
    pub fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(accounts::ACCOUNTS)?;
        let mut accounts_list = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            accounts_list.push(serde_json::from_slice::<Account>(entry.1.value())?);
        }
        accounts_list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts_list)
    }

    /// Accounts directly referred by the given account.
    pub fn list_referrals(&self, account_id: &str) -> LedgerResult<Vec<Account>> {
        let all = self.list_accounts()?;
        Ok(all
            .into_iter()
            .filter(|a| a.referred_by.as_deref() == Some(account_id))
            .collect())
    }

    /// Apply a signed administrative delta (positive = reward, negative =
    /// penalty) to an account balance. The non-negative invariant applies
    /// the same as everywhere else.
    pub fn adjust_balance(&self, account_id: &str, delta: Decimal) -> LedgerResult<Decimal> {
        let txn = self.db.begin_write()?;
        let balance = accounts::adjust_balance(&txn, account_id, delta)?;
        txn.commit()?;

        tracing::info!(account_id, %delta, %balance, "balance adjusted");
        Ok(balance)
    }

    // =========================================================================
    // Deposits
    // =========================================================================

    /// Record a pending deposit claim. No balance effect until approval.
    pub fn create_deposit(
        &self,
        account_id: &str,
        amount: Decimal,
        currency: &str,
        chain: &str,
        tx_hash: &str,
        idempotency_key: Option<&str>,
    ) -> LedgerResult<Deposit> {
        require_positive(amount, "deposit amount")?;
        require_field(currency, "currency")?;
        require_field(chain, "chain")?;
        require_field(tx_hash, "transaction hash")?;

        let txn = self.db.begin_write()?;

        if let Some(key) = idempotency_key {
            if let Some(deposit_id) = replayed_entity(&txn, "deposit", key)? {
                let table = txn.open_table(requests::DEPOSITS)?;
                let deposit = requests::load_deposit(&table, &deposit_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Deposit {deposit_id}")))?;
                return Ok(deposit);
            }
        }

        accounts::require(&txn, account_id)?;

        if requests::tx_hash_exists(&txn, tx_hash)? {
            return Err(LedgerError::InvalidInput(format!(
                "transaction hash {tx_hash} was already submitted"
            )));
        }

        let deposit = Deposit::new_pending(
            account_id.to_string(),
            amount,
            currency.to_string(),
            chain.to_string(),
            tx_hash.to_string(),
        );
        requests::insert_deposit(&txn, &deposit)?;

        if let Some(key) = idempotency_key {
            remember_entity(&txn, "deposit", key, &deposit.deposit_id)?;
        }
        txn.commit()?;

        tracing::info!(deposit_id = %deposit.deposit_id, account_id, %amount, "deposit claim recorded");
        Ok(deposit)
    }

    /// Approve a pending deposit: terminal status plus the one-time balance
    /// credit, in one unit of work.
    pub fn approve_deposit(&self, deposit_id: &str) -> LedgerResult<Deposit> {
        let txn = self.db.begin_write()?;
        let deposit = requests::mark_deposit(&txn, deposit_id, RequestStatus::Approved)?;
        accounts::adjust_balance(&txn, &deposit.account_id, deposit.amount)?;
        txn.commit()?;

        tracing::info!(deposit_id, account_id = %deposit.account_id, amount = %deposit.amount, "deposit approved");
        Ok(deposit)
    }

    /// Decline a pending deposit. The claim was never credited, so there is
    /// no balance effect.
    pub fn decline_deposit(&self, deposit_id: &str) -> LedgerResult<Deposit> {
        let txn = self.db.begin_write()?;
        let deposit = requests::mark_deposit(&txn, deposit_id, RequestStatus::Declined)?;
        txn.commit()?;

        tracing::info!(deposit_id, "deposit declined");
        Ok(deposit)
    }

    /// Newest-first deposit history for one account.
    pub fn list_deposits(&self, account_id: &str) -> LedgerResult<Vec<Deposit>> {
        let txn = self.db.begin_read()?;
        requests::deposits_by_account(&txn, account_id)
    }

    /// Every deposit, newest first. Admin surface.
    pub fn list_all_deposits(&self) -> LedgerResult<Vec<Deposit>> {
        let txn = self.db.begin_read()?;
        requests::all_deposits(&txn)
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    /// Create a withdrawal request, reserving the amount immediately.
    ///
    /// The debit happens in the same transaction as the insert, so N
    /// concurrent requests can never each pass a sufficiency check against
    /// a stale balance.
    pub fn create_withdrawal(
        &self,
        account_id: &str,
        amount: Decimal,
        currency: &str,
        chain: &str,
        address: &str,
        idempotency_key: Option<&str>,
    ) -> LedgerResult<Withdrawal> {
        require_positive(amount, "withdrawal amount")?;
        require_field(currency, "currency")?;
        require_field(chain, "chain")?;
        require_field(address, "destination address")?;

        let txn = self.db.begin_write()?;

        if let Some(key) = idempotency_key {
            if let Some(withdrawal_id) = replayed_entity(&txn, "withdrawal", key)? {
                let table = txn.open_table(requests::WITHDRAWALS)?;
                let withdrawal = requests::load_withdrawal(&table, &withdrawal_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Withdrawal {withdrawal_id}")))?;
                return Ok(withdrawal);
            }
        }

        // Reservation at request time; fails InsufficientFunds before any row
        // is written.
        accounts::adjust_balance(&txn, account_id, -amount)?;

        let withdrawal = Withdrawal::new_pending(
            account_id.to_string(),
            amount,
            currency.to_string(),
            chain.to_string(),
            address.to_string(),
        );
        requests::insert_withdrawal(&txn, &withdrawal)?;

        if let Some(key) = idempotency_key {
            remember_entity(&txn, "withdrawal", key, &withdrawal.withdrawal_id)?;
        }
        txn.commit()?;

        tracing::info!(withdrawal_id = %withdrawal.withdrawal_id, account_id, %amount, "withdrawal requested");
        Ok(withdrawal)
    }

    /// Approve a pending withdrawal. The funds were reserved at request
    /// time, so this is a status-only transition.
    pub fn approve_withdrawal(&self, withdrawal_id: &str) -> LedgerResult<Withdrawal> {
        let txn = self.db.begin_write()?;
        let withdrawal = requests::mark_withdrawal(&txn, withdrawal_id, RequestStatus::Approved)?;
        txn.commit()?;

        tracing::info!(withdrawal_id, "withdrawal approved");
        Ok(withdrawal)
    }

    /// Decline a pending withdrawal and refund the reservation atomically.
    pub fn decline_withdrawal(&self, withdrawal_id: &str) -> LedgerResult<Withdrawal> {
        let txn = self.db.begin_write()?;
        let withdrawal = requests::mark_withdrawal(&txn, withdrawal_id, RequestStatus::Declined)?;
        accounts::adjust_balance(&txn, &withdrawal.account_id, withdrawal.amount)?;
        txn.commit()?;

        tracing::info!(withdrawal_id, account_id = %withdrawal.account_id, "withdrawal declined, reservation refunded");
        Ok(withdrawal)
    }

    /// Newest-first withdrawal history for one account.
    pub fn list_withdrawals(&self, account_id: &str) -> LedgerResult<Vec<Withdrawal>> {
        let txn = self.db.begin_read()?;
        requests::withdrawals_by_account(&txn, account_id)
    }

    /// Every withdrawal, newest first. Admin surface.
    pub fn list_all_withdrawals(&self) -> LedgerResult<Vec<Withdrawal>> {
        let txn = self.db.begin_read()?;
        requests::all_withdrawals(&txn)
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Activate a node: lock capital, append the activation log entry and
    /// settle the referral cascade, all in one unit of work. A failure anywhere
    /// rolls back the debit, the node row, the activity entry and any
    /// partial bonus credits.
    pub fn activate_node(
        &self,
        account_id: &str,
        node_name: &str,
        amount: Decimal,
        target_amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> LedgerResult<Node> {
        require_field(node_name, "node name")?;
        require_positive(amount, "node amount")?;
        if target_amount < Decimal::ZERO {
            return Err(LedgerError::InvalidInput(
                "target amount must not be negative".into(),
            ));
        }

        let txn = self.db.begin_write()?;

        if let Some(key) = idempotency_key {
            if let Some(node_id) = replayed_entity(&txn, "node", key)? {
                let table = txn.open_table(nodes::NODES)?;
                let node = nodes::load(&table, &node_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Node {node_id}")))?;
                return Ok(node);
            }
        }

        accounts::adjust_balance(&txn, account_id, -amount)?;

        let node = Node::new(
            account_id.to_string(),
            node_name.to_string(),
            amount,
            target_amount,
        );
        nodes::insert(&txn, &node)?;
        nodes::record_activity(
            &txn,
            &node.node_id,
            ACTION_ACTIVATION,
            format!("Node {} initialized with {} capital", node.node_name, node.amount),
        )?;

        let bonuses = referrals::cascade(&txn, account_id, amount)?;

        if let Some(key) = idempotency_key {
            remember_entity(&txn, "node", key, &node.node_id)?;
        }
        txn.commit()?;

        tracing::info!(
            node_id = %node.node_id,
            account_id,
            %amount,
            bonuses = bonuses.len(),
            "node activated"
        );
        Ok(node)
    }

    /// Fetch one node.
    pub fn get_node(&self, node_id: &str) -> LedgerResult<Node> {
        let txn = self.db.begin_read()?;
        nodes::get(&txn, node_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Node {node_id}")))
    }

    /// Newest-first list of an account's active nodes.
    pub fn list_nodes(&self, account_id: &str) -> LedgerResult<Vec<Node>> {
        let txn = self.db.begin_read()?;
        nodes::nodes_by_account(&txn, account_id)
    }

    /// Newest-first activity log for one node.
    pub fn list_node_activity(&self, node_id: &str) -> LedgerResult<Vec<NodeActivity>> {
        let txn = self.db.begin_read()?;
        nodes::activity_by_node(&txn, node_id)
    }

    // =========================================================================
    // Referral bonuses
    // =========================================================================

    /// Newest-first bonus history for a beneficiary account.
    pub fn list_bonuses(&self, account_id: &str) -> LedgerResult<Vec<ReferralBonus>> {
        let txn = self.db.begin_read()?;
        referrals::bonuses_by_beneficiary(&txn, account_id)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Aggregate platform totals for the admin dashboard.
    pub fn stats(&self) -> LedgerResult<LedgerStats> {
        let txn = self.db.begin_read()?;

        let total_accounts = {
            let table = txn.open_table(accounts::ACCOUNTS)?;
            let mut count = 0;
            for entry in table.iter()? {
                entry?;
                count += 1;
            }
            count
        };

        let deposits = requests::all_deposits(&txn)?;
        let withdrawals = requests::all_withdrawals(&txn)?;
        let active_nodes = nodes::count_active(&txn)?;
        let (total_bonuses, total_bonus_amount) = referrals::totals(&txn)?;

        Ok(LedgerStats {
            total_accounts,
            pending_deposits: deposits
                .iter()
                .filter(|d| d.status == RequestStatus::Pending)
                .count(),
            total_deposits: deposits.len(),
            pending_withdrawals: withdrawals
                .iter()
                .filter(|w| w.status == RequestStatus::Pending)
                .count(),
            total_withdrawals: withdrawals.len(),
            active_nodes,
            total_bonuses,
            total_bonus_amount,
        })
    }
}

// =============================================================================
// Validation and idempotency helpers
// =============================================================================

fn require_positive(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "{what} must be positive"
        )));
    }
    Ok(())
}

fn require_field(value: &str, what: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{what} is required")));
    }
    Ok(())
}

/// Look up a previously recorded idempotency key for an operation kind.
fn replayed_entity(txn: &WriteTransaction, op: &str, key: &str) -> LedgerResult<Option<String>> {
    let scoped = format!("{op}:{key}");
    let table = txn.open_table(IDEMPOTENCY)?;
    let result = match table.get(scoped.as_str())? {
        Some(value) => Ok(Some(value.value().to_string())),
        None => Ok(None),
    };
    result
}

/// Record the entity created under an idempotency key.
fn remember_entity(
    txn: &WriteTransaction,
    op: &str,
    key: &str,
    entity_id: &str,
) -> LedgerResult<()> {
    let scoped = format!("{op}:{key}");
    let mut table = txn.open_table(IDEMPOTENCY)?;
    table.insert(scoped.as_str(), entity_id)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (LedgerDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn funded_account(db: &LedgerDb, balance: i64) -> Account {
        let account = db.create_account(None).unwrap();
        if balance > 0 {
            db.adjust_balance(&account.account_id, Decimal::new(balance, 0))
                .unwrap();
        }
        db.get_account(&account.account_id).unwrap()
    }

    /// Rewire an account's referral parent directly. Used to build shapes
    /// the public surface refuses to create, such as cycles and dangling
    /// parent pointers.
    fn set_referrer(db: &LedgerDb, account_id: &str, referrer: Option<&str>) {
        let txn = db.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(accounts::ACCOUNTS).unwrap();
            let bytes = table.get(account_id).unwrap().unwrap().value().to_vec();
            let mut account: Account = serde_json::from_slice(&bytes).unwrap();
            account.referred_by = referrer.map(str::to_string);
            let json = serde_json::to_vec(&account).unwrap();
            table.insert(account_id, json.as_slice()).unwrap();
        }
        txn.commit().unwrap();
    }

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    // =========================================================================
    // Deposits
    // =========================================================================

    #[test]
    fn deposit_approval_credits_exactly_once() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        let deposit = db
            .create_deposit(&account.account_id, dec(250), "USDT", "TRC20", "0xaaa", None)
            .unwrap();
        assert_eq!(deposit.status, RequestStatus::Pending);

        // Creation does not touch the balance
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(0));

        let approved = db.approve_deposit(&deposit.deposit_id).unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(250));

        // Terminal: approving or declining again fails and the balance holds
        let err = db.approve_deposit(&deposit.deposit_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
        let err = db.decline_deposit(&deposit.deposit_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(250));
    }

    #[test]
    fn declined_deposit_never_credits() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        let deposit = db
            .create_deposit(&account.account_id, dec(100), "USDT", "ERC20", "0xbbb", None)
            .unwrap();
        let declined = db.decline_deposit(&deposit.deposit_id).unwrap();
        assert_eq!(declined.status, RequestStatus::Declined);
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(0));

        let err = db.approve_deposit(&deposit.deposit_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
    }

    #[test]
    fn deposit_guards_reject_bad_input() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        let err = db
            .create_deposit(&account.account_id, dec(0), "USDT", "TRC20", "0x1", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = db
            .create_deposit(&account.account_id, dec(10), "", "TRC20", "0x1", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = db
            .create_deposit("ghost", dec(10), "USDT", "TRC20", "0x1", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let err = db.approve_deposit("missing").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn duplicate_claimed_tx_hash_is_rejected() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        db.create_deposit(&account.account_id, dec(10), "USDT", "TRC20", "0xdup", None)
            .unwrap();
        let err = db
            .create_deposit(&account.account_id, dec(20), "USDT", "TRC20", "0xdup", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(db.list_deposits(&account.account_id).unwrap().len(), 1);
    }

    #[test]
    fn deposit_idempotency_key_replays_original() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        let first = db
            .create_deposit(&account.account_id, dec(10), "USDT", "TRC20", "0x1", Some("k1"))
            .unwrap();
        let replay = db
            .create_deposit(&account.account_id, dec(10), "USDT", "TRC20", "0x2", Some("k1"))
            .unwrap();

        assert_eq!(first.deposit_id, replay.deposit_id);
        assert_eq!(db.list_deposits(&account.account_id).unwrap().len(), 1);
    }

    #[test]
    fn deposit_history_is_newest_first() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 0);

        for i in 0..3 {
            db.create_deposit(
                &account.account_id,
                dec(10 + i),
                "USDT",
                "TRC20",
                &format!("0xhash{i}"),
                None,
            )
            .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let history = db.list_deposits(&account.account_id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].amount, dec(12));
        assert_eq!(history[2].amount, dec(10));
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    #[test]
    fn withdrawal_reserves_at_request_time() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 1000);

        let withdrawal = db
            .create_withdrawal(&account.account_id, dec(200), "USDT", "TRC20", "Txyz", None)
            .unwrap();
        assert_eq!(withdrawal.status, RequestStatus::Pending);
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(800));

        // Approval is a status-only transition
        db.approve_withdrawal(&withdrawal.withdrawal_id).unwrap();
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(800));
    }

    #[test]
    fn declining_a_withdrawal_refunds_the_reservation() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 1000);

        let withdrawal = db
            .create_withdrawal(&account.account_id, dec(200), "USDT", "TRC20", "Txyz", None)
            .unwrap();
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(800));

        let declined = db.decline_withdrawal(&withdrawal.withdrawal_id).unwrap();
        assert_eq!(declined.status, RequestStatus::Declined);
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(1000));

        // Terminal thereafter
        let err = db.decline_withdrawal(&withdrawal.withdrawal_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(1000));
    }

    #[test]
    fn overdrawn_withdrawal_fails_with_no_row() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 50);

        let err = db
            .create_withdrawal(&account.account_id, dec(100), "USDT", "TRC20", "Txyz", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(50));
        assert!(db.list_withdrawals(&account.account_id).unwrap().is_empty());
    }

    #[test]
    fn concurrent_withdrawals_cannot_jointly_overdraw() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 1000);

        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|i| {
                    let db = &db;
                    let account_id = account.account_id.clone();
                    s.spawn(move || {
                        db.create_withdrawal(
                            &account_id,
                            dec(600),
                            "USDT",
                            "TRC20",
                            &format!("Taddr{i}"),
                            None,
                        )
                        .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1, "exactly one reservation must win");
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(400));
    }

    #[test]
    fn withdrawal_idempotency_key_replays_original() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 500);

        let first = db
            .create_withdrawal(&account.account_id, dec(100), "USDT", "TRC20", "T1", Some("w1"))
            .unwrap();
        let replay = db
            .create_withdrawal(&account.account_id, dec(100), "USDT", "TRC20", "T1", Some("w1"))
            .unwrap();

        assert_eq!(first.withdrawal_id, replay.withdrawal_id);
        // Only one reservation was taken
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(400));
    }

    // =========================================================================
    // Node activation and the referral cascade
    // =========================================================================

    #[test]
    fn activation_without_referrer_locks_capital_only() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 1000);

        let node = db
            .activate_node(&account.account_id, "Genesis", dec(500), dec(1500), None)
            .unwrap();

        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(500));

        let nodes = db.list_nodes(&account.account_id).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id, node.node_id);
        assert_eq!(nodes[0].amount, dec(500));

        let activity = db.list_node_activity(&node.node_id).unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].action, ACTION_ACTIVATION);
        assert!(activity[0].detail.contains("Genesis"));

        assert!(db.list_bonuses(&account.account_id).unwrap().is_empty());
    }

    #[test]
    fn two_level_chain_settles_tiers_one_and_two() {
        let (db, _dir) = temp_db();
        // C refers B refers A; C has no referrer
        let c = db.create_account(None).unwrap();
        let b = db.create_account(Some(&c.referral_code)).unwrap();
        let a = db.create_account(Some(&b.referral_code)).unwrap();
        db.adjust_balance(&a.account_id, dec(1000)).unwrap();

        db.activate_node(&a.account_id, "Alpha", dec(1000), dec(3000), None)
            .unwrap();

        assert_eq!(db.get_account(&a.account_id).unwrap().balance, dec(0));
        assert_eq!(db.get_account(&b.account_id).unwrap().balance, dec(70));
        assert_eq!(db.get_account(&c.account_id).unwrap().balance, dec(30));

        let b_bonuses = db.list_bonuses(&b.account_id).unwrap();
        assert_eq!(b_bonuses.len(), 1);
        assert_eq!(b_bonuses[0].tier, 1);
        assert_eq!(b_bonuses[0].amount, dec(70));
        assert_eq!(b_bonuses[0].referred_account_id, a.account_id);

        let c_bonuses = db.list_bonuses(&c.account_id).unwrap();
        assert_eq!(c_bonuses.len(), 1);
        assert_eq!(c_bonuses[0].tier, 2);
        assert_eq!(c_bonuses[0].amount, dec(30));
        assert_eq!(c_bonuses[0].referred_account_id, a.account_id);

        // A earned nothing from its own activation
        assert!(db.list_bonuses(&a.account_id).unwrap().is_empty());
    }

    #[test]
    fn cascade_stops_after_three_tiers_on_a_deep_chain() {
        let (db, _dir) = temp_db();
        let root = db.create_account(None).unwrap();
        let t3 = db.create_account(Some(&root.referral_code)).unwrap();
        let t2 = db.create_account(Some(&t3.referral_code)).unwrap();
        let t1 = db.create_account(Some(&t2.referral_code)).unwrap();
        let activator = db.create_account(Some(&t1.referral_code)).unwrap();
        db.adjust_balance(&activator.account_id, dec(1000)).unwrap();

        db.activate_node(&activator.account_id, "Deep", dec(1000), dec(2000), None)
            .unwrap();

        assert_eq!(db.get_account(&t1.account_id).unwrap().balance, dec(70));
        assert_eq!(db.get_account(&t2.account_id).unwrap().balance, dec(30));
        assert_eq!(db.get_account(&t3.account_id).unwrap().balance, dec(10));
        // The fourth ancestor is beyond the bound
        assert_eq!(db.get_account(&root.account_id).unwrap().balance, dec(0));
        assert!(db.list_bonuses(&root.account_id).unwrap().is_empty());
    }

    #[test]
    fn cascade_terminates_on_a_cyclic_graph() {
        let (db, _dir) = temp_db();
        let a = db.create_account(None).unwrap();
        let b = db.create_account(None).unwrap();
        set_referrer(&db, &a.account_id, Some(&b.account_id));
        set_referrer(&db, &b.account_id, Some(&a.account_id));
        db.adjust_balance(&a.account_id, dec(100)).unwrap();

        db.activate_node(&a.account_id, "Loop", dec(100), dec(200), None)
            .unwrap();

        // Tiers 1..3 walked B, A, B; then the bound stopped the loop
        assert_eq!(db.get_account(&b.account_id).unwrap().balance, dec(7) + dec(1));
        assert_eq!(db.get_account(&a.account_id).unwrap().balance, dec(3));
        let total_bonuses = db.list_bonuses(&a.account_id).unwrap().len()
            + db.list_bonuses(&b.account_id).unwrap().len();
        assert_eq!(total_bonuses, 3);
    }

    #[test]
    fn failed_cascade_rolls_back_the_whole_activation() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 100);
        // Dangling parent pointer: the cascade's credit hits NotFound
        set_referrer(&db, &account.account_id, Some("ghost"));

        let err = db
            .activate_node(&account.account_id, "Broken", dec(100), dec(200), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        // Nothing was applied: no debit, no node, no activity
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(100));
        assert!(db.list_nodes(&account.account_id).unwrap().is_empty());
    }

    #[test]
    fn underfunded_activation_has_no_partial_effect() {
        let (db, _dir) = temp_db();
        let upline = db.create_account(None).unwrap();
        let account = db.create_account(Some(&upline.referral_code)).unwrap();
        db.adjust_balance(&account.account_id, dec(50)).unwrap();

        let err = db
            .activate_node(&account.account_id, "Starved", dec(100), dec(200), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(50));
        assert_eq!(db.get_account(&upline.account_id).unwrap().balance, dec(0));
        assert!(db.list_nodes(&account.account_id).unwrap().is_empty());
        assert!(db.list_bonuses(&upline.account_id).unwrap().is_empty());
    }

    #[test]
    fn activation_idempotency_key_replays_original() {
        let (db, _dir) = temp_db();
        let upline = db.create_account(None).unwrap();
        let account = db.create_account(Some(&upline.referral_code)).unwrap();
        db.adjust_balance(&account.account_id, dec(1000)).unwrap();

        let first = db
            .activate_node(&account.account_id, "Once", dec(400), dec(800), Some("n1"))
            .unwrap();
        let replay = db
            .activate_node(&account.account_id, "Once", dec(400), dec(800), Some("n1"))
            .unwrap();

        assert_eq!(first.node_id, replay.node_id);
        // Debited and cascaded exactly once
        assert_eq!(db.get_account(&account.account_id).unwrap().balance, dec(600));
        assert_eq!(db.list_bonuses(&upline.account_id).unwrap().len(), 1);
    }

    #[test]
    fn activation_rejects_bad_input() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 100);

        let err = db
            .activate_node(&account.account_id, "", dec(10), dec(20), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = db
            .activate_node(&account.account_id, "N", dec(0), dec(20), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = db
            .activate_node(&account.account_id, "N", dec(10), dec(-1), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    // =========================================================================
    // Administrative adjustment and stats
    // =========================================================================

    #[test]
    fn signed_adjustment_reuses_the_invariant() {
        let (db, _dir) = temp_db();
        let account = funded_account(&db, 100);

        assert_eq!(db.adjust_balance(&account.account_id, dec(25)).unwrap(), dec(125));
        assert_eq!(db.adjust_balance(&account.account_id, dec(-125)).unwrap(), dec(0));

        let err = db.adjust_balance(&account.account_id, dec(-1)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn stats_reflect_ledger_contents() {
        let (db, _dir) = temp_db();
        let upline = db.create_account(None).unwrap();
        let account = db.create_account(Some(&upline.referral_code)).unwrap();
        db.adjust_balance(&account.account_id, dec(1000)).unwrap();

        let deposit = db
            .create_deposit(&account.account_id, dec(100), "USDT", "TRC20", "0x1", None)
            .unwrap();
        db.approve_deposit(&deposit.deposit_id).unwrap();
        db.create_deposit(&account.account_id, dec(50), "USDT", "TRC20", "0x2", None)
            .unwrap();
        db.create_withdrawal(&account.account_id, dec(10), "USDT", "TRC20", "T1", None)
            .unwrap();
        db.activate_node(&account.account_id, "Stat", dec(500), dec(900), None)
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_accounts, 2);
        assert_eq!(stats.total_deposits, 2);
        assert_eq!(stats.pending_deposits, 1);
        assert_eq!(stats.total_withdrawals, 1);
        assert_eq!(stats.pending_withdrawals, 1);
        assert_eq!(stats.active_nodes, 1);
        assert_eq!(stats.total_bonuses, 1);
        assert_eq!(stats.total_bonus_amount, dec(35));
    }

    #[test]
    fn referral_listing_returns_direct_downline_only() {
        let (db, _dir) = temp_db();
        let top = db.create_account(None).unwrap();
        let mid = db.create_account(Some(&top.referral_code)).unwrap();
        let _leaf = db.create_account(Some(&mid.referral_code)).unwrap();

        let downline = db.list_referrals(&top.account_id).unwrap();
        assert_eq!(downline.len(), 1);
        assert_eq!(downline[0].account_id, mid.account_id);
    }
}
